#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use cwsiphon::config::load_configuration;
use cwsiphon::pipeline::Coordinator;
use cwsiphon::source::CloudWatchSource;
use std::sync::Arc;
use tracing::{Level, event};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aws_config=warn,aws_smithy_runtime=warn".into()),
        )
        .init();

    let config = load_configuration().context("Failed to load configuration")?;

    // Initialize Sentry if DSN is provided
    let _sentry = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let now = hifitime::Epoch::now()
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?;
    let window = config.time_window(now)?;

    println!(
        "☁️  Siphoning CloudWatch metrics from {} into {}",
        config.region,
        config.base_dir.display()
    );
    let source = Arc::new(CloudWatchSource::connect(&config.region).await);

    let coordinator = Coordinator::from_config(&config, source, window);

    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            event!(Level::WARN, "Received Ctrl-C, cancelling in-flight tasks");
            token.cancel();
        }
    });

    let summary = coordinator.run().await;

    if summary.outcomes.failed() > 0 || summary.listing_error.is_some() {
        event!(
            Level::WARN,
            "Run finished with {} failed tasks",
            summary.outcomes.failed()
        );
    }
    println!("{}", summary);
    Ok(())
}
