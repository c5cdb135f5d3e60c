use crate::datamodel::MetricIdentity;
use crate::source::{MetricsSource, SourceError};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the listing produced before it stopped
#[derive(Debug, Default)]
pub struct ListingReport {
    /// Every listed entry, malformed ones included
    pub total_metrics: usize,
    /// Listed entries that were never queued because they were malformed
    pub skipped: usize,
    pub pages: usize,
    pub error: Option<SourceError>,
    pub cancelled: bool,
}

/// Walks every page of the metric listing and queues each metric.
///
/// A failing page ends the listing but is not fatal: metrics already
/// queued are still processed. A full queue suspends the listing until
/// workers catch up.
pub async fn list_into_queue(
    source: &dyn MetricsSource,
    queue: Sender<MetricIdentity>,
    token: &CancellationToken,
) -> ListingReport {
    let mut report = ListingReport::default();
    let mut next_token: Option<String> = None;

    info!("Querying account for metrics...");
    loop {
        let page = tokio::select! {
            biased;
            _ = token.cancelled() => {
                report.cancelled = true;
                break;
            }
            page = source.list_metrics(next_token.take()) => page,
        };

        let page = match page {
            Ok(page) => page,
            Err(e) => {
                error!(
                    "Listing metrics failed after {} pages: {}",
                    report.pages, e
                );
                report.error = Some(e);
                break;
            }
        };

        report.pages += 1;
        report.total_metrics += page.metrics.len() + page.skipped;
        report.skipped += page.skipped;
        debug!(
            "Page {}: {} metrics ({} so far)",
            report.pages,
            page.metrics.len(),
            report.total_metrics
        );

        for metric in page.metrics {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    report.cancelled = true;
                    return report;
                }
                sent = queue.send(metric) => {
                    if sent.is_err() {
                        warn!("Task queue closed, stopping the listing");
                        return report;
                    }
                }
            }
        }

        match page.next_token {
            Some(continuation) => next_token = Some(continuation),
            None => break,
        }
    }

    report
}
