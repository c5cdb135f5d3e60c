use thiserror::Error;

/// Errors raised while talking to the remote metrics API
#[derive(Error, Debug)]
pub enum SourceError {
    /// The remote call itself failed (network, authorization, throttling...)
    #[error("Remote call failed: {0}")]
    Remote(String),

    /// The API answered with something we cannot turn into our datamodel
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request could not be built from the metric and window
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SourceError {
    pub fn remote(message: impl Into<String>) -> Self {
        SourceError::Remote(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        SourceError::MalformedResponse(message.into())
    }
}
