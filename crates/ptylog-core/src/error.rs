use thiserror::Error;

/// Error returned by a [`crate::report::ReportSink`] when a delivery fails
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The request never produced a response (DNS, connect, timeout, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The collector answered with a non-success status
    #[error("collector returned HTTP {status}")]
    Status { status: u16 },

    /// The payload could not be encoded
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Anything else a sink wants to surface
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
