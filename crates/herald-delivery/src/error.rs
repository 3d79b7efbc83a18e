use thiserror::Error;

/// Errors that can occur while delivering a message through an adapter.
///
/// Every variant carries a human-readable cause; the scheduler records it
/// verbatim on the failed record.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The underlying transport is not connected or was torn down.
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The recipient identifier was rejected by the platform.
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// The referenced attachment could not be read or encoded.
    #[error("Media unavailable: {0}")]
    MediaUnavailable(String),

    /// The message could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;
