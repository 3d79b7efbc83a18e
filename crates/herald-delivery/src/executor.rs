use async_trait::async_trait;

use crate::{error::DeliveryError, types::DeliveryReceipt};

/// Common interface implemented by every outbound transport adapter.
///
/// Implementations must be `Send + Sync` so a single adapter can be shared
/// with the scheduler engine and driven from multiple Tokio tasks.
#[async_trait]
pub trait SendExecutor: Send + Sync {
    /// Deliver a plain text message to `destination`.
    ///
    /// This is intentionally `&self` (shared reference) so that a connected
    /// adapter can send concurrently without a mutable borrow.
    async fn send_text(
        &self,
        destination: &str,
        body: &str,
    ) -> Result<DeliveryReceipt, DeliveryError>;

    /// Deliver an attachment with `body` as its caption.
    ///
    /// `media_path` is an opaque handle resolved by the adapter (a local
    /// file path for file-based transports).
    async fn send_media(
        &self,
        destination: &str,
        body: &str,
        media_path: &str,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}
