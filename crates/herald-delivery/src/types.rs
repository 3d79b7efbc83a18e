use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Result of a successful delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Platform-native identifier for the delivered message, if the
    /// transport reports one.
    pub message_id: Option<String>,

    /// When the adapter handed the message to the platform.
    pub delivered_at: DateTime<Local>,
}

impl DeliveryReceipt {
    pub fn now(message_id: Option<String>) -> Self {
        Self {
            message_id,
            delivered_at: Local::now(),
        }
    }
}
