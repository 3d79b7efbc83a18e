//! `herald-delivery` — the outbound send capability consumed by the scheduler.
//!
//! The actual transport (WhatsApp, Telegram, …) lives outside this workspace;
//! adapters implement [`SendExecutor`] and are injected wherever a message has
//! to leave the process.

pub mod error;
pub mod executor;
pub mod types;

pub use error::DeliveryError;
pub use executor::SendExecutor;
pub use types::DeliveryReceipt;
