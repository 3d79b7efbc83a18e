use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur within the scheduler subsystem.
///
/// These surface only from the synchronous creation path (`schedule_new`,
/// `initialize`). Fire-time failures never propagate to a caller; they are
/// recorded on the affected record instead.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A creation request is missing or misusing required fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The supplied cron expression does not parse.
    #[error("Invalid cron expression: {0}")]
    InvalidCron(String),

    /// The persistence store rejected an operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
