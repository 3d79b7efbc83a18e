//! Persistence interface for scheduled sends.
//!
//! The engine only ever talks to a [`SendStore`]; the SQLite backend lives in
//! [`crate::db`] and tests substitute an in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;

use crate::types::{ScheduledSend, SendPayload, SendStatus};

/// Errors surfaced by a scheduled-send store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No record with the given ID exists in the store.
    #[error("Scheduled send not found: {id}")]
    NotFound { id: String },
}

/// Field set for a new record. The store assigns `id`, `created_at`, and the
/// initial `pending` status.
#[derive(Debug, Clone)]
pub struct NewScheduledSend {
    pub destination: String,
    pub payload: SendPayload,
    pub scheduled_time: DateTime<Local>,
    pub repeat: bool,
    pub cron_expression: Option<String>,
}

/// Partial update applied by [`SendStore::update_by_id`].
///
/// Writing a status also refreshes the `sent` mirror flag; absent fields are
/// left untouched.
#[derive(Debug, Clone, Default)]
pub struct SendUpdate {
    pub status: Option<SendStatus>,
    pub last_sent_at: Option<DateTime<Local>>,
    pub error: Option<String>,
}

impl SendUpdate {
    /// One-time send delivered: terminal `sent` plus the fire timestamp.
    pub fn delivered(at: DateTime<Local>) -> Self {
        Self {
            status: Some(SendStatus::Sent),
            last_sent_at: Some(at),
            error: None,
        }
    }

    /// Recurring send delivered: only the fire timestamp moves.
    pub fn fired(at: DateTime<Local>) -> Self {
        Self {
            last_sent_at: Some(at),
            ..Self::default()
        }
    }

    /// Terminal failure with an explanatory note.
    pub fn failed(note: impl Into<String>) -> Self {
        Self {
            status: Some(SendStatus::Failed),
            last_sent_at: None,
            error: Some(note.into()),
        }
    }

    /// Failure note without a status change (recurring retry mode).
    pub fn noted(note: impl Into<String>) -> Self {
        Self {
            error: Some(note.into()),
            ..Self::default()
        }
    }
}

/// Durable record of each scheduled send and its lifecycle status.
#[async_trait]
pub trait SendStore: Send + Sync {
    /// All records still eligible for arming (`status = pending`), oldest first.
    async fn find_pending(&self) -> Result<Vec<ScheduledSend>, StoreError>;

    /// Persist a new record; returns it with `id` and `created_at` assigned.
    async fn insert(&self, new: NewScheduledSend) -> Result<ScheduledSend, StoreError>;

    /// Apply a partial update to the record with `id`.
    async fn update_by_id(&self, id: &str, update: SendUpdate) -> Result<(), StoreError>;

    /// Fetch a single record by identity.
    async fn find_by_id(&self, id: &str) -> Result<Option<ScheduledSend>, StoreError>;
}
