//! `herald-scheduler` — Tokio-based send scheduler with SQLite persistence.
//!
//! # Overview
//!
//! Scheduled sends are persisted to a `scheduled_sends` table. The
//! [`engine::SchedulerEngine`] keeps an in-memory registry of armed jobs
//! (one per record identity) and reconciles the stored status with the
//! outcome of every execution attempt. On startup, [`SchedulerEngine::initialize`]
//! rehydrates the registry from every record still `pending` in the store.
//!
//! # Job kinds
//!
//! | Kind        | Trigger                                        | After a successful fire        |
//! |-------------|------------------------------------------------|--------------------------------|
//! | `OneTime`   | single `tokio` sleep until `scheduled_time`    | `sent`, job retired            |
//! | `Recurring` | cron expression, one fire per occurrence       | `last_sent_at` moves, job stays|
//!
//! Delivery itself is an injected capability ([`herald_delivery::SendExecutor`]);
//! this crate never talks to a chat platform directly.

pub mod cron;
pub mod db;
pub mod engine;
pub mod error;
pub mod store;
pub mod types;

pub use db::SqliteSendStore;
pub use engine::{JobKind, SchedulerEngine};
pub use error::{Result, SchedulerError};
pub use store::{NewScheduledSend, SendStore, SendUpdate, StoreError};
pub use types::{ScheduleRequest, ScheduledSend, SendPayload, SendStatus};
