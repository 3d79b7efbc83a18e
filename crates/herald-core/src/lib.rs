//! `herald-core` — configuration and shared error types for the herald bot.

pub mod config;
pub mod error;

pub use config::{DatabaseConfig, HeraldConfig, SchedulerConfig};
pub use error::{HeraldError, Result};
