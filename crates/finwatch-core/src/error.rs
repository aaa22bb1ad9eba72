//! Error types for finwatch Core.

use finwatch_abstraction::{NotifyError, UpstreamError};
use thiserror::Error;

/// Core error type for a report run.
#[derive(Error, Debug)]
pub enum FinwatchError {
    /// Billing or compliance service unreachable or returned garbage
    #[error("Upstream query error: {0}")]
    UpstreamQuery(#[from] UpstreamError),

    /// Policy document missing or unparseable
    #[error("Policy load error: {0}")]
    ConfigLoad(String),

    /// Email dispatch failed
    #[error("Notification error: {0}")]
    Notification(#[from] NotifyError),

    /// Invalid environment configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for FinwatchError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for finwatch operations.
pub type Result<T> = std::result::Result<T, FinwatchError>;
