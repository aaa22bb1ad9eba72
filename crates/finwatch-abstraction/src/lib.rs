//! Upstream service abstraction layer for finwatch.
//!
//! This crate defines the values exchanged with the billing, compliance,
//! object-store and email services, and the async traits the report
//! pipelines are written against. Concrete implementations live in
//! `finwatch-clients`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents an error returned by a billing, compliance or object-store query.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpstreamError {
    /// The service could not be reached or rejected the request.
    #[error("{service} request failed: {message}")]
    Unreachable {
        /// Short service name (e.g., "cost-explorer", "config").
        service: String,
        /// Error detail reported by the client.
        message: String,
    },

    /// The service answered but the response could not be interpreted.
    #[error("{service} returned a malformed response: {message}")]
    Malformed {
        /// Short service name.
        service: String,
        /// What was wrong with the response.
        message: String,
    },
}

impl UpstreamError {
    /// Creates an [`UpstreamError::Unreachable`].
    pub fn unreachable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable { service: service.into(), message: message.into() }
    }

    /// Creates an [`UpstreamError::Malformed`].
    pub fn malformed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed { service: service.into(), message: message.into() }
    }
}

/// Represents an error raised while dispatching an email.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyError {
    /// The message could not be built (e.g., empty recipient).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The email service refused or failed the request.
    #[error("dispatch to {recipient} failed: {message}")]
    Dispatch {
        /// Recipient address of the failed message.
        recipient: String,
        /// Error detail reported by the client.
        message: String,
    },
}

/// Total unblended cost for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyCostPoint {
    /// Day the cost was incurred (UTC).
    pub date: NaiveDate,
    /// Unblended cost in USD.
    pub unblended_cost: f64,
}

impl DailyCostPoint {
    /// Creates a new cost point.
    #[must_use]
    pub const fn new(date: NaiveDate, unblended_cost: f64) -> Self {
        Self { date, unblended_cost }
    }
}

/// One row of a compliance rule evaluation query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Resource type (e.g., "AWS::S3::Bucket").
    pub resource_type: Option<String>,
    /// Resource identifier.
    pub resource_id: Option<String>,
    /// Compliance status reported for the resource (e.g., "NON_COMPLIANT").
    pub compliance_type: Option<String>,
}

/// A page of compliance rule evaluations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationPage {
    /// Evaluations on this page.
    pub evaluations: Vec<Evaluation>,
    /// Continuation token; `None` marks the last page.
    pub next_token: Option<String>,
}

/// Latest known configuration of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    /// When the resource was created, if recorded.
    pub creation_time: Option<DateTime<Utc>>,
    /// Tags currently attached to the resource.
    pub tags: BTreeMap<String, String>,
}

/// A plain-text email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Source of daily billing totals.
#[async_trait]
pub trait BillingSource: Send + Sync {
    /// Returns daily unblended cost for every day in `[start, end)`, oldest first.
    ///
    /// Days whose amount is missing or unparseable are omitted.
    ///
    /// # Errors
    /// Returns an `UpstreamError` if the billing service cannot be queried.
    async fn daily_costs(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyCostPoint>, UpstreamError>;
}

/// Source of compliance rule evaluations and resource configuration history.
#[async_trait]
pub trait ComplianceSource: Send + Sync {
    /// Fetches one page of non-compliant evaluations for `rule_name`.
    ///
    /// # Arguments
    /// * `rule_name` - The compliance rule to query
    /// * `page_size` - Maximum evaluations per page
    /// * `next_token` - Continuation token from the previous page, if any
    ///
    /// # Errors
    /// Returns an `UpstreamError` if the query fails.
    async fn non_compliant_page(
        &self,
        rule_name: &str,
        page_size: i32,
        next_token: Option<String>,
    ) -> Result<EvaluationPage, UpstreamError>;

    /// Returns the newest configuration snapshot of a resource recorded at or before `at`.
    ///
    /// # Errors
    /// Returns an `UpstreamError` if the history lookup fails.
    async fn latest_configuration(
        &self,
        resource_type: &str,
        resource_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ConfigurationSnapshot, UpstreamError>;
}

/// Read-only access to a bucket/key object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads the full contents of an object.
    ///
    /// # Errors
    /// Returns an `UpstreamError` if the object is missing or unreadable.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, UpstreamError>;
}

/// Fire-and-forget email dispatch.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a single email.
    ///
    /// # Errors
    /// Returns a `NotifyError` if the email service rejects the message.
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display() {
        let err = UpstreamError::unreachable("cost-explorer", "connection reset");
        let msg = err.to_string();
        assert!(msg.contains("cost-explorer"));
        assert!(msg.contains("connection reset"));

        let err = UpstreamError::malformed("config", "no evaluation results");
        assert!(err.to_string().contains("malformed response"));
    }

    #[test]
    fn test_notify_error_display() {
        let err = NotifyError::Dispatch {
            recipient: "team@example.com".to_string(),
            message: "throttled".to_string(),
        };
        assert_eq!(err.to_string(), "dispatch to team@example.com failed: throttled");
    }

    #[test]
    fn test_configuration_snapshot_default_is_empty() {
        let snapshot = ConfigurationSnapshot::default();
        assert!(snapshot.creation_time.is_none());
        assert!(snapshot.tags.is_empty());
    }

    #[test]
    fn test_daily_cost_point_serialization() {
        let point = DailyCostPoint::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 12.5);
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["unblended_cost"], 12.5);
    }
}
