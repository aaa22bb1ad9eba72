//! In-memory implementations of the upstream traits.
//!
//! These hold canned responses and record what they were asked, which makes
//! them suitable for tests and for exercising the pipelines without AWS access.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use finwatch_abstraction::{
    BillingSource, ComplianceSource, ConfigurationSnapshot, DailyCostPoint, EmailMessage,
    Evaluation, EvaluationPage, Notifier, NotifyError, ObjectStore, UpstreamError,
};
use tracing::debug;

/// Billing source backed by a fixed list of cost points.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBilling {
    points: Vec<DailyCostPoint>,
    failure: Option<UpstreamError>,
}

impl InMemoryBilling {
    /// Creates a billing source returning `points` (filtered to the requested window).
    #[must_use]
    pub fn new(points: Vec<DailyCostPoint>) -> Self {
        Self { points, failure: None }
    }

    /// Creates a billing source whose every query fails with `error`.
    #[must_use]
    pub fn failing(error: UpstreamError) -> Self {
        Self { points: Vec::new(), failure: Some(error) }
    }

    /// Builds consecutive daily points ending the day before `end`.
    #[must_use]
    pub fn trailing(end: NaiveDate, costs: &[f64]) -> Self {
        let days = costs.len() as u64;
        let points = costs
            .iter()
            .zip(0u64..)
            .filter_map(|(cost, offset)| {
                end.checked_sub_days(chrono::Days::new(days - offset))
                    .map(|date| DailyCostPoint::new(date, *cost))
            })
            .collect();
        Self::new(points)
    }
}

#[async_trait]
impl BillingSource for InMemoryBilling {
    async fn daily_costs(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyCostPoint>, UpstreamError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut points: Vec<DailyCostPoint> =
            self.points.iter().copied().filter(|p| p.date >= start && p.date < end).collect();
        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

type LookupResult = Result<ConfigurationSnapshot, UpstreamError>;

/// Compliance source serving pre-built evaluation pages.
///
/// Page `n` is addressed by the continuation token `page-n`; the first page is
/// served when no token is given.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCompliance {
    pages: Vec<Vec<Evaluation>>,
    lookups: HashMap<(String, String), LookupResult>,
    page_failure: Option<UpstreamError>,
    requested_tokens: Arc<Mutex<Vec<Option<String>>>>,
}

impl InMemoryCompliance {
    /// Creates an empty compliance source (a single empty page).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page of evaluations.
    #[must_use]
    pub fn with_page(mut self, evaluations: Vec<Evaluation>) -> Self {
        self.pages.push(evaluations);
        self
    }

    /// Registers the configuration snapshot returned for a resource.
    #[must_use]
    pub fn with_snapshot(
        mut self,
        resource_type: &str,
        resource_id: &str,
        snapshot: ConfigurationSnapshot,
    ) -> Self {
        self.lookups.insert((resource_type.to_string(), resource_id.to_string()), Ok(snapshot));
        self
    }

    /// Makes the configuration lookup for a resource fail.
    #[must_use]
    pub fn with_failed_lookup(mut self, resource_type: &str, resource_id: &str) -> Self {
        self.lookups.insert(
            (resource_type.to_string(), resource_id.to_string()),
            Err(UpstreamError::unreachable("config", "ResourceNotDiscoveredException")),
        );
        self
    }

    /// Makes every page query fail with `error`.
    #[must_use]
    pub fn with_page_failure(mut self, error: UpstreamError) -> Self {
        self.page_failure = Some(error);
        self
    }

    /// Continuation tokens received so far, in call order.
    pub fn requested_tokens(&self) -> Vec<Option<String>> {
        self.requested_tokens.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Builds a non-compliant evaluation row.
    pub fn evaluation(resource_type: &str, resource_id: &str) -> Evaluation {
        Evaluation {
            resource_type: Some(resource_type.to_string()),
            resource_id: Some(resource_id.to_string()),
            compliance_type: Some("NON_COMPLIANT".to_string()),
        }
    }
}

#[async_trait]
impl ComplianceSource for InMemoryCompliance {
    async fn non_compliant_page(
        &self,
        rule_name: &str,
        page_size: i32,
        next_token: Option<String>,
    ) -> Result<EvaluationPage, UpstreamError> {
        self.requested_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(next_token.clone());
        debug!(rule_name, page_size, ?next_token, "Serving in-memory evaluation page");

        if let Some(error) = &self.page_failure {
            return Err(error.clone());
        }

        let index = match next_token.as_deref() {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n < self.pages.len())
                .ok_or_else(|| {
                    UpstreamError::unreachable("config", format!("invalid next token '{token}'"))
                })?,
        };

        let evaluations = self.pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));
        Ok(EvaluationPage { evaluations, next_token })
    }

    async fn latest_configuration(
        &self,
        resource_type: &str,
        resource_id: &str,
        _at: DateTime<Utc>,
    ) -> Result<ConfigurationSnapshot, UpstreamError> {
        self.lookups
            .get(&(resource_type.to_string(), resource_id.to_string()))
            .cloned()
            .unwrap_or_else(|| Ok(ConfigurationSnapshot::default()))
    }
}

/// Object store backed by a map of `(bucket, key)` to bytes.
#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStore {
    objects: HashMap<(String, String), Vec<u8>>,
}

impl InMemoryObjectStore {
    /// Creates an empty object store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object.
    #[must_use]
    pub fn with_object(mut self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) -> Self {
        self.objects.insert((bucket.to_string(), key.to_string()), data.into());
        self
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, UpstreamError> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| UpstreamError::unreachable("s3", format!("s3://{bucket}/{key}: NoSuchKey")))
    }
}

/// Notifier that records every message instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    failing_recipients: BTreeSet<String>,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes dispatch to `recipient` fail.
    #[must_use]
    pub fn failing_for(mut self, recipient: &str) -> Self {
        self.failing_recipients.insert(recipient.to_string());
        self
    }

    /// Messages accepted so far, in dispatch order.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Messages accepted for a single recipient.
    pub fn sent_to(&self, recipient: &str) -> Vec<EmailMessage> {
        self.sent().into_iter().filter(|m| m.to == recipient).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        if self.failing_recipients.contains(&message.to) {
            return Err(NotifyError::Dispatch {
                recipient: message.to.clone(),
                message: "MessageRejected".to_string(),
            });
        }
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(message.clone());
        Ok(())
    }
}
