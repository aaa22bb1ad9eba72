//! Fetching non-compliant resources and applying the grace period.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use finwatch_abstraction::{ComplianceSource, Evaluation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Tag holding the owning team of a resource.
pub const TEAM_TAG: &str = "team";

/// Team assigned to resources without a team tag.
pub const UNKNOWN_TEAM: &str = "unknown";

/// A resource reported as violating the required-tags rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Resource type (e.g., "AWS::S3::Bucket").
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
    /// Creation time, when the configuration history lookup succeeded and recorded one.
    pub creation_time: Option<DateTime<Utc>>,
    /// Current tags; empty when the lookup failed.
    pub tags: BTreeMap<String, String>,
    /// Compliance status reported by the rule evaluation.
    pub compliance_type: Option<String>,
}

impl ResourceRecord {
    /// Creates a record with no creation time and no tags.
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            creation_time: None,
            tags: BTreeMap::new(),
            compliance_type: None,
        }
    }

    /// Sets the creation time.
    #[must_use]
    pub fn created_at(mut self, creation_time: DateTime<Utc>) -> Self {
        self.creation_time = Some(creation_time);
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Owning team from the `team` tag, or `"unknown"`.
    pub fn team(&self) -> &str {
        self.tags.get(TEAM_TAG).map_or(UNKNOWN_TEAM, String::as_str)
    }
}

/// Collects every non-compliant resource of `rule_name`, following continuation tokens
/// until the service reports no further pages.
///
/// Each resource's creation time and tags come from a per-resource history lookup.
/// A failed lookup keeps the resource with no creation time and no tags.
pub async fn fetch_violations(
    source: &dyn ComplianceSource,
    rule_name: &str,
    page_size: i32,
    now: DateTime<Utc>,
) -> Result<Vec<ResourceRecord>> {
    let mut records = Vec::new();
    let mut next_token = None;
    let mut pages = 0usize;

    loop {
        let page = source.non_compliant_page(rule_name, page_size, next_token).await?;
        pages += 1;

        for evaluation in page.evaluations {
            if let Some(record) = resolve(source, evaluation, now).await {
                records.push(record);
            }
        }

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    info!(rule_name, pages, resources = records.len(), "Fetched non-compliant resources");
    Ok(records)
}

async fn resolve(
    source: &dyn ComplianceSource,
    evaluation: Evaluation,
    now: DateTime<Utc>,
) -> Option<ResourceRecord> {
    let Evaluation { resource_type, resource_id, compliance_type } = evaluation;
    let (Some(resource_type), Some(resource_id)) = (resource_type, resource_id) else {
        debug!("Skipping evaluation without resource type or id");
        return None;
    };

    let mut record = ResourceRecord::new(resource_type, resource_id);
    record.compliance_type = compliance_type;

    match source.latest_configuration(&record.resource_type, &record.resource_id, now).await {
        Ok(snapshot) => {
            record.creation_time = snapshot.creation_time;
            record.tags = snapshot.tags;
        }
        Err(e) => {
            warn!(
                resource_type = %record.resource_type,
                resource_id = %record.resource_id,
                error = %e,
                "Could not get config history; including resource without creation time"
            );
        }
    }

    Some(record)
}

/// Drops resources created within the last `grace_days` days.
///
/// Resources strictly older than `now - grace_days` are kept, and so are resources
/// whose creation time is unknown.
pub fn apply_grace_period(
    records: Vec<ResourceRecord>,
    grace_days: u32,
    now: DateTime<Utc>,
) -> Vec<ResourceRecord> {
    let cutoff = now - Duration::days(i64::from(grace_days));

    records
        .into_iter()
        .filter(|record| match record.creation_time {
            None => true,
            Some(created) if created < cutoff => true,
            Some(created) => {
                debug!(
                    resource_id = %record.resource_id,
                    created = %created,
                    "Skipping resource within grace period"
                );
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use finwatch_abstraction::{ConfigurationSnapshot, UpstreamError};
    use finwatch_clients::InMemoryCompliance;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-15T02:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_grace_period_excludes_recent_resources() {
        let records = vec![
            ResourceRecord::new("AWS::S3::Bucket", "recent").created_at(now() - Duration::days(5)),
            ResourceRecord::new("AWS::S3::Bucket", "old").created_at(now() - Duration::days(20)),
        ];

        let kept = apply_grace_period(records, 14, now());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].resource_id, "old");
    }

    #[test]
    fn test_grace_period_keeps_unknown_age() {
        let kept = apply_grace_period(vec![ResourceRecord::new("AWS::S3::Bucket", "x")], 14, now());
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_grace_period_boundary_is_strict() {
        let at_cutoff =
            ResourceRecord::new("AWS::S3::Bucket", "edge").created_at(now() - Duration::days(14));
        assert!(apply_grace_period(vec![at_cutoff], 14, now()).is_empty());
    }

    #[test]
    fn test_zero_grace_period_keeps_past_resources() {
        let record =
            ResourceRecord::new("AWS::S3::Bucket", "x").created_at(now() - Duration::seconds(1));
        assert_eq!(apply_grace_period(vec![record], 0, now()).len(), 1);
    }

    #[test]
    fn test_team_defaults_to_unknown() {
        let record = ResourceRecord::new("AWS::S3::Bucket", "x");
        assert_eq!(record.team(), "unknown");
        assert_eq!(record.with_tag("team", "platform").team(), "platform");
    }

    #[tokio::test]
    async fn test_fetch_violations_follows_pages() {
        let source = InMemoryCompliance::new()
            .with_page(vec![InMemoryCompliance::evaluation("AWS::S3::Bucket", "a")])
            .with_page(vec![InMemoryCompliance::evaluation("AWS::EC2::Instance", "b")])
            .with_page(vec![InMemoryCompliance::evaluation("AWS::RDS::DBInstance", "c")]);

        let records = fetch_violations(&source, "required-tags-check", 100, now()).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.resource_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(source.requested_tokens().len(), 3);
        assert_eq!(records[0].compliance_type.as_deref(), Some("NON_COMPLIANT"));
    }

    #[tokio::test]
    async fn test_fetch_violations_uses_snapshot() {
        let created = now() - Duration::days(30);
        let source = InMemoryCompliance::new()
            .with_page(vec![InMemoryCompliance::evaluation("AWS::S3::Bucket", "a")])
            .with_snapshot(
                "AWS::S3::Bucket",
                "a",
                ConfigurationSnapshot {
                    creation_time: Some(created),
                    tags: BTreeMap::from([("team".to_string(), "data".to_string())]),
                },
            );

        let records = fetch_violations(&source, "rule", 100, now()).await.unwrap();
        assert_eq!(records[0].creation_time, Some(created));
        assert_eq!(records[0].team(), "data");
    }

    #[tokio::test]
    async fn test_fetch_violations_keeps_failed_lookup() {
        let source = InMemoryCompliance::new()
            .with_page(vec![InMemoryCompliance::evaluation("AWS::S3::Bucket", "a")])
            .with_failed_lookup("AWS::S3::Bucket", "a");

        let records = fetch_violations(&source, "rule", 100, now()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].creation_time, None);
        assert!(records[0].tags.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_violations_skips_incomplete_evaluations() {
        let source = InMemoryCompliance::new().with_page(vec![
            Evaluation { resource_type: Some("AWS::S3::Bucket".to_string()), ..Default::default() },
            InMemoryCompliance::evaluation("AWS::S3::Bucket", "kept"),
        ]);

        let records = fetch_violations(&source, "rule", 100, now()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resource_id, "kept");
    }

    #[tokio::test]
    async fn test_fetch_violations_page_failure_is_fatal() {
        let source = InMemoryCompliance::new()
            .with_page_failure(UpstreamError::unreachable("config", "AccessDenied"));

        let err = fetch_violations(&source, "rule", 100, now()).await.unwrap_err();
        assert!(err.to_string().contains("AccessDenied"));
    }
}
