//! Severity classification and team grouping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::policy::TeamConfig;
use super::violations::ResourceRecord;

/// A tag whose value is not in the policy's allowed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidTag {
    /// Tag key.
    pub key: String,
    /// Value found on the resource.
    pub value: String,
    /// Values the policy accepts for this key.
    pub allowed: Vec<String>,
}

/// A resource together with the violations found on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedResource {
    /// The resource as fetched.
    #[serde(flatten)]
    pub resource: ResourceRecord,
    /// Required tag keys absent from the resource.
    pub missing_tags: Vec<String>,
    /// Present tags with values outside the allowed list.
    pub invalid_tags: Vec<InvalidTag>,
}

impl ClassifiedResource {
    /// Owning team of the resource.
    pub fn team(&self) -> &str {
        self.resource.team()
    }
}

/// Violating resources partitioned by severity. Missing tags dominate invalid values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Resources missing at least one required tag.
    pub missing_tags: Vec<ClassifiedResource>,
    /// Resources with every required tag but at least one invalid value.
    pub invalid_values: Vec<ClassifiedResource>,
}

impl ComplianceReport {
    /// Number of resources across both buckets.
    pub fn total(&self) -> usize {
        self.missing_tags.len() + self.invalid_values.len()
    }

    /// Whether both buckets are empty.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// All resources, missing-tag bucket first.
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedResource> {
        self.missing_tags.iter().chain(&self.invalid_values)
    }
}

/// Checks every record against the required tag keys and the policy's allowed values.
///
/// A record with any missing key goes to `missing_tags` (its invalid values are still
/// listed); otherwise a record with invalid values goes to `invalid_values`. Fully
/// compliant records are dropped. The input is not modified.
pub fn classify(
    records: &[ResourceRecord],
    required_tags: &[String],
    policy: &TeamConfig,
) -> ComplianceReport {
    let mut report = ComplianceReport::default();

    for record in records {
        let mut missing_tags = Vec::new();
        let mut invalid_tags = Vec::new();

        for key in required_tags {
            match record.tags.get(key) {
                None => missing_tags.push(key.clone()),
                Some(value) => {
                    let allowed = policy.allowed_for(key);
                    if !allowed.is_empty() && !allowed.contains(value) {
                        invalid_tags.push(InvalidTag {
                            key: key.clone(),
                            value: value.clone(),
                            allowed: allowed.to_vec(),
                        });
                    }
                }
            }
        }

        let classified =
            ClassifiedResource { resource: record.clone(), missing_tags, invalid_tags };
        if !classified.missing_tags.is_empty() {
            report.missing_tags.push(classified);
        } else if !classified.invalid_tags.is_empty() {
            report.invalid_values.push(classified);
        }
    }

    report
}

/// Groups every classified resource by its `team` tag (`"unknown"` when absent).
pub fn group_by_team(report: &ComplianceReport) -> BTreeMap<String, Vec<ClassifiedResource>> {
    let mut groups: BTreeMap<String, Vec<ClassifiedResource>> = BTreeMap::new();
    for resource in report.iter() {
        groups.entry(resource.team().to_string()).or_default().push(resource.clone());
    }
    groups
}
