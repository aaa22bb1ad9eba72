//! Daily tag compliance digest.
//!
//! Violations of the required-tags rule are fetched, filtered by resource age,
//! split into severity buckets against the policy document and mailed as one
//! aggregate digest plus one digest per known team.

pub mod classify;
pub mod digest;
pub mod digester;
pub mod policy;
pub mod violations;

pub use classify::{ClassifiedResource, ComplianceReport, InvalidTag, classify, group_by_team};
pub use digest::{DigestRenderer, ERROR_SUBJECT};
pub use digester::{ALL_COMPLIANT, DigestOutcome, DigestSummary, TagComplianceDigester};
pub use policy::{TeamConfig, TeamInfo, load_policy};
pub use violations::{
    ResourceRecord, TEAM_TAG, UNKNOWN_TEAM, apply_grace_period, fetch_violations,
};
