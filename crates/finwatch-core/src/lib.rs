//! Finwatch Core - scheduled cloud spend and tagging checks.
//!
//! This crate provides the logic behind the two finwatch functions:
//! - Cost anomaly detection over the trailing daily spend
//! - The daily tag compliance digest
//!
//! Upstream services are reached only through the traits in
//! `finwatch-abstraction`, so both pipelines run unchanged against the AWS
//! clients and the in-memory ones used in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use finwatch_clients::{InMemoryBilling, RecordingNotifier};
//! use finwatch_core::{CostAnomalyChecker, CostAnomalyConfig};
//!
//! # async fn example() -> finwatch_core::Result<()> {
//! let config = CostAnomalyConfig::from_env()?;
//! let today = chrono::Utc::now().date_naive();
//! let billing = Arc::new(InMemoryBilling::trailing(today, &[100.0, 100.0, 130.0]));
//! let checker = CostAnomalyChecker::new(billing, Arc::new(RecordingNotifier::new()), config);
//! let response = checker.run(today).await;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```

pub mod compliance;
pub mod config;
pub mod cost;
pub mod error;
pub mod logging;
pub mod notify;
pub mod response;

pub use compliance::{
    ClassifiedResource, ComplianceReport, DigestOutcome, DigestRenderer, DigestSummary,
    ResourceRecord, TagComplianceDigester, TeamConfig, TeamInfo,
};
pub use config::{CostAnomalyConfig, TagComplianceConfig};
pub use cost::{AnomalyVerdict, CostAnomalyChecker, CostWindow, detect_anomaly};
pub use error::{FinwatchError, Result};
pub use notify::{Delivery, Mailer};
pub use response::InvocationResponse;
