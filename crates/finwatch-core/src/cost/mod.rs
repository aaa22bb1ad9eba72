//! Daily cost anomaly detection.
//!
//! The checker compares the most recent day's unblended cost to the mean of
//! the preceding days in a trailing window and emails an alert when the ratio
//! exceeds the configured threshold.

pub mod checker;
pub mod detector;

pub use checker::{ALERT_SUBJECT, CostAnomalyChecker, alert_body};
pub use detector::{AnomalyVerdict, CostWindow, detect_anomaly};
