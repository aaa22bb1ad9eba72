//! Threshold comparison against the trailing baseline.

use chrono::{Days, NaiveDate};
use finwatch_abstraction::DailyCostPoint;
use serde::{Deserialize, Serialize};

/// Outcome of an anomaly check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    /// Whether the latest day exceeded the threshold.
    #[serde(rename = "anomaly")]
    pub is_anomaly: bool,
    /// Cost of the latest day in USD (0 when fewer than two days were available).
    #[serde(rename = "cost")]
    pub latest_cost: f64,
}

impl AnomalyVerdict {
    const NO_DATA: Self = Self { is_anomaly: false, latest_cost: 0.0 };
}

/// Half-open date range `[start, end)` queried from the billing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostWindow {
    /// First day included.
    pub start: NaiveDate,
    /// First day excluded.
    pub end: NaiveDate,
}

impl CostWindow {
    /// The `days` full days before `today`; today itself is still accruing and excluded.
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        let start = today.checked_sub_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }
}

/// Flags the latest point when it exceeds the mean of all earlier points times `threshold`.
///
/// Fewer than two points yields no anomaly and a cost of zero. A baseline
/// mean of zero or below never flags.
pub fn detect_anomaly(points: &[DailyCostPoint], threshold: f64) -> AnomalyVerdict {
    let Some((latest, prior)) = points.split_last() else {
        return AnomalyVerdict::NO_DATA;
    };
    if prior.is_empty() {
        return AnomalyVerdict::NO_DATA;
    }

    let latest_cost = latest.unblended_cost;
    let mean_prior = prior.iter().map(|p| p.unblended_cost).sum::<f64>() / prior.len() as f64;

    let is_anomaly = mean_prior > 0.0 && latest_cost > mean_prior * threshold;
    AnomalyVerdict { is_anomaly, latest_cost }
}
