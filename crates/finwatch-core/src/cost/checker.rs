//! Cost anomaly pipeline: fetch, detect, notify.

use std::sync::Arc;

use chrono::NaiveDate;
use finwatch_abstraction::{BillingSource, DailyCostPoint, Notifier};
use tracing::{error, info, warn};

use super::detector::{AnomalyVerdict, CostWindow, detect_anomaly};
use crate::config::CostAnomalyConfig;
use crate::error::Result;
use crate::notify::{Delivery, Mailer};
use crate::response::InvocationResponse;

/// Subject line of the anomaly alert.
pub const ALERT_SUBJECT: &str = "AWS Cost Anomaly Detected";

/// Body of the anomaly alert for a given daily cost.
pub fn alert_body(cost: f64) -> String {
    format!("Alert: Cost anomaly detected. Latest daily cost: ${:.2}", cost)
}

/// Runs the daily cost anomaly check.
pub struct CostAnomalyChecker {
    billing: Arc<dyn BillingSource>,
    mailer: Mailer,
    config: CostAnomalyConfig,
}

impl CostAnomalyChecker {
    /// Creates a checker from its upstream clients and configuration.
    pub fn new(
        billing: Arc<dyn BillingSource>,
        notifier: Arc<dyn Notifier>,
        config: CostAnomalyConfig,
    ) -> Self {
        let mailer = Mailer::new(notifier, config.sender());
        Self { billing, mailer, config }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &CostAnomalyConfig {
        &self.config
    }

    /// Fetches daily costs for the trailing window ending before `today`.
    pub async fn fetch_recent_costs(&self, today: NaiveDate) -> Result<Vec<DailyCostPoint>> {
        let window = CostWindow::trailing(today, self.config.lookback_days);
        let points = self.billing.daily_costs(window.start, window.end).await?;
        info!(
            start = %window.start,
            end = %window.end,
            days = points.len(),
            "Fetched daily cost data"
        );
        Ok(points)
    }

    /// Emails the anomaly alert for `cost`. Not retried.
    pub async fn notify(&self, cost: f64) -> Result<Delivery> {
        let delivery =
            self.mailer.send(&self.config.alert_email, ALERT_SUBJECT, &alert_body(cost)).await?;
        Ok(delivery)
    }

    /// Fetches, detects and alerts if needed.
    pub async fn check(&self, today: NaiveDate) -> Result<AnomalyVerdict> {
        let points = self.fetch_recent_costs(today).await?;
        if points.len() < 2 {
            warn!(days = points.len(), "Not enough cost data to establish a baseline");
        }

        let verdict = detect_anomaly(&points, self.config.anomaly_threshold);
        info!(
            anomaly = verdict.is_anomaly,
            latest_cost = verdict.latest_cost,
            threshold = self.config.anomaly_threshold,
            "Cost anomaly check complete"
        );

        if verdict.is_anomaly {
            self.notify(verdict.latest_cost).await?;
        }
        Ok(verdict)
    }

    /// Entry point: runs [`check`](Self::check) and converts the outcome into a response.
    pub async fn run(&self, today: NaiveDate) -> InvocationResponse {
        match self.check(today).await {
            Ok(verdict) => InvocationResponse::ok(&verdict),
            Err(e) => {
                error!(error = %e, "Cost anomaly check failed");
                InvocationResponse::error(&format!("Error during cost anomaly check: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_body_formats_dollars() {
        assert_eq!(alert_body(130.0), "Alert: Cost anomaly detected. Latest daily cost: $130.00");
        assert_eq!(alert_body(42.456), "Alert: Cost anomaly detected. Latest daily cost: $42.46");
    }
}
