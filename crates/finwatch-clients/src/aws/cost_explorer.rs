//! Cost Explorer billing source.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_costexplorer::types::{DateInterval, Granularity, ResultByTime};
use chrono::NaiveDate;
use finwatch_abstraction::{BillingSource, DailyCostPoint, UpstreamError};
use tracing::{debug, warn};

use super::describe_sdk_error;

const SERVICE: &str = "cost-explorer";
const UNBLENDED_COST: &str = "UnblendedCost";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Daily unblended cost from AWS Cost Explorer.
#[derive(Debug, Clone)]
pub struct CostExplorerBilling {
    client: aws_sdk_costexplorer::Client,
}

impl CostExplorerBilling {
    /// Creates a billing source from a loaded SDK configuration.
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self { client: aws_sdk_costexplorer::Client::new(sdk_config) }
    }

    /// Wraps an existing Cost Explorer client.
    #[must_use]
    pub const fn from_client(client: aws_sdk_costexplorer::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BillingSource for CostExplorerBilling {
    async fn daily_costs(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyCostPoint>, UpstreamError> {
        let period = DateInterval::builder()
            .start(start.format(DATE_FORMAT).to_string())
            .end(end.format(DATE_FORMAT).to_string())
            .build()
            .map_err(|e| UpstreamError::malformed(SERVICE, e.to_string()))?;

        debug!(%start, %end, "Querying daily unblended cost");

        let response = self
            .client
            .get_cost_and_usage()
            .time_period(period)
            .granularity(Granularity::Daily)
            .metrics(UNBLENDED_COST)
            .send()
            .await
            .map_err(|e| UpstreamError::unreachable(SERVICE, describe_sdk_error(&e)))?;

        let mut points = Vec::with_capacity(response.results_by_time().len());
        for result in response.results_by_time() {
            match parse_result(result) {
                Ok(point) => points.push(point),
                Err(reason) => warn!(reason = %reason, "Skipping day due to missing or invalid data"),
            }
        }

        Ok(points)
    }
}

fn parse_result(result: &ResultByTime) -> Result<DailyCostPoint, String> {
    let start = result.time_period().map(DateInterval::start).ok_or("missing time period")?;
    let date = NaiveDate::parse_from_str(start, DATE_FORMAT)
        .map_err(|e| format!("invalid date '{start}': {e}"))?;

    let amount = result
        .total()
        .and_then(|total| total.get(UNBLENDED_COST))
        .and_then(|metric| metric.amount())
        .ok_or_else(|| format!("no {UNBLENDED_COST} amount for {date}"))?;
    let unblended_cost = amount
        .parse::<f64>()
        .map_err(|e| format!("invalid amount '{amount}' for {date}: {e}"))?;

    Ok(DailyCostPoint::new(date, unblended_cost))
}
