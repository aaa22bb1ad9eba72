//! Cost anomaly function.
//!
//! Invoked on a daily schedule. Compares the latest day's spend to the
//! trailing baseline and emails an alert when it exceeds the threshold.

use std::sync::Arc;

use anyhow::Context;
use aws_config::BehaviorVersion;
use chrono::Utc;
use finwatch_clients::{CostExplorerBilling, SesNotifier};
use finwatch_core::{CostAnomalyChecker, CostAnomalyConfig, InvocationResponse, logging};
use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init();

    let config = CostAnomalyConfig::from_env()
        .inspect_err(|e| error!(error = %e, "Invalid cost anomaly configuration"))
        .context("failed to load cost anomaly configuration")?;
    info!(
        threshold = config.anomaly_threshold,
        lookback_days = config.lookback_days,
        "Starting cost anomaly function"
    );

    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let checker = Arc::new(CostAnomalyChecker::new(
        Arc::new(CostExplorerBilling::new(&sdk_config)),
        Arc::new(SesNotifier::new(&sdk_config)),
        config,
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let checker = Arc::clone(&checker);
        async move { handle(&checker, event).await }
    }))
    .await
}

async fn handle(
    checker: &CostAnomalyChecker,
    event: LambdaEvent<Value>,
) -> Result<InvocationResponse, Error> {
    info!(request_id = %event.context.request_id, "Cost anomaly check invoked");
    Ok(checker.run(Utc::now().date_naive()).await)
}
