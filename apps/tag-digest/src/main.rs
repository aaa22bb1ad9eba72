//! Tag compliance digest function.
//!
//! Invoked on a daily schedule. Reports resources violating the required-tags
//! rule to the compliance recipient and to each owning team.

use std::sync::Arc;

use anyhow::Context;
use aws_config::BehaviorVersion;
use chrono::Utc;
use finwatch_clients::{ConfigServiceCompliance, S3ObjectStore, SesNotifier};
use finwatch_core::{InvocationResponse, TagComplianceConfig, TagComplianceDigester, logging};
use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init();

    let config = TagComplianceConfig::from_env()
        .inspect_err(|e| error!(error = %e, "Invalid tag compliance configuration"))
        .context("failed to load tag compliance configuration")?;
    info!(
        required_tags = ?config.required_tags,
        rule = %config.config_rule_name,
        grace_period_days = config.grace_period_days,
        dry_run = config.dry_run,
        "Starting tag compliance function"
    );

    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let digester = Arc::new(TagComplianceDigester::new(
        Arc::new(ConfigServiceCompliance::new(&sdk_config)),
        Arc::new(S3ObjectStore::new(&sdk_config)),
        Arc::new(SesNotifier::new(&sdk_config)),
        config,
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let digester = Arc::clone(&digester);
        async move { handle(&digester, event).await }
    }))
    .await
}

async fn handle(
    digester: &TagComplianceDigester,
    event: LambdaEvent<Value>,
) -> Result<InvocationResponse, Error> {
    info!(request_id = %event.context.request_id, "Tag compliance check invoked");
    Ok(digester.run(Utc::now()).await)
}
