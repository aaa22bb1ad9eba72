//! AWS Config compliance source.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_config::primitives::DateTime as SmithyDateTime;
use aws_sdk_config::types::{
    ChronologicalOrder, ComplianceType, ConfigurationItem, EvaluationResult, ResourceType,
};
use chrono::{DateTime, Utc};
use finwatch_abstraction::{
    ComplianceSource, ConfigurationSnapshot, Evaluation, EvaluationPage, UpstreamError,
};

use super::describe_sdk_error;

const SERVICE: &str = "config";

/// Non-compliant evaluations and configuration history from AWS Config.
#[derive(Debug, Clone)]
pub struct ConfigServiceCompliance {
    client: aws_sdk_config::Client,
}

impl ConfigServiceCompliance {
    /// Creates a compliance source from a loaded SDK configuration.
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self { client: aws_sdk_config::Client::new(sdk_config) }
    }

    /// Wraps an existing AWS Config client.
    #[must_use]
    pub const fn from_client(client: aws_sdk_config::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ComplianceSource for ConfigServiceCompliance {
    async fn non_compliant_page(
        &self,
        rule_name: &str,
        page_size: i32,
        next_token: Option<String>,
    ) -> Result<EvaluationPage, UpstreamError> {
        let response = self
            .client
            .get_compliance_details_by_config_rule()
            .config_rule_name(rule_name)
            .compliance_types(ComplianceType::NonCompliant)
            .limit(page_size)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| UpstreamError::unreachable(SERVICE, describe_sdk_error(&e)))?;

        Ok(EvaluationPage {
            evaluations: response.evaluation_results().iter().map(to_evaluation).collect(),
            next_token: response.next_token().map(str::to_string),
        })
    }

    async fn latest_configuration(
        &self,
        resource_type: &str,
        resource_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ConfigurationSnapshot, UpstreamError> {
        let response = self
            .client
            .get_resource_config_history()
            .resource_type(ResourceType::from(resource_type))
            .resource_id(resource_id)
            .limit(1)
            .later_time(SmithyDateTime::from_secs(at.timestamp()))
            .chronological_order(ChronologicalOrder::Reverse)
            .send()
            .await
            .map_err(|e| UpstreamError::unreachable(SERVICE, describe_sdk_error(&e)))?;

        let item = response.configuration_items().first().ok_or_else(|| {
            UpstreamError::malformed(
                SERVICE,
                format!("no configuration items for {resource_type}/{resource_id}"),
            )
        })?;

        Ok(to_snapshot(item))
    }
}

fn to_evaluation(result: &EvaluationResult) -> Evaluation {
    let qualifier = result
        .evaluation_result_identifier()
        .and_then(|identifier| identifier.evaluation_result_qualifier());

    Evaluation {
        resource_type: qualifier.and_then(|q| q.resource_type()).map(str::to_string),
        resource_id: qualifier.and_then(|q| q.resource_id()).map(str::to_string),
        compliance_type: result.compliance_type().map(|c| c.as_str().to_string()),
    }
}

fn to_snapshot(item: &ConfigurationItem) -> ConfigurationSnapshot {
    let creation_time = item
        .resource_creation_time()
        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()));

    let tags = item
        .tags()
        .map(|tags| tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_else(BTreeMap::new);

    ConfigurationSnapshot { creation_time, tags }
}
