//! Tag compliance pipeline: policy, violations, digests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use finwatch_abstraction::{ComplianceSource, Notifier, ObjectStore};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::classify::{classify, group_by_team};
use super::digest::{DigestRenderer, ERROR_SUBJECT};
use super::policy::{self, TeamConfig};
use super::violations::{self, ResourceRecord, apply_grace_period};
use crate::config::TagComplianceConfig;
use crate::error::Result;
use crate::notify::Mailer;
use crate::response::InvocationResponse;

/// Body returned when no resource violates the policy.
pub const ALL_COMPLIANT: &str = "All resources compliant - no action needed";

/// Result of a successful run that found violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSummary {
    /// Resources reported after the grace period filter.
    pub total_non_compliant: usize,
    /// Team digests dispatched, or logged in dry run.
    pub teams_notified: usize,
    /// Whether the aggregate digest went out.
    pub compliance_email_sent: bool,
    /// Team ids with violations but no entry in the policy.
    pub unknown_teams: Vec<String>,
}

/// Outcome of [`TagComplianceDigester::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    /// Nothing to report; no email was sent.
    NoViolations,
    /// Digests were sent.
    Sent(DigestSummary),
}

/// Runs the daily tag compliance digest.
pub struct TagComplianceDigester {
    compliance: Arc<dyn ComplianceSource>,
    policy_store: Arc<dyn ObjectStore>,
    mailer: Mailer,
    config: TagComplianceConfig,
}

impl TagComplianceDigester {
    pub fn new(
        compliance: Arc<dyn ComplianceSource>,
        policy_store: Arc<dyn ObjectStore>,
        notifier: Arc<dyn Notifier>,
        config: TagComplianceConfig,
    ) -> Self {
        let mailer = Mailer::new(notifier, config.sender()).with_dry_run(config.dry_run);
        Self { compliance, policy_store, mailer, config }
    }

    pub const fn config(&self) -> &TagComplianceConfig {
        &self.config
    }

    /// Loads the policy document named by the configuration.
    pub async fn load_policy(&self) -> Result<TeamConfig> {
        policy::load_policy(
            self.policy_store.as_ref(),
            &self.config.team_config_bucket,
            &self.config.team_config_key,
        )
        .await
    }

    /// Fetches non-compliant resources and drops those inside the grace period.
    pub async fn fetch_violations(&self, now: DateTime<Utc>) -> Result<Vec<ResourceRecord>> {
        let records = violations::fetch_violations(
            self.compliance.as_ref(),
            &self.config.config_rule_name,
            self.config.page_size,
            now,
        )
        .await?;
        let fetched = records.len();
        let records = apply_grace_period(records, self.config.grace_period_days, now);
        info!(
            fetched,
            reported = records.len(),
            grace_period_days = self.config.grace_period_days,
            "Applied grace period"
        );
        Ok(records)
    }

    /// Runs the whole pipeline.
    ///
    /// Only a failed aggregate digest fails the run; a failed team digest is logged
    /// and the remaining teams are still notified.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<DigestOutcome> {
        let policy = self.load_policy().await?;
        let records = self.fetch_violations(now).await?;
        if records.is_empty() {
            info!("All resources compliant");
            return Ok(DigestOutcome::NoViolations);
        }

        let report = classify(&records, &self.config.required_tags, &policy);
        let teams = group_by_team(&report);
        info!(
            missing_tags = report.missing_tags.len(),
            invalid_values = report.invalid_values.len(),
            teams = teams.len(),
            "Classified non-compliant resources"
        );

        let renderer = DigestRenderer::new(&self.config, now);
        self.mailer
            .send(
                &self.config.compliance_email,
                &renderer.digest_subject(),
                &renderer.render_digest(&report),
            )
            .await?;

        let mut teams_notified = 0;
        let mut unknown_teams = Vec::new();
        for (team_id, resources) in &teams {
            let Some(team) = policy.teams.get(team_id) else {
                warn!(team = %team_id, resources = resources.len(), "Unknown team; reported in digest only");
                unknown_teams.push(team_id.clone());
                continue;
            };
            let Some(email) = team.email() else {
                warn!(team = %team_id, "No email configured for team; skipping team digest");
                continue;
            };

            let body = renderer.render_team_digest(team_id, resources, &policy);
            match self.mailer.send(email, &renderer.team_subject(team_id), &body).await {
                Ok(_) => teams_notified += 1,
                Err(e) => {
                    error!(team = %team_id, recipient = email, error = %e, "Failed to send team digest");
                }
            }
        }

        let summary = DigestSummary {
            total_non_compliant: report.total(),
            teams_notified,
            compliance_email_sent: true,
            unknown_teams,
        };
        info!(
            total_non_compliant = summary.total_non_compliant,
            teams_notified = summary.teams_notified,
            dry_run = self.mailer.is_dry_run(),
            "Tag compliance digest complete"
        );
        Ok(DigestOutcome::Sent(summary))
    }

    /// Entry point: runs [`execute`](Self::execute) and converts the outcome into a response.
    ///
    /// On failure an error notification is attempted before returning a 500.
    pub async fn run(&self, now: DateTime<Utc>) -> InvocationResponse {
        match self.execute(now).await {
            Ok(DigestOutcome::NoViolations) => InvocationResponse::ok(&ALL_COMPLIANT),
            Ok(DigestOutcome::Sent(summary)) => InvocationResponse::ok(&summary),
            Err(e) => {
                error!(error = %e, "Tag compliance check failed");
                let message = e.to_string();
                let renderer = DigestRenderer::new(&self.config, now);
                if let Err(notify_error) = self
                    .mailer
                    .send(&self.config.compliance_email, ERROR_SUBJECT, &renderer.render_error(&message))
                    .await
                {
                    error!(error = %notify_error, "Failed to send error notification");
                }
                InvocationResponse::error(&format!("Error during compliance check: {message}"))
            }
        }
    }
}
