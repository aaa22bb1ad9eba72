//! Configuration module for finwatch Core.
//!
//! Both functions are configured purely through environment variables. Each
//! variable maps to the lower-cased field of the matching struct, e.g.
//! `ANOMALY_THRESHOLD` -> [`CostAnomalyConfig::anomaly_threshold`].

use config::{Environment, Map};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};

use crate::error::{FinwatchError, Result};

/// Largest page the compliance API accepts.
pub const MAX_PAGE_SIZE: i32 = 100;

/// Cost anomaly checker configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CostAnomalyConfig {
    /// Address that receives the anomaly alert.
    pub alert_email: String,
    /// Sender address; defaults to `alert_email`.
    #[serde(default)]
    pub alert_sender: Option<String>,
    /// Ratio over the baseline that counts as an anomaly.
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,
    /// Number of trailing days fetched, including the latest one.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

fn default_anomaly_threshold() -> f64 {
    1.2
}

fn default_lookback_days() -> u32 {
    7
}

impl CostAnomalyConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `ALERT_EMAIL` is missing or a value is invalid.
    pub fn from_env() -> Result<Self> {
        load(Environment::default())
    }

    /// Load configuration from an explicit variable map instead of the process environment.
    pub fn from_vars(vars: Map<String, String>) -> Result<Self> {
        load(Environment::default().source(Some(vars)))
    }

    /// The address alerts are sent from.
    pub fn sender(&self) -> &str {
        self.alert_sender.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(&self.alert_email)
    }
}

/// Tag compliance digester configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TagComplianceConfig {
    /// Tag keys every resource must carry. Accepts a JSON array or a comma-separated list.
    #[serde(default, deserialize_with = "deserialize_tag_list")]
    pub required_tags: Vec<String>,
    /// Recipient of the aggregate digest and error notifications.
    #[serde(default = "default_compliance_email")]
    pub compliance_email: String,
    /// Sender address; defaults to `compliance_email`.
    #[serde(default)]
    pub sender_email: Option<String>,
    /// Bucket holding the policy document.
    pub team_config_bucket: String,
    /// Key of the policy document.
    #[serde(default = "default_team_config_key")]
    pub team_config_key: String,
    /// Days after creation during which violations are not reported.
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: u32,
    /// Log emails instead of sending them.
    #[serde(default = "default_true")]
    pub dry_run: bool,
    /// Compliance rule queried for violations.
    #[serde(default = "default_config_rule_name")]
    pub config_rule_name: String,
    /// Evaluations requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: i32,
    /// Link included in remediation guidance.
    #[serde(default)]
    pub documentation_url: Option<String>,
}

fn default_compliance_email() -> String {
    "compliance@kuduworks.net".to_string()
}

fn default_team_config_key() -> String {
    "approved-tags.yaml".to_string()
}

fn default_grace_period_days() -> u32 {
    14
}

fn default_true() -> bool {
    true
}

fn default_config_rule_name() -> String {
    "required-tags-check".to_string()
}

fn default_page_size() -> i32 {
    MAX_PAGE_SIZE
}

impl TagComplianceConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `TEAM_CONFIG_BUCKET` is missing or a value is invalid.
    pub fn from_env() -> Result<Self> {
        load(Environment::default())
    }

    /// Load configuration from an explicit variable map instead of the process environment.
    pub fn from_vars(vars: Map<String, String>) -> Result<Self> {
        load(Environment::default().source(Some(vars)))
    }

    /// The address digests are sent from.
    pub fn sender(&self) -> &str {
        self.sender_email
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.compliance_email)
    }

    /// Documentation link, if one is configured.
    pub fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref().filter(|s| !s.trim().is_empty())
    }
}

trait Validate: Sized {
    fn validate(self) -> Result<Self>;
}

impl Validate for CostAnomalyConfig {
    fn validate(self) -> Result<Self> {
        if self.alert_email.trim().is_empty() {
            return Err(FinwatchError::Config("ALERT_EMAIL must not be empty".to_string()));
        }
        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold <= 0.0 {
            return Err(FinwatchError::Config(format!(
                "ANOMALY_THRESHOLD must be a positive number, got {}",
                self.anomaly_threshold
            )));
        }
        if self.lookback_days < 2 {
            return Err(FinwatchError::Config(format!(
                "LOOKBACK_DAYS must be at least 2, got {}",
                self.lookback_days
            )));
        }
        Ok(self)
    }
}

impl Validate for TagComplianceConfig {
    fn validate(self) -> Result<Self> {
        if self.team_config_bucket.trim().is_empty() {
            return Err(FinwatchError::Config("TEAM_CONFIG_BUCKET must not be empty".to_string()));
        }
        if self.compliance_email.trim().is_empty() {
            return Err(FinwatchError::Config("COMPLIANCE_EMAIL must not be empty".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(FinwatchError::Config(format!(
                "PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(self)
    }
}

fn load<T: DeserializeOwned + Validate>(environment: Environment) -> Result<T> {
    let settings = config::Config::builder().add_source(environment).build()?;
    settings.try_deserialize::<T>()?.validate()
}

fn deserialize_tag_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_tag_list(&raw).map_err(D::Error::custom)
}

/// Parses a tag key list given either as a JSON array (`["team","env"]`) or
/// as a comma-separated list (`team, env`).
pub fn parse_tag_list(raw: &str) -> std::result::Result<Vec<String>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let tags: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str(raw).map_err(|e| format!("invalid REQUIRED_TAGS list: {e}"))?
    } else {
        raw.split(',').map(str::to_string).collect()
    };

    Ok(tags.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect())
}
