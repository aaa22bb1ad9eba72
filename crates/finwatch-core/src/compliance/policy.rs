//! Tagging policy document: team contacts and allowed tag values.

use std::collections::BTreeMap;

use finwatch_abstraction::ObjectStore;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::{FinwatchError, Result};

/// Contact details for a team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    /// Address receiving the team digest.
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form description shown in the team digest.
    #[serde(default)]
    pub description: Option<String>,
}

impl TeamInfo {
    /// The team address, if a non-blank one is configured.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    /// The description, or an empty string.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// Parsed policy document.
///
/// ```yaml
/// teams:
///   platform:
///     email: platform@example.com
///     description: Platform Engineering
/// allowed_values:
///   env: [prod, staging, dev]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Known teams by id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub teams: BTreeMap<String, TeamInfo>,
    /// Allowed values per tag key, in document order. An empty list allows anything.
    #[serde(default, deserialize_with = "deserialize_allowed_values")]
    pub allowed_values: BTreeMap<String, Vec<String>>,
}

impl TeamConfig {
    /// Parses a YAML policy document. An empty document yields an empty policy.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
            .map_err(|e| FinwatchError::ConfigLoad(format!("invalid policy document: {e}")))
    }

    /// Whether `team_id` is listed in the policy.
    pub fn is_known_team(&self, team_id: &str) -> bool {
        self.teams.contains_key(team_id)
    }

    /// Allowed values for a tag key; empty when the key is unrestricted.
    pub fn allowed_for(&self, tag_key: &str) -> &[String] {
        self.allowed_values.get(tag_key).map_or(&[], Vec::as_slice)
    }
}

/// Reads and parses the policy document at `bucket`/`key`.
///
/// Any failure is a [`FinwatchError::ConfigLoad`]: no digest can be produced without a policy.
pub async fn load_policy(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<TeamConfig> {
    let bytes = store.get_object(bucket, key).await.map_err(|e| {
        FinwatchError::ConfigLoad(format!("failed to load team config from s3://{bucket}/{key}: {e}"))
    })?;
    let text = String::from_utf8(bytes).map_err(|e| {
        FinwatchError::ConfigLoad(format!("team config s3://{bucket}/{key} is not UTF-8: {e}"))
    })?;

    let policy = TeamConfig::from_yaml(&text)?;
    info!(
        bucket,
        key,
        teams = policy.teams.len(),
        restricted_tags = policy.allowed_values.len(),
        "Loaded team configuration"
    );
    Ok(policy)
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_allowed_values<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let raw: Option<BTreeMap<String, Option<Vec<Value>>>> = Option::deserialize(deserializer)?;
    let mut allowed = BTreeMap::new();
    for (key, values) in raw.unwrap_or_default() {
        let values = values
            .unwrap_or_default()
            .into_iter()
            .map(|value| match value {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(D::Error::custom(format!(
                    "allowed value for '{key}' must be a scalar, got {other:?}"
                ))),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        allowed.insert(key, values);
    }
    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use finwatch_clients::InMemoryObjectStore;

    const POLICY: &str = r"
teams:
  platform:
    email: platform@example.com
    description: Platform Engineering
  data:
    email: data@example.com
  sandbox:
    description: No inbox
allowed_values:
  env: [prod, staging, dev]
  costcenter: [1001, 1002]
  owner: []
";

    #[test]
    fn test_parse_policy() {
        let policy = TeamConfig::from_yaml(POLICY).unwrap();
        assert_eq!(policy.teams.len(), 3);
        assert_eq!(policy.teams["platform"].email(), Some("platform@example.com"));
        assert_eq!(policy.teams["platform"].description(), "Platform Engineering");
        assert_eq!(policy.teams["data"].description(), "");
        assert_eq!(policy.teams["sandbox"].email(), None);
        assert_eq!(policy.allowed_for("env"), ["prod", "staging", "dev"]);
        assert_eq!(policy.allowed_for("costcenter"), ["1001", "1002"]);
        assert!(policy.allowed_for("owner").is_empty());
        assert!(policy.allowed_for("team").is_empty());
        assert!(policy.is_known_team("data"));
        assert!(!policy.is_known_team("unknown"));
    }

    #[test]
    fn test_parse_empty_and_null_sections() {
        assert_eq!(TeamConfig::from_yaml("").unwrap(), TeamConfig::default());
        let policy = TeamConfig::from_yaml("teams:\nallowed_values:\n").unwrap();
        assert!(policy.teams.is_empty());
        assert!(policy.allowed_values.is_empty());
    }

    #[test]
    fn test_parse_malformed_policy() {
        let err = TeamConfig::from_yaml("teams: [unterminated").unwrap_err();
        assert!(matches!(err, FinwatchError::ConfigLoad(_)));

        let err = TeamConfig::from_yaml("allowed_values:\n  env: [{nested: map}]\n").unwrap_err();
        assert!(err.to_string().contains("env"));
    }

    #[tokio::test]
    async fn test_load_policy_from_store() {
        let store = InMemoryObjectStore::new().with_object("governance", "approved-tags.yaml", POLICY);
        let policy = load_policy(&store, "governance", "approved-tags.yaml").await.unwrap();
        assert_eq!(policy.teams.len(), 3);
    }

    #[tokio::test]
    async fn test_load_policy_missing_document() {
        let store = InMemoryObjectStore::new();
        let err = load_policy(&store, "governance", "approved-tags.yaml").await.unwrap_err();
        assert!(matches!(err, FinwatchError::ConfigLoad(_)));
        assert!(err.to_string().contains("s3://governance/approved-tags.yaml"));
    }

    #[tokio::test]
    async fn test_load_policy_rejects_non_utf8() {
        let store = InMemoryObjectStore::new().with_object("b", "k", vec![0xff, 0xfe, 0x00]);
        let err = load_policy(&store, "b", "k").await.unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }
}
