//! Digest text rendering.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::classify::{ClassifiedResource, ComplianceReport};
use super::policy::TeamConfig;
use crate::config::TagComplianceConfig;

/// Subject of the error notification.
pub const ERROR_SUBJECT: &str = "❌ Tag Compliance Check Failed";

/// Renders compliance digests as plain text.
#[derive(Debug, Clone)]
pub struct DigestRenderer {
    required_tags: Vec<String>,
    grace_period_days: u32,
    policy_document: String,
    documentation_url: Option<String>,
    contact_email: String,
    generated_at: DateTime<Utc>,
}

impl DigestRenderer {
    /// Creates a renderer for a run started at `generated_at`.
    pub fn new(config: &TagComplianceConfig, generated_at: DateTime<Utc>) -> Self {
        Self {
            required_tags: config.required_tags.clone(),
            grace_period_days: config.grace_period_days,
            policy_document: config.team_config_key.clone(),
            documentation_url: config.documentation_url().map(str::to_string),
            contact_email: config.compliance_email.clone(),
            generated_at,
        }
    }

    /// Subject of the aggregate digest.
    pub fn digest_subject(&self) -> String {
        format!("🏷️ Daily Tag Compliance Digest - {}", self.generated_at.format("%Y-%m-%d"))
    }

    /// Subject of a team digest.
    pub fn team_subject(&self, team_id: &str) -> String {
        format!(
            "🏷️ Tag Compliance Alert for {} - {}",
            team_id,
            self.generated_at.format("%Y-%m-%d")
        )
    }

    /// Renders the aggregate digest sent to the compliance recipient.
    pub fn render_digest(&self, report: &ComplianceReport) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("Daily Tag Compliance Report\n");
        let _ = writeln!(output, "Generated: {}", self.timestamp());
        output.push('\n');

        output.push_str("Summary:\n");
        let _ = writeln!(output, "- Total Non-Compliant Resources: {}", report.total());
        let _ = writeln!(output, "- Missing Tags: {} resources", report.missing_tags.len());
        let _ = writeln!(output, "- Invalid Values: {} resources", report.invalid_values.len());
        output.push('\n');
        let _ = writeln!(output, "Required Tags: {}", self.required_tags.join(", "));
        let _ = writeln!(output, "Grace Period: {} days", self.grace_period_days);
        output.push('\n');
        output.push_str(&separator());
        output.push('\n');

        output.push_str("🚨 MISSING TAGS (Highest Severity)\n");
        let missing = by_resource_type(&report.missing_tags);
        if missing.is_empty() {
            output.push_str("\nNo resources with missing tags ✅\n");
        }
        for (resource_type, resources) in &missing {
            let _ = writeln!(output, "\n{} ({} resources):", resource_type, resources.len());
            for resource in resources {
                let _ = writeln!(output, "  • {}", resource.resource.resource_id);
                let _ = writeln!(output, "    Missing: {}", resource.missing_tags.join(", "));
                if !resource.invalid_tags.is_empty() {
                    let _ = writeln!(output, "    Invalid: {} values", resource.invalid_tags.len());
                }
                let _ = writeln!(output, "    Team: {}", resource.team());
            }
        }

        output.push('\n');
        output.push_str(&separator());
        output.push('\n');

        output.push_str("⚠️  INVALID TAG VALUES\n");
        let invalid = by_resource_type(&report.invalid_values);
        if invalid.is_empty() {
            output.push_str("\nNo resources with invalid values ✅\n");
        }
        for (resource_type, resources) in &invalid {
            let _ = writeln!(output, "\n{} ({} resources):", resource_type, resources.len());
            for resource in resources {
                let _ = writeln!(output, "  • {}", resource.resource.resource_id);
                for tag in &resource.invalid_tags {
                    let _ = writeln!(
                        output,
                        "    {}: '{}' (allowed: {})",
                        tag.key,
                        tag.value,
                        tag.allowed.join(", ")
                    );
                }
                let _ = writeln!(output, "    Team: {}", resource.team());
            }
        }

        output.push('\n');
        output.push_str(&separator());
        output.push('\n');

        output.push_str("Remediation Instructions:\n");
        output.push_str("1. Use merge() in Terraform to combine governance and custom tags\n");
        output.push_str("2. Start from the required-tags module for baseline tags\n");
        let _ = writeln!(output, "3. See {} for allowed tag values", self.policy_document);
        output.push_str("4. Update tags via Terraform (not the console) to prevent drift\n");
        self.push_footer(&mut output, "Questions? Contact:");

        output
    }

    /// Renders the digest for one team, listing only that team's resources.
    pub fn render_team_digest(
        &self,
        team_id: &str,
        resources: &[ClassifiedResource],
        policy: &TeamConfig,
    ) -> String {
        let description = policy.teams.get(team_id).map(|t| t.description()).unwrap_or_default();
        let mut output = String::new();

        output.push('\n');
        let _ = writeln!(output, "Tag Compliance Alert for Team: {}", team_id);
        let _ = writeln!(output, "{}", description);
        output.push('\n');
        let _ = writeln!(output, "Generated: {}", self.timestamp());
        output.push('\n');
        let _ = writeln!(
            output,
            "Your team has {} non-compliant resources that need attention.",
            resources.len()
        );
        output.push('\n');
        let _ = writeln!(output, "Required Tags: {}", self.required_tags.join(", "));
        let _ = writeln!(
            output,
            "Grace Period: {} days (resources older than this are included)",
            self.grace_period_days
        );
        output.push('\n');
        output.push_str(&separator());
        output.push('\n');

        output.push_str("YOUR NON-COMPLIANT RESOURCES:\n");
        for (resource_type, group) in &by_resource_type(resources) {
            let _ = writeln!(output, "\n{} ({}):", resource_type, group.len());
            for resource in group {
                let _ = writeln!(output, "  • {}", resource.resource.resource_id);
                if !resource.missing_tags.is_empty() {
                    let _ = writeln!(output, "    ❌ Missing: {}", resource.missing_tags.join(", "));
                }
                for tag in &resource.invalid_tags {
                    let _ = writeln!(
                        output,
                        "    ⚠️  {}: '{}' → allowed: {}",
                        tag.key,
                        tag.value,
                        tag.allowed.join(", ")
                    );
                }
            }
        }

        output.push('\n');
        output.push_str(&separator());
        output.push('\n');

        output.push_str("How to Fix:\n\n");
        output.push_str("1. In your Terraform code, use the required-tags module:\n\n");
        output.push_str("   module \"required_tags\" {\n");
        output.push_str("     source = \"../../modules/required-tags\"\n\n");
        output.push_str("     environment = \"production\"\n");
        let _ = writeln!(output, "     team        = \"{}\"", team_id);
        output.push_str("     costcenter  = \"YOUR_COSTCENTER\"\n");
        output.push_str("   }\n\n");
        output.push_str("2. Apply tags using merge():\n\n");
        output.push_str("   tags = merge(\n");
        output.push_str("     module.required_tags.baseline_tags,\n");
        output.push_str("     { custom_tag = \"custom_value\" }\n");
        output.push_str("   )\n\n");
        output.push_str("3. Run terraform plan and apply to update tags\n");
        self.push_footer(&mut output, "Need help? Contact");

        output
    }

    /// Renders the body of the error notification.
    pub fn render_error(&self, error_message: &str) -> String {
        let mut output = String::new();
        output.push('\n');
        output.push_str("The daily tag compliance check encountered an error:\n\n");
        let _ = writeln!(output, "Error: {}", error_message);
        output.push('\n');
        let _ = writeln!(output, "Time: {}", self.timestamp());
        output.push('\n');
        output.push_str("Please investigate the function logs.\n");
        output
    }

    fn push_footer(&self, output: &mut String, contact_label: &str) {
        if let Some(url) = &self.documentation_url {
            let _ = write!(output, "\nDocumentation:\n{}\n", url);
        }
        let _ = writeln!(output, "\n{} {}", contact_label, self.contact_email);
    }

    fn timestamp(&self) -> String {
        self.generated_at.format("%Y-%m-%d %H:%M UTC").to_string()
    }
}

fn separator() -> String {
    "━".repeat(60)
}

/// Groups resources by type; the map orders types alphabetically.
fn by_resource_type(resources: &[ClassifiedResource]) -> BTreeMap<&str, Vec<&ClassifiedResource>> {
    let mut groups: BTreeMap<&str, Vec<&ClassifiedResource>> = BTreeMap::new();
    for resource in resources {
        groups.entry(resource.resource.resource_type.as_str()).or_default().push(resource);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::classify::classify;
    use crate::compliance::violations::ResourceRecord;
    use config::Map;

    fn config() -> TagComplianceConfig {
        let vars: Map<String, String> = [
            ("TEAM_CONFIG_BUCKET", "governance"),
            ("REQUIRED_TAGS", "team,env"),
            ("COMPLIANCE_EMAIL", "audit@example.com"),
            ("DOCUMENTATION_URL", "https://wiki.example.com/tagging"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        TagComplianceConfig::from_vars(vars).unwrap()
    }

    fn policy() -> TeamConfig {
        TeamConfig::from_yaml(
            "teams:\n  data:\n    email: data@example.com\n    description: Data Platform\nallowed_values:\n  env: [prod, staging]\n",
        )
        .unwrap()
    }

    fn renderer() -> DigestRenderer {
        let at = DateTime::parse_from_rfc3339("2024-06-15T02:00:00Z").unwrap().with_timezone(&Utc);
        DigestRenderer::new(&config(), at)
    }

    fn report() -> ComplianceReport {
        let records = vec![
            ResourceRecord::new("AWS::S3::Bucket", "logs"),
            ResourceRecord::new("AWS::EC2::Instance", "i-123").with_tag("env", "prod"),
            ResourceRecord::new("AWS::S3::Bucket", "lake").with_tag("team", "data").with_tag("env", "qa"),
        ];
        classify(&records, &["team".to_string(), "env".to_string()], &policy())
    }

    #[test]
    fn test_subjects_carry_date() {
        let renderer = renderer();
        assert_eq!(renderer.digest_subject(), "🏷️ Daily Tag Compliance Digest - 2024-06-15");
        assert_eq!(renderer.team_subject("data"), "🏷️ Tag Compliance Alert for data - 2024-06-15");
    }

    #[test]
    fn test_digest_summary_counts() {
        let output = renderer().render_digest(&report());
        assert!(output.contains("Generated: 2024-06-15 02:00 UTC"));
        assert!(output.contains("- Total Non-Compliant Resources: 3"));
        assert!(output.contains("- Missing Tags: 2 resources"));
        assert!(output.contains("- Invalid Values: 1 resources"));
        assert!(output.contains("Required Tags: team, env"));
        assert!(output.contains("Grace Period: 14 days"));
    }

    #[test]
    fn test_digest_groups_types_alphabetically() {
        let output = renderer().render_digest(&report());
        let ec2 = output.find("AWS::EC2::Instance (1 resources):").unwrap();
        let s3 = output.find("AWS::S3::Bucket (1 resources):").unwrap();
        assert!(ec2 < s3);
        assert!(output.contains("  • logs\n    Missing: team, env\n    Team: unknown\n"));
        assert!(output.contains("    env: 'qa' (allowed: prod, staging)\n    Team: data\n"));
    }

    #[test]
    fn test_digest_empty_sections() {
        let output = renderer().render_digest(&ComplianceReport::default());
        assert!(output.contains("No resources with missing tags ✅"));
        assert!(output.contains("No resources with invalid values ✅"));
    }

    #[test]
    fn test_digest_footer() {
        let output = renderer().render_digest(&report());
        assert!(output.contains("See approved-tags.yaml for allowed tag values"));
        assert!(output.contains("Documentation:\nhttps://wiki.example.com/tagging"));
        assert!(output.contains("Questions? Contact: audit@example.com"));
    }

    #[test]
    fn test_team_digest_lists_only_given_resources() {
        let report = report();
        let data: Vec<_> = report.iter().filter(|r| r.team() == "data").cloned().collect();
        let output = renderer().render_team_digest("data", &data, &policy());

        assert!(output.contains("Tag Compliance Alert for Team: data\nData Platform\n"));
        assert!(output.contains("Your team has 1 non-compliant resources"));
        assert!(output.contains("AWS::S3::Bucket (1):\n  • lake\n"));
        assert!(output.contains("⚠️  env: 'qa' → allowed: prod, staging"));
        assert!(output.contains("team        = \"data\""));
        assert!(!output.contains("logs"));
    }

    #[test]
    fn test_team_digest_missing_line() {
        let report = report();
        let output = renderer().render_team_digest("unknown", &report.missing_tags, &policy());
        assert!(output.contains("❌ Missing: team, env"));
        assert!(output.contains("❌ Missing: team\n"));
    }

    #[test]
    fn test_error_body() {
        let output = renderer().render_error("Upstream query error: config request failed");
        assert!(output.contains("Error: Upstream query error: config request failed"));
        assert!(output.contains("Time: 2024-06-15 02:00 UTC"));
    }
}
