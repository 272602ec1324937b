use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::automation::{ApplyMode, AutomationPolicy, RetryPolicy, RunPolicy, SyncPolicy};
use crate::http::RateLimits;
use crate::workspace::{Variable, VariableCategory, WorkspaceRef};

/// Main configuration structure for workspace-autopilot
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AutopilotConfig {
    pub workspace: WorkspaceConfig,
    pub sync: SyncConfig,
    pub run: RunConfig,
    pub http: HttpConfig,
    pub observability: ObservabilityConfig,
    /// Desired workspace variables
    pub variables: Vec<VariableConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Service API root, e.g. https://app.terraform.io/api/v2
    pub base_url: String,
    pub organization: String,
    pub workspace_id: Option<String>,
    /// Resolved to an id through the organization's workspace listing
    pub workspace_name: Option<String>,
    /// API token (can be set via env var)
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.terraform.io/api/v2".to_string(),
            organization: String::new(),
            workspace_id: None,
            workspace_name: None,
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    pub create_attempts: u32,
    pub create_retry_delay_secs: u64,
    pub deletion_checks: u32,
    pub deletion_check_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            create_attempts: 3,
            create_retry_delay_secs: 2,
            deletion_checks: 5,
            deletion_check_interval_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub auto_apply: bool,
    pub plan_poll_interval_secs: u64,
    pub apply_poll_interval_secs: u64,
    pub timeout_secs: u64,
    /// Extra attempts for a failed status fetch; 0 makes any failure fatal
    pub status_fetch_retries: u32,
    pub message: Option<String>,
    pub apply_comment: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            auto_apply: false,
            plan_poll_interval_secs: 10,
            apply_poll_interval_secs: 5,
            timeout_secs: 120,
            status_fetch_retries: 0,
            message: Some("Triggered via workspace-autopilot".to_string()),
            apply_comment: Some("Applied via API".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub requests_per_second: u32,
    pub burst: u32,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            burst: 10,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// A desired variable. The value is given literally or read from the named
/// environment variable so credentials need not live in config files.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VariableConfig {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_env: Option<String>,
    #[serde(default = "default_category")]
    pub category: VariableCategory,
    #[serde(default)]
    pub sensitive: bool,
}

fn default_category() -> VariableCategory {
    VariableCategory::Terraform
}

impl VariableConfig {
    pub fn resolve(&self) -> Result<Variable> {
        let value = match (&self.value, &self.value_env) {
            (Some(value), None) => value.clone(),
            (None, Some(name)) => std::env::var(name).with_context(|| {
                format!("variable '{}' reads ${name}, which is not set", self.key)
            })?,
            (Some(_), Some(_)) => {
                return Err(anyhow!(
                    "variable '{}' sets both value and value_env",
                    self.key
                ))
            }
            (None, None) => return Err(anyhow!("variable '{}' has no value", self.key)),
        };
        Ok(Variable::new(&self.key, &value, self.category, self.sensitive))
    }
}

impl AutopilotConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. autopilot.toml in the working directory, if present
    /// 3. An explicit configuration file
    /// 4. Environment variables (AUTOPILOT_SECTION__FIELD)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("autopilot").required(false));

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(anyhow!("configuration file {} not found", path.display()));
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("AUTOPILOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("failed to read configuration")?;
        let mut autopilot_config: AutopilotConfig = config
            .try_deserialize()
            .context("invalid configuration")?;

        // Special handling for the API token - check multiple sources
        if autopilot_config.workspace.token.is_none() {
            if let Ok(token) = std::env::var("AUTOPILOT_TOKEN") {
                autopilot_config.workspace.token = Some(token);
            } else if let Ok(token) = std::env::var("TFE_TOKEN") {
                autopilot_config.workspace.token = Some(token);
            }
        }

        Ok(autopilot_config)
    }

    /// Save configuration to file (the token is never written)
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn token(&self) -> Result<&str> {
        self.workspace.token.as_deref().ok_or_else(|| {
            anyhow!("no API token configured; set AUTOPILOT_TOKEN or TFE_TOKEN")
        })
    }

    /// Workspace reference for a configured id; names must be resolved first
    pub fn workspace_ref(&self, workspace_id: &str) -> WorkspaceRef {
        WorkspaceRef::new(
            &self.workspace.organization,
            workspace_id,
            &self.workspace.base_url,
        )
    }

    pub fn desired_variables(&self) -> Result<Vec<Variable>> {
        self.variables.iter().map(VariableConfig::resolve).collect()
    }

    pub fn rate_limits(&self) -> RateLimits {
        RateLimits {
            requests_per_second: self.http.requests_per_second,
            burst: self.http.burst,
            request_timeout: Duration::from_secs(self.http.request_timeout_secs),
        }
    }

    pub fn automation_policy(&self) -> AutomationPolicy {
        AutomationPolicy {
            sync: SyncPolicy {
                create_retry: RetryPolicy::new(
                    self.sync.create_attempts,
                    Duration::from_secs(self.sync.create_retry_delay_secs),
                ),
                deletion_checks: self.sync.deletion_checks,
                deletion_check_interval: Duration::from_secs(
                    self.sync.deletion_check_interval_secs,
                ),
            },
            run: RunPolicy {
                mode: if self.run.auto_apply {
                    ApplyMode::Auto
                } else {
                    ApplyMode::Manual
                },
                plan_poll_interval: Duration::from_secs(self.run.plan_poll_interval_secs),
                apply_poll_interval: Duration::from_secs(self.run.apply_poll_interval_secs),
                timeout: Duration::from_secs(self.run.timeout_secs),
                status_retry: match self.run.status_fetch_retries {
                    0 => RetryPolicy::none(),
                    retries => RetryPolicy::new(
                        retries.saturating_add(1),
                        Duration::from_secs(self.run.apply_poll_interval_secs),
                    ),
                },
                message: self.run.message.clone(),
                apply_comment: self.run.apply_comment.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_observed_policy() {
        let policy = AutopilotConfig::default().automation_policy();
        assert_eq!(policy.sync, SyncPolicy::default());
        assert_eq!(policy.run, RunPolicy::default());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[workspace]
organization = "acme"
workspace_id = "ws-123"

[run]
auto_apply = true
timeout_secs = 600

[[variables]]
key = "AWS_REGION"
value = "us-east-1"
category = "env"

[[variables]]
key = "instance_type"
value = "t2.micro"
"#
        )
        .unwrap();

        let config = AutopilotConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.workspace.organization, "acme");
        assert_eq!(config.workspace.workspace_id.as_deref(), Some("ws-123"));
        assert_eq!(config.workspace.base_url, "https://app.terraform.io/api/v2");
        let policy = config.automation_policy();
        assert_eq!(policy.run.mode, ApplyMode::Auto);
        assert_eq!(policy.run.timeout, Duration::from_secs(600));
        assert_eq!(policy.sync.deletion_checks, 5);

        let vars = config.desired_variables().unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].category, VariableCategory::Env);
        assert_eq!(vars[1].category, VariableCategory::Terraform);
    }

    #[test]
    fn test_status_fetch_retries_saturate() {
        let mut config = AutopilotConfig::default();
        config.run.status_fetch_retries = u32::MAX;

        let policy = config.automation_policy();

        assert_eq!(policy.run.status_retry.max_attempts, u32::MAX);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(AutopilotConfig::load(Some(Path::new("/nonexistent/autopilot.toml"))).is_err());
    }

    #[test]
    fn test_variable_value_from_environment() {
        std::env::set_var("AUTOPILOT_TEST_SECRET_VALUE", "s3cret");
        let var = VariableConfig {
            key: "AWS_SECRET_KEY".to_string(),
            value: None,
            value_env: Some("AUTOPILOT_TEST_SECRET_VALUE".to_string()),
            category: VariableCategory::Terraform,
            sensitive: true,
        }
        .resolve()
        .unwrap();
        assert_eq!(var.value, "s3cret");
        assert!(var.sensitive);
    }

    #[test]
    fn test_variable_without_value_is_rejected() {
        let err = VariableConfig {
            key: "EMPTY".to_string(),
            value: None,
            value_env: None,
            category: VariableCategory::Env,
            sensitive: false,
        }
        .resolve()
        .unwrap_err();
        assert!(err.to_string().contains("EMPTY"));
    }

    #[test]
    fn test_saved_config_omits_token() {
        let mut config = AutopilotConfig::default();
        config.workspace.token = Some("secret-token".to_string());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autopilot.toml");

        config.save_to_file(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("secret-token"));
        assert!(written.contains("timeout_secs = 120"));
    }
}
