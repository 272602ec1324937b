// Domain records and JSON:API wire documents for the remote workspace service

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the remote workspace a session operates against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRef {
    pub organization: String,
    pub workspace_id: String,
    pub base_url: String,
}

impl WorkspaceRef {
    pub fn new(organization: &str, workspace_id: &str, base_url: &str) -> Self {
        Self {
            organization: organization.to_string(),
            workspace_id: workspace_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Join a service path (starting with `/`) onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn vars_path(&self) -> String {
        format!("/workspaces/{}/vars", self.workspace_id)
    }
}

/// Where a variable is made available inside a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableCategory {
    /// Exported into the run's process environment
    #[serde(rename = "env")]
    Env,
    /// Bound as an input variable of the configuration language
    #[serde(rename = "terraform")]
    Terraform,
}

impl fmt::Display for VariableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableCategory::Env => write!(f, "env"),
            VariableCategory::Terraform => write!(f, "terraform"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Variable {
    pub key: String,
    pub value: String,
    pub category: VariableCategory,
    pub sensitive: bool,
    /// Set only once the variable is known to exist remotely
    pub remote_id: Option<String>,
}

impl Variable {
    pub fn new(key: &str, value: &str, category: VariableCategory, sensitive: bool) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            category,
            sensitive,
            remote_id: None,
        }
    }

    pub fn env(key: &str, value: &str) -> Self {
        Self::new(key, value, VariableCategory::Env, false)
    }

    pub fn terraform(key: &str, value: &str) -> Self {
        Self::new(key, value, VariableCategory::Terraform, false)
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_remote_id(mut self, id: &str) -> Self {
        self.remote_id = Some(id.to_string());
        self
    }

    pub fn correlation_key(&self) -> (VariableCategory, &str) {
        (self.category, self.key.as_str())
    }
}

// Sensitive values never reach logs through Debug
impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.sensitive { "<redacted>" } else { self.value.as_str() };
        f.debug_struct("Variable")
            .field("key", &self.key)
            .field("value", &value)
            .field("category", &self.category)
            .field("sensitive", &self.sensitive)
            .field("remote_id", &self.remote_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationVersionStatus {
    Pending,
    Uploaded,
    Errored,
    Unknown(String),
}

impl From<&str> for ConfigurationVersionStatus {
    fn from(status: &str) -> Self {
        match status {
            "pending" => ConfigurationVersionStatus::Pending,
            "uploaded" => ConfigurationVersionStatus::Uploaded,
            "errored" => ConfigurationVersionStatus::Errored,
            _ => ConfigurationVersionStatus::Unknown(status.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigurationVersion {
    pub id: String,
    pub upload_target: Url,
    pub status: ConfigurationVersionStatus,
}

/// Status of a provisioning run, advanced only by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Pending,
    Planning,
    Planned,
    Applying,
    Applied,
    Errored,
    Canceled,
    ForceCanceled,
    /// Service-specific intermediate states (`plan_queued`, `confirmed`, ...)
    Other(String),
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Applied | RunStatus::Errored | RunStatus::Canceled | RunStatus::ForceCanceled
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RunStatus::Errored | RunStatus::Canceled | RunStatus::ForceCanceled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Planning => "planning",
            RunStatus::Planned => "planned",
            RunStatus::Applying => "applying",
            RunStatus::Applied => "applied",
            RunStatus::Errored => "errored",
            RunStatus::Canceled => "canceled",
            RunStatus::ForceCanceled => "force_canceled",
            RunStatus::Other(status) => status.as_str(),
        }
    }
}

impl From<&str> for RunStatus {
    fn from(status: &str) -> Self {
        match status {
            "pending" => RunStatus::Pending,
            "planning" => RunStatus::Planning,
            "planned" => RunStatus::Planned,
            "applying" => RunStatus::Applying,
            "applied" => RunStatus::Applied,
            "errored" => RunStatus::Errored,
            "canceled" => RunStatus::Canceled,
            "force_canceled" | "force-canceled" => RunStatus::ForceCanceled,
            _ => RunStatus::Other(status.to_string()),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    pub created_at: Option<DateTime<Utc>>,
}

/// Parameters for creating a run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub message: Option<String>,
    /// `None` leaves the workspace's own auto-apply setting in effect
    pub auto_apply: Option<bool>,
    pub configuration_version_id: Option<String>,
}

// ---- JSON:API wire documents ----

#[derive(Debug, Serialize, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct Resource<A> {
    pub id: String,
    pub attributes: A,
}

#[derive(Debug, Serialize)]
pub struct NewResource<A> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: A,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<RunRelationships>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VariableAttributes {
    pub key: String,
    /// The service returns `null` for sensitive values
    #[serde(default)]
    pub value: Option<String>,
    pub category: VariableCategory,
    #[serde(default)]
    pub sensitive: bool,
}

impl Resource<VariableAttributes> {
    pub fn into_variable(self) -> Variable {
        Variable {
            key: self.attributes.key,
            value: self.attributes.value.unwrap_or_default(),
            category: self.attributes.category,
            sensitive: self.attributes.sensitive,
            remote_id: Some(self.id),
        }
    }
}

impl From<&Variable> for Document<NewResource<VariableAttributes>> {
    fn from(var: &Variable) -> Self {
        Document {
            data: NewResource {
                kind: "vars",
                attributes: VariableAttributes {
                    key: var.key.clone(),
                    value: Some(var.value.clone()),
                    category: var.category,
                    sensitive: var.sensitive,
                },
                relationships: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewConfigurationVersionAttributes {
    #[serde(rename = "auto-queue-runs")]
    pub auto_queue_runs: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConfigurationVersionAttributes {
    #[serde(rename = "upload-url")]
    pub upload_url: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewRunAttributes {
    #[serde(rename = "is-destroy")]
    pub is_destroy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "auto-apply", skip_serializing_if = "Option::is_none")]
    pub auto_apply: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RunRelationships {
    pub workspace: Document<Linkage>,
    #[serde(rename = "configuration-version", skip_serializing_if = "Option::is_none")]
    pub configuration_version: Option<Document<Linkage>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Linkage {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct RunAttributes {
    pub status: String,
    #[serde(rename = "created-at", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource<RunAttributes> {
    pub fn into_run(self) -> Run {
        Run {
            id: self.id,
            status: RunStatus::from(self.attributes.status.as_str()),
            created_at: self.attributes.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WorkspaceAttributes {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ApplyAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

pub fn new_run_document(
    workspace: &WorkspaceRef,
    request: &RunRequest,
) -> Document<NewResource<NewRunAttributes>> {
    Document {
        data: NewResource {
            kind: "runs",
            attributes: NewRunAttributes {
                is_destroy: false,
                message: request.message.clone(),
                auto_apply: request.auto_apply,
            },
            relationships: Some(RunRelationships {
                workspace: Document {
                    data: Linkage {
                        kind: "workspaces".to_string(),
                        id: workspace.workspace_id.clone(),
                    },
                },
                configuration_version: request.configuration_version_id.as_ref().map(|id| {
                    Document {
                        data: Linkage {
                            kind: "configuration-versions".to_string(),
                            id: id.clone(),
                        },
                    }
                }),
            }),
        },
    }
}
