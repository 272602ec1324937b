use std::time::Duration;
use thiserror::Error;

use crate::workspace::{ApiError, RunStatus, VariableCategory};

/// Typed failures of an automation session. Every variant carries enough
/// context to diagnose without re-querying the service.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Failed to retrieve workspace variables: {source}")]
    Retrieval {
        #[source]
        source: ApiError,
    },

    #[error("Desired variable set lists '{key}' ({category}) more than once")]
    DuplicateDesiredKey {
        key: String,
        category: VariableCategory,
    },

    #[error("Failed to delete variable '{key}' ({remote_id}): {source}")]
    Delete {
        key: String,
        remote_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Variable '{key}' still listed after {attempts} deletion checks")]
    StaleDelete { key: String, attempts: u32 },

    #[error("Failed to create variable '{key}' after {attempts} attempts: {source}")]
    Create {
        key: String,
        attempts: u32,
        #[source]
        source: ApiError,
    },

    #[error("Failed to create configuration version: {source}")]
    VersionCreate {
        #[source]
        source: ApiError,
    },

    #[error("Failed to upload configuration version {version_id}: {source}")]
    Upload {
        version_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to create run: {source}")]
    RunCreate {
        #[source]
        source: ApiError,
    },

    #[error("Failed to fetch status of run {run_id} (last observed: {}): {source}", display_status(.last_status))]
    StatusFetch {
        run_id: String,
        last_status: Option<RunStatus>,
        #[source]
        source: ApiError,
    },

    #[error("Failed to apply run {run_id}: {source}")]
    Apply {
        run_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Run {run_id} finished with status '{status}' before applying")]
    RunFailed { run_id: String, status: RunStatus },

    #[error(
        "Run {run_id} still '{}' after {:.0?} (deadline {:.0?}); it continues remotely",
        display_status(.last_status), .elapsed, .timeout
    )]
    RunTimeout {
        run_id: String,
        last_status: Option<RunStatus>,
        elapsed: Duration,
        timeout: Duration,
    },

    #[error("Workspace '{name}' not found in organization '{organization}'")]
    WorkspaceNotFound { organization: String, name: String },

    #[error("Workspace lookup failed: {source}")]
    Lookup {
        #[source]
        source: ApiError,
    },
}

fn display_status(status: &Option<RunStatus>) -> String {
    status
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl AutomationError {
    /// Remote error body, when the failure came from a service response
    pub fn remote_body(&self) -> Option<&str> {
        match self {
            AutomationError::Retrieval { source }
            | AutomationError::Delete { source, .. }
            | AutomationError::Create { source, .. }
            | AutomationError::VersionCreate { source }
            | AutomationError::Upload { source, .. }
            | AutomationError::RunCreate { source }
            | AutomationError::StatusFetch { source, .. }
            | AutomationError::Apply { source, .. }
            | AutomationError::Lookup { source } => source.body(),
            _ => None,
        }
    }
}
