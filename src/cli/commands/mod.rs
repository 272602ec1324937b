use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::automation::{AutomationError, RunOutcome, WorkspaceAutomator};
use crate::config::AutopilotConfig;
use crate::workspace::HttpWorkspaceClient;

pub mod deploy;
pub mod init_config;
pub mod publish;
pub mod run;
pub mod sync_vars;
pub mod workspace_id;

pub use deploy::DeployCommand;
pub use init_config::InitConfigCommand;
pub use publish::PublishCommand;
pub use run::RunCommand;
pub use sync_vars::SyncVarsCommand;
pub use workspace_id::WorkspaceIdCommand;

/// Resolve the configured workspace to an id, looking it up by name if needed
pub async fn resolve_workspace_id(config: &AutopilotConfig) -> Result<String> {
    if let Some(id) = &config.workspace.workspace_id {
        return Ok(id.clone());
    }
    let name = config
        .workspace
        .workspace_name
        .as_deref()
        .context("configure either workspace.workspace_id or workspace.workspace_name")?;
    lookup_workspace_id(config, name).await
}

pub async fn lookup_workspace_id(config: &AutopilotConfig, name: &str) -> Result<String> {
    let organization = &config.workspace.organization;
    let id = HttpWorkspaceClient::lookup_workspace_id(
        &config.workspace.base_url,
        config.token()?,
        organization,
        name,
        &config.rate_limits(),
    )
    .await
    .map_err(|source| AutomationError::Lookup { source })?
    .ok_or_else(|| AutomationError::WorkspaceNotFound {
        organization: organization.clone(),
        name: name.to_string(),
    })?;
    info!(workspace = name, id = %id, "Resolved workspace");
    Ok(id)
}

pub async fn connect(config: &AutopilotConfig) -> Result<WorkspaceAutomator> {
    let workspace_id = resolve_workspace_id(config).await?;
    let workspace = config.workspace_ref(&workspace_id);
    let client = HttpWorkspaceClient::new(workspace.clone(), config.token()?, &config.rate_limits())?;
    Ok(WorkspaceAutomator::new(
        workspace,
        Arc::new(client),
        config.automation_policy(),
    ))
}

pub async fn read_artifact(path: &std::path::Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read archive {}", path.display()))
}

/// Print the outcome and fail unless the run ended applied
pub fn report_outcome(outcome: &RunOutcome) -> Result<()> {
    for transition in &outcome.transitions {
        println!(
            "  {} {:>5}s  {}",
            transition.observed_at.format("%H:%M:%S"),
            transition.elapsed.as_secs(),
            transition.status
        );
    }
    if outcome.succeeded() {
        println!("✅ Run {} applied in {}s", outcome.run_id, outcome.elapsed.as_secs());
        Ok(())
    } else {
        anyhow::bail!("run {} finished with status {}", outcome.run_id, outcome.status)
    }
}
