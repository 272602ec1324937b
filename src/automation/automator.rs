use std::sync::Arc;
use tracing::{info, Instrument};

use super::errors::AutomationError;
use super::publisher::ConfigurationPublisher;
use super::run_controller::{RunController, RunOutcome, RunPolicy};
use super::synchronizer::{SyncPolicy, SyncReport, VariableSynchronizer};
use crate::observability::{create_session_span, OperationTimer};
use crate::telemetry::generate_correlation_id;
use crate::workspace::{Variable, WorkspaceApi, WorkspaceRef};

#[derive(Debug, Clone, Default)]
pub struct AutomationPolicy {
    pub sync: SyncPolicy,
    pub run: RunPolicy,
}

#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub variables: Vec<Variable>,
    pub artifact: Vec<u8>,
}

/// One automation session against a single workspace.
///
/// Stages share the same remote workspace state and must not be driven
/// concurrently; use one automator per workspace from one place at a time.
pub struct WorkspaceAutomator {
    workspace: WorkspaceRef,
    synchronizer: VariableSynchronizer,
    publisher: ConfigurationPublisher,
    runs: RunController,
    correlation_id: String,
}

impl WorkspaceAutomator {
    pub fn new(workspace: WorkspaceRef, api: Arc<dyn WorkspaceApi>, policy: AutomationPolicy) -> Self {
        Self {
            workspace,
            synchronizer: VariableSynchronizer::new(api.clone(), policy.sync),
            publisher: ConfigurationPublisher::new(api.clone()),
            runs: RunController::new(api, policy.run),
            correlation_id: generate_correlation_id(),
        }
    }

    pub fn workspace(&self) -> &WorkspaceRef {
        &self.workspace
    }

    fn span(&self, stage: &str) -> tracing::Span {
        create_session_span(
            stage,
            &self.workspace.organization,
            &self.workspace.workspace_id,
            &self.correlation_id,
        )
    }

    pub async fn synchronize_variables(
        &self,
        desired: &[Variable],
    ) -> Result<SyncReport, AutomationError> {
        let timer = OperationTimer::new("synchronize_variables");
        let report = self
            .synchronizer
            .synchronize(desired)
            .instrument(self.span("synchronize_variables"))
            .await?;
        timer.finish();
        Ok(report)
    }

    pub async fn publish_configuration(&self, artifact: Vec<u8>) -> Result<String, AutomationError> {
        let timer = OperationTimer::new("publish_configuration");
        let version_id = self
            .publisher
            .publish(artifact)
            .instrument(self.span("publish_configuration"))
            .await?;
        timer.finish();
        Ok(version_id)
    }

    pub async fn run(
        &self,
        configuration_version_id: Option<&str>,
    ) -> Result<RunOutcome, AutomationError> {
        let timer = OperationTimer::new("run");
        let outcome = self
            .runs
            .execute(configuration_version_id)
            .instrument(self.span("run"))
            .await?;
        timer.finish();
        Ok(outcome)
    }

    /// Synchronize variables, publish the artifact, then run against the new version
    pub async fn deploy(&self, request: DeployRequest) -> Result<RunOutcome, AutomationError> {
        info!(
            workspace = %self.workspace.workspace_id,
            variables = request.variables.len(),
            artifact_bytes = request.artifact.len(),
            "Starting deployment"
        );

        self.synchronize_variables(&request.variables).await?;
        let version_id = self.publish_configuration(request.artifact).await?;
        self.run(Some(&version_id)).await
    }
}
