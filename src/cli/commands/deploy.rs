use anyhow::Result;
use std::path::PathBuf;

use super::{connect, read_artifact, report_outcome};
use crate::automation::DeployRequest;
use crate::config::AutopilotConfig;

pub struct DeployCommand {
    config: AutopilotConfig,
    file: PathBuf,
}

impl DeployCommand {
    pub fn new(config: AutopilotConfig, file: PathBuf) -> Self {
        Self { config, file }
    }

    pub fn with_auto_apply(mut self, auto_apply: bool) -> Self {
        if auto_apply {
            self.config.run.auto_apply = true;
        }
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let request = DeployRequest {
            variables: self.config.desired_variables()?,
            artifact: read_artifact(&self.file).await?,
        };
        let automator = connect(&self.config).await?;
        println!(
            "🚀 Deploying {} to {} ({} variables)",
            self.file.display(),
            automator.workspace().workspace_id,
            request.variables.len()
        );

        let outcome = automator.deploy(request).await?;
        report_outcome(&outcome)
    }
}
