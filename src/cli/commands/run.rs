use anyhow::Result;

use super::{connect, report_outcome};
use crate::config::AutopilotConfig;

pub struct RunCommand {
    config: AutopilotConfig,
    configuration_version: Option<String>,
}

impl RunCommand {
    pub fn new(config: AutopilotConfig) -> Self {
        Self {
            config,
            configuration_version: None,
        }
    }

    pub fn with_configuration_version(mut self, id: Option<String>) -> Self {
        self.configuration_version = id;
        self
    }

    pub fn with_auto_apply(mut self, auto_apply: bool) -> Self {
        if auto_apply {
            self.config.run.auto_apply = true;
        }
        self
    }

    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        if let Some(secs) = timeout_secs {
            self.config.run.timeout_secs = secs;
        }
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let automator = connect(&self.config).await?;
        println!("🚀 Queueing run in {}", automator.workspace().workspace_id);
        let outcome = automator.run(self.configuration_version.as_deref()).await?;
        report_outcome(&outcome)
    }
}
