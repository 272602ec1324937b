use anyhow::Result;

use super::lookup_workspace_id;
use crate::config::AutopilotConfig;

pub struct WorkspaceIdCommand<'a> {
    config: &'a AutopilotConfig,
    name: String,
}

impl<'a> WorkspaceIdCommand<'a> {
    pub fn new(config: &'a AutopilotConfig, name: String) -> Self {
        Self { config, name }
    }

    pub async fn execute(&self) -> Result<()> {
        let id = lookup_workspace_id(self.config, &self.name).await?;
        println!("{id}");
        Ok(())
    }
}
