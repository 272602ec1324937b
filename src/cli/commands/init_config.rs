use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::config::{AutopilotConfig, VariableConfig};
use crate::workspace::VariableCategory;

pub struct InitConfigCommand {
    path: PathBuf,
    force: bool,
}

impl InitConfigCommand {
    pub fn new(path: PathBuf, force: bool) -> Self {
        Self { path, force }
    }

    pub fn execute(&self) -> Result<()> {
        if self.path.exists() && !self.force {
            bail!(
                "{} already exists; pass --force to overwrite it",
                self.path.display()
            );
        }

        starter_config().save_to_file(&self.path)?;
        println!("✅ Wrote {}", self.path.display());
        println!("   Set workspace.organization and workspace.workspace_id (or workspace_name),");
        println!("   then export AUTOPILOT_TOKEN or TFE_TOKEN.");
        Ok(())
    }
}

fn starter_config() -> AutopilotConfig {
    let mut config = AutopilotConfig::default();
    config.variables = vec![VariableConfig {
        key: "AWS_REGION".to_string(),
        value: Some("us-east-1".to_string()),
        value_env: None,
        category: VariableCategory::Env,
        sensitive: false,
    }];
    config
}
