use anyhow::Result;

use super::connect;
use crate::config::AutopilotConfig;

pub struct SyncVarsCommand<'a> {
    config: &'a AutopilotConfig,
}

impl<'a> SyncVarsCommand<'a> {
    pub fn new(config: &'a AutopilotConfig) -> Self {
        Self { config }
    }

    pub async fn execute(&self) -> Result<()> {
        let desired = self.config.desired_variables()?;
        if desired.is_empty() {
            println!("⚠️  No [[variables]] configured; nothing to synchronize");
            return Ok(());
        }

        let automator = connect(self.config).await?;
        println!(
            "🔄 Synchronizing {} variables in {}",
            desired.len(),
            automator.workspace().workspace_id
        );
        let report = automator.synchronize_variables(&desired).await?;

        for synced in &report.synced {
            let action = if synced.replaced.is_empty() { "created" } else { "replaced" };
            println!(
                "  {} {} ({})",
                action, synced.variable.key, synced.variable.category
            );
        }
        println!(
            "✅ {} created, {} replaced",
            report.created(),
            report.replaced()
        );
        Ok(())
    }
}
