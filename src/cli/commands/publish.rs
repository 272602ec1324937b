use anyhow::Result;
use std::path::PathBuf;

use super::{connect, read_artifact};
use crate::config::AutopilotConfig;

pub struct PublishCommand<'a> {
    config: &'a AutopilotConfig,
    file: PathBuf,
}

impl<'a> PublishCommand<'a> {
    pub fn new(config: &'a AutopilotConfig, file: PathBuf) -> Self {
        Self { config, file }
    }

    pub async fn execute(&self) -> Result<()> {
        let artifact = read_artifact(&self.file).await?;
        let automator = connect(self.config).await?;
        println!("📦 Uploading {} ({} bytes)", self.file.display(), artifact.len());

        let version_id = automator.publish_configuration(artifact).await?;
        // Bare id on stdout so scripts can capture it
        println!("{version_id}");
        Ok(())
    }
}
