use std::sync::Arc;
use tracing::info;

use super::errors::AutomationError;
use crate::workspace::WorkspaceApi;

/// Publishes configuration artifacts as new configuration versions.
///
/// Versions are created with run auto-queuing disabled so that run creation
/// stays with the caller. Upload targets are single-use, so a failed upload
/// is not retried.
pub struct ConfigurationPublisher {
    api: Arc<dyn WorkspaceApi>,
}

impl ConfigurationPublisher {
    pub fn new(api: Arc<dyn WorkspaceApi>) -> Self {
        Self { api }
    }

    /// Create one configuration version and upload `artifact` to it, returning its id
    pub async fn publish(&self, artifact: Vec<u8>) -> Result<String, AutomationError> {
        let version = self
            .api
            .create_configuration_version(false)
            .await
            .map_err(|source| AutomationError::VersionCreate { source })?;
        info!(
            version_id = %version.id,
            status = ?version.status,
            "Created configuration version"
        );

        let size = artifact.len();
        self.api
            .upload_configuration(&version.upload_target, artifact)
            .await
            .map_err(|source| AutomationError::Upload {
                version_id: version.id.clone(),
                source,
            })?;

        info!(version_id = %version.id, bytes = size, "Configuration published");
        Ok(version.id)
    }
}
