// Workspace service client: the async seam every automation component depends on

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::errors::ApiError;
use super::types::*;
use crate::http::{RateLimitedHttpClient, RateLimits};

/// Operations the automation core needs from the remote workspace service.
///
/// Implementations must be usable from one session at a time; overlapping
/// variable reconciliation against the same workspace is not safe.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    /// Full variable listing of the workspace, each entry carrying its remote id
    async fn list_variables(&self) -> Result<Vec<Variable>, ApiError>;

    async fn delete_variable(&self, remote_id: &str) -> Result<(), ApiError>;

    /// Create a variable; the returned record carries the new remote id
    async fn create_variable(&self, variable: &Variable) -> Result<Variable, ApiError>;

    async fn create_configuration_version(
        &self,
        auto_queue_runs: bool,
    ) -> Result<ConfigurationVersion, ApiError>;

    async fn upload_configuration(&self, target: &Url, bytes: Vec<u8>) -> Result<(), ApiError>;

    async fn create_run(&self, request: &RunRequest) -> Result<Run, ApiError>;

    async fn get_run(&self, run_id: &str) -> Result<Run, ApiError>;

    async fn apply_run(&self, run_id: &str, comment: Option<String>) -> Result<(), ApiError>;
}

/// reqwest-backed client for the workspace service's JSON:API contract
#[derive(Debug)]
pub struct HttpWorkspaceClient {
    http: RateLimitedHttpClient,
    workspace: WorkspaceRef,
}

impl HttpWorkspaceClient {
    pub fn new(workspace: WorkspaceRef, token: &str, limits: &RateLimits) -> Result<Self, ApiError> {
        let http = RateLimitedHttpClient::new(token, limits)?;
        Ok(Self { http, workspace })
    }

    pub fn workspace(&self) -> &WorkspaceRef {
        &self.workspace
    }

    /// Resolve a workspace id from its name within an organization.
    /// Returns `Ok(None)` when the organization has no workspace of that name.
    pub async fn lookup_workspace_id(
        base_url: &str,
        token: &str,
        organization: &str,
        name: &str,
        limits: &RateLimits,
    ) -> Result<Option<String>, ApiError> {
        let http = RateLimitedHttpClient::new(token, limits)?;
        // Fetched by name directly; the organization listing is paginated
        let url = format!(
            "{}/organizations/{}/workspaces/{}",
            base_url.trim_end_matches('/'),
            organization,
            name
        );

        debug!(organization = organization, name = name, "Looking up workspace by name");
        let response = match http.send_json_api::<()>(Method::GET, &url, None).await {
            Ok(response) => response,
            Err(ApiError::Status { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let workspace: Document<Resource<WorkspaceAttributes>> = decode(&url, response).await?;

        Ok(Some(workspace.data.id))
    }

    fn url(&self, path: &str) -> String {
        self.workspace.endpoint(path)
    }
}

#[async_trait]
impl WorkspaceApi for HttpWorkspaceClient {
    async fn list_variables(&self) -> Result<Vec<Variable>, ApiError> {
        let url = self.url(&self.workspace.vars_path());
        let response = self.http.send_json_api::<()>(Method::GET, &url, None).await?;
        let listing: Document<Vec<Resource<VariableAttributes>>> = decode(&url, response).await?;

        let variables: Vec<Variable> = listing
            .data
            .into_iter()
            .map(Resource::into_variable)
            .collect();
        debug!(count = variables.len(), "Fetched workspace variable listing");
        Ok(variables)
    }

    async fn delete_variable(&self, remote_id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("{}/{}", self.workspace.vars_path(), remote_id));
        self.http.send_json_api::<()>(Method::DELETE, &url, None).await?;
        Ok(())
    }

    async fn create_variable(&self, variable: &Variable) -> Result<Variable, ApiError> {
        let url = self.url(&self.workspace.vars_path());
        let payload: Document<NewResource<VariableAttributes>> = variable.into();
        let response = self
            .http
            .send_json_api(Method::POST, &url, Some(&payload))
            .await?;
        let response = require_status(&url, response, StatusCode::CREATED).await?;
        let created: Document<Resource<VariableAttributes>> = decode(&url, response).await?;

        let remote_id = created.data.id;
        Ok(variable.clone().with_remote_id(&remote_id))
    }

    async fn create_configuration_version(
        &self,
        auto_queue_runs: bool,
    ) -> Result<ConfigurationVersion, ApiError> {
        let url = self.url(&format!(
            "/workspaces/{}/configuration-versions",
            self.workspace.workspace_id
        ));
        let payload = Document {
            data: NewResource {
                kind: "configuration-versions",
                attributes: NewConfigurationVersionAttributes { auto_queue_runs },
                relationships: None,
            },
        };
        let response = self
            .http
            .send_json_api(Method::POST, &url, Some(&payload))
            .await?;
        let created: Document<Resource<ConfigurationVersionAttributes>> =
            decode(&url, response).await?;

        let upload_target =
            Url::parse(&created.data.attributes.upload_url).map_err(|e| ApiError::InvalidUrl {
                url: created.data.attributes.upload_url.clone(),
                message: e.to_string(),
            })?;
        let status = created
            .data
            .attributes
            .status
            .as_deref()
            .map(ConfigurationVersionStatus::from)
            .unwrap_or(ConfigurationVersionStatus::Pending);

        Ok(ConfigurationVersion {
            id: created.data.id,
            upload_target,
            status,
        })
    }

    async fn upload_configuration(&self, target: &Url, bytes: Vec<u8>) -> Result<(), ApiError> {
        let size = bytes.len();
        self.http.put_bytes(target.as_str(), bytes).await?;
        info!(bytes = size, "Uploaded configuration artifact");
        Ok(())
    }

    async fn create_run(&self, request: &RunRequest) -> Result<Run, ApiError> {
        let url = self.url("/runs");
        let payload = new_run_document(&self.workspace, request);
        let response = self
            .http
            .send_json_api(Method::POST, &url, Some(&payload))
            .await?;
        let created: Document<Resource<RunAttributes>> = decode(&url, response).await?;
        Ok(created.data.into_run())
    }

    async fn get_run(&self, run_id: &str) -> Result<Run, ApiError> {
        let url = self.url(&format!("/runs/{run_id}"));
        let response = self.http.send_json_api::<()>(Method::GET, &url, None).await?;
        let run: Document<Resource<RunAttributes>> = decode(&url, response).await?;
        Ok(run.data.into_run())
    }

    async fn apply_run(&self, run_id: &str, comment: Option<String>) -> Result<(), ApiError> {
        let url = self.url(&format!("/runs/{run_id}/actions/apply"));
        let payload = ApplyAction { comment };
        self.http
            .send_json_api(Method::POST, &url, Some(&payload))
            .await?;
        Ok(())
    }
}

async fn require_status(
    endpoint: &str,
    response: Response,
    expected: StatusCode,
) -> Result<Response, ApiError> {
    if response.status() == expected {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        endpoint: endpoint.to_string(),
        status,
        body,
    })
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(|source| ApiError::Transport {
        endpoint: endpoint.to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
