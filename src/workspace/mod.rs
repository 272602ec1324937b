pub mod client;
pub mod errors;
pub mod types;

pub use client::{HttpWorkspaceClient, WorkspaceApi};
#[cfg(any(test, feature = "testing"))]
pub use client::MockWorkspaceApi;
pub use errors::ApiError;
pub use types::{
    ConfigurationVersion, ConfigurationVersionStatus, Run, RunRequest, RunStatus, Variable,
    VariableCategory, WorkspaceRef,
};
