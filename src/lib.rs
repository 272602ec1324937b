// Workspace Autopilot - remote workspace automation
// Exposes the automation core for the CLI and for embedding

pub mod automation;
pub mod cli;
pub mod config;
pub mod http;
pub mod observability;
pub mod telemetry;
pub mod workspace;

// Re-export key types for easy access
pub use automation::{
    AutomationError, AutomationPolicy, DeployRequest, RunOutcome, RunPolicy, SyncPolicy,
    SyncReport, WorkspaceAutomator,
};
pub use config::AutopilotConfig;
pub use http::{RateLimitedHttpClient, RateLimits};
pub use observability::{api_metrics, create_session_span, ApiMetrics, OperationTimer};
pub use telemetry::{generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use workspace::{
    ApiError, HttpWorkspaceClient, Run, RunStatus, Variable, VariableCategory, WorkspaceApi,
    WorkspaceRef,
};
