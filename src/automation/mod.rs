// Workspace automation core: variable reconciliation, configuration
// publishing, and run monitoring against a remote workspace

pub mod automator;
pub mod errors;
pub mod publisher;
pub mod retry;
pub mod run_controller;
pub mod run_phase;
pub mod synchronizer;

#[cfg(test)]
pub mod mocks;

pub use automator::{AutomationPolicy, DeployRequest, WorkspaceAutomator};
pub use errors::AutomationError;
pub use publisher::ConfigurationPublisher;
pub use retry::RetryPolicy;
pub use run_controller::{RunController, RunOutcome, RunPolicy, StatusTransition};
pub use run_phase::{ApplyMode, PollDecision, RunPhase, RunPhaseTracker};
pub use synchronizer::{SyncPolicy, SyncReport, SyncedVariable, VariableSynchronizer};
