// Triggers a provisioning run and follows it to a terminal status or a deadline

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::errors::AutomationError;
use super::retry::RetryPolicy;
use super::run_phase::{ApplyMode, PollDecision, RunPhaseTracker};
use crate::workspace::{Run, RunRequest, RunStatus, WorkspaceApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPolicy {
    pub mode: ApplyMode,
    pub plan_poll_interval: Duration,
    pub apply_poll_interval: Duration,
    /// Wall-clock budget measured from run creation
    pub timeout: Duration,
    /// Retry budget for a single status fetch; one attempt means any failure is fatal
    pub status_retry: RetryPolicy,
    pub message: Option<String>,
    pub apply_comment: Option<String>,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            mode: ApplyMode::Manual,
            plan_poll_interval: Duration::from_secs(10),
            apply_poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
            status_retry: RetryPolicy::none(),
            message: Some("Triggered via workspace-autopilot".to_string()),
            apply_comment: Some("Applied via API".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub status: RunStatus,
    pub observed_at: DateTime<Utc>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    /// Always one of the terminal statuses
    pub status: RunStatus,
    pub elapsed: Duration,
    pub transitions: Vec<StatusTransition>,
    pub apply_issued: bool,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Applied
    }
}

pub struct RunController {
    api: Arc<dyn WorkspaceApi>,
    policy: RunPolicy,
}

impl RunController {
    pub fn new(api: Arc<dyn WorkspaceApi>, policy: RunPolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> &RunPolicy {
        &self.policy
    }

    /// Create a run and poll it until it reaches a terminal status.
    ///
    /// On timeout the remote run is left as it is; cancelling it is up to the caller.
    pub async fn execute(
        &self,
        configuration_version_id: Option<&str>,
    ) -> Result<RunOutcome, AutomationError> {
        let request = RunRequest {
            message: self.policy.message.clone(),
            // Always explicit so the workspace's own auto-apply setting cannot
            // advance a manual run past `planned` on its own
            auto_apply: Some(self.policy.mode == ApplyMode::Auto),
            configuration_version_id: configuration_version_id.map(str::to_string),
        };

        let run = self
            .api
            .create_run(&request)
            .await
            .map_err(|source| AutomationError::RunCreate { source })?;
        let started = Instant::now();
        info!(
            run_id = %run.id,
            mode = ?self.policy.mode,
            timeout_secs = self.policy.timeout.as_secs(),
            "Run created"
        );

        self.monitor(run, started).await
    }

    async fn monitor(&self, run: Run, started: Instant) -> Result<RunOutcome, AutomationError> {
        let mut tracker = RunPhaseTracker::new(
            self.policy.mode,
            self.policy.plan_poll_interval,
            self.policy.apply_poll_interval,
        );
        let mut transitions: Vec<StatusTransition> = Vec::new();
        let mut apply_issued = false;

        loop {
            let elapsed = started.elapsed();
            let last_status = transitions.last().map(|t| t.status.clone());
            if elapsed > self.policy.timeout {
                warn!(
                    run_id = %run.id,
                    last_status = ?last_status,
                    elapsed_secs = elapsed.as_secs(),
                    "Run did not finish before the deadline"
                );
                return Err(AutomationError::RunTimeout {
                    run_id: run.id,
                    last_status,
                    elapsed,
                    timeout: self.policy.timeout,
                });
            }

            let status = self.fetch_status(&run.id, &last_status).await?;
            if last_status.as_ref() != Some(&status) {
                let observed_at = Utc::now();
                info!(
                    run_id = %run.id,
                    status = %status,
                    at = %observed_at.format("%H:%M:%S"),
                    elapsed_secs = elapsed.as_secs(),
                    "Run status changed"
                );
                transitions.push(StatusTransition {
                    status: status.clone(),
                    observed_at,
                    elapsed,
                });
            }

            let wait = match tracker.observe(&status) {
                PollDecision::Wait(interval) => interval,
                PollDecision::Apply => {
                    info!(run_id = %run.id, "Plan ready, applying run");
                    self.api
                        .apply_run(&run.id, self.policy.apply_comment.clone())
                        .await
                        .map_err(|source| AutomationError::Apply {
                            run_id: run.id.clone(),
                            source,
                        })?;
                    apply_issued = true;
                    tracker.interval()
                }
                PollDecision::Finished(status) => {
                    let elapsed = started.elapsed();
                    info!(run_id = %run.id, status = %status, elapsed_secs = elapsed.as_secs(), "Run finished");
                    return Ok(RunOutcome {
                        run_id: run.id,
                        status,
                        elapsed,
                        transitions,
                        apply_issued,
                    });
                }
                PollDecision::Failed(status) => {
                    warn!(run_id = %run.id, status = %status, "Run failed before applying");
                    return Err(AutomationError::RunFailed {
                        run_id: run.id,
                        status,
                    });
                }
            };

            debug!(run_id = %run.id, wait_secs = wait.as_secs(), "Waiting before next status check");
            tokio::time::sleep(wait).await;
        }
    }

    async fn fetch_status(
        &self,
        run_id: &str,
        last_status: &Option<RunStatus>,
    ) -> Result<RunStatus, AutomationError> {
        let api = &self.api;
        self.policy
            .status_retry
            .execute("get_run", || api.get_run(run_id))
            .await
            .map(|run| run.status)
            .map_err(|(source, _)| AutomationError::StatusFetch {
                run_id: run_id.to_string(),
                last_status: last_status.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::mocks::{ApiCall, FakeWorkspace};

    fn controller(fake: &Arc<FakeWorkspace>, policy: RunPolicy) -> RunController {
        RunController::new(fake.clone(), policy)
    }

    fn is_apply(call: &ApiCall) -> bool {
        matches!(call, ApiCall::ApplyRun { .. })
    }

    fn is_status_fetch(call: &ApiCall) -> bool {
        matches!(call, ApiCall::GetRun { .. })
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_run_applies_once_after_planned() {
        let fake = Arc::new(FakeWorkspace::new().with_run_script(&[
            "pending", "planning", "planning", "planned", "applying", "applied",
        ]));

        let outcome = controller(&fake, RunPolicy::default())
            .execute(Some("cv-1"))
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Applied);
        assert!(outcome.apply_issued);
        assert_eq!(fake.count_calls(is_apply), 1);

        // apply immediately follows the fetch that observed `planned`
        let calls = fake.calls();
        let apply_at = calls.iter().position(is_apply).unwrap();
        assert_eq!(fake.count_calls(is_status_fetch), 6);
        assert_eq!(calls[..apply_at].iter().filter(|c| is_status_fetch(c)).count(), 4);
        assert_eq!(
            calls[0],
            ApiCall::CreateRun {
                request_cv: Some("cv-1".to_string()),
                auto_apply: Some(false)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transitions_logged_once_per_change() {
        let fake = Arc::new(FakeWorkspace::new().with_run_script(&[
            "pending", "planning", "planning", "planned", "applying", "applied",
        ]));

        let outcome = controller(&fake, RunPolicy::default())
            .execute(None)
            .await
            .unwrap();

        let statuses: Vec<RunStatus> = outcome.transitions.iter().map(|t| t.status.clone()).collect();
        assert_eq!(
            statuses,
            vec![
                RunStatus::Pending,
                RunStatus::Planning,
                RunStatus::Planned,
                RunStatus::Applying,
                RunStatus::Applied,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_phase_polls_faster() {
        let fake = Arc::new(FakeWorkspace::new().with_run_script(&["planned", "applying", "applied"]));

        let outcome = controller(&fake, RunPolicy::default())
            .execute(None)
            .await
            .unwrap();

        // both waits happen at the 5s apply interval
        assert!(outcome.elapsed >= Duration::from_secs(10));
        assert!(outcome.elapsed < Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_stops_polling() {
        let fake = Arc::new(FakeWorkspace::new().with_run_script(&["planning"]));
        let policy = RunPolicy {
            plan_poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(5),
            ..RunPolicy::default()
        };

        let err = controller(&fake, policy).execute(None).await.unwrap_err();

        match err {
            AutomationError::RunTimeout { run_id, last_status, elapsed, timeout } => {
                assert_eq!(run_id, "run-1");
                assert_eq!(last_status, Some(RunStatus::Planning));
                assert!(elapsed > timeout);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        // polls at t = 0, 2, 4; the check at t = 6 fails before fetching
        assert_eq!(fake.count_calls(is_status_fetch), 3);
        assert_eq!(fake.count_calls(is_apply), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_failure_short_circuits() {
        let fake = Arc::new(FakeWorkspace::new().with_run_script(&["pending", "errored"]));

        let err = controller(&fake, RunPolicy::default())
            .execute(None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AutomationError::RunFailed { status: RunStatus::Errored, .. }
        ));
        assert_eq!(fake.count_calls(is_apply), 0);
        assert_eq!(fake.count_calls(is_status_fetch), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_apply_mode_never_issues_apply() {
        let fake = Arc::new(FakeWorkspace::new().with_run_script(&[
            "pending", "planning", "planned", "applying", "applied",
        ]));
        let policy = RunPolicy {
            mode: ApplyMode::Auto,
            ..RunPolicy::default()
        };

        let outcome = controller(&fake, policy).execute(None).await.unwrap();

        assert_eq!(outcome.status, RunStatus::Applied);
        assert!(!outcome.apply_issued);
        assert_eq!(fake.count_calls(is_apply), 0);
        assert_eq!(
            fake.calls()[0],
            ApiCall::CreateRun {
                request_cv: None,
                auto_apply: Some(true)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_after_apply_is_returned_as_status() {
        let fake = Arc::new(FakeWorkspace::new().with_run_script(&["planned", "applying", "errored"]));

        let outcome = controller(&fake, RunPolicy::default())
            .execute(None)
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Errored);
        assert!(!outcome.succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_fetch_failure_is_fatal_by_default() {
        let fake = Arc::new(
            FakeWorkspace::new()
                .with_run_script(&["applied"])
                .failing_status_fetches(1),
        );

        let err = controller(&fake, RunPolicy::default())
            .execute(None)
            .await
            .unwrap_err();

        assert!(matches!(err, AutomationError::StatusFetch { last_status: None, .. }));
        assert_eq!(fake.count_calls(is_status_fetch), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_fetch_retry_when_configured() {
        let fake = Arc::new(
            FakeWorkspace::new()
                .with_run_script(&["applied"])
                .failing_status_fetches(2),
        );
        let policy = RunPolicy {
            status_retry: RetryPolicy::new(3, Duration::from_secs(1)),
            ..RunPolicy::default()
        };

        let outcome = controller(&fake, policy).execute(None).await.unwrap();

        assert_eq!(outcome.status, RunStatus::Applied);
        assert_eq!(fake.count_calls(is_status_fetch), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_create_failure() {
        let fake = Arc::new(FakeWorkspace::new().failing_run_create());

        let err = controller(&fake, RunPolicy::default())
            .execute(None)
            .await
            .unwrap_err();

        assert!(matches!(err, AutomationError::RunCreate { .. }));
        assert_eq!(fake.count_calls(is_status_fetch), 0);
    }
}
