// In-memory workspace service for tests: records every call in order and can
// simulate delete lag, transient create failures, and scripted run statuses.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::workspace::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListVariables,
    DeleteVariable { remote_id: String },
    CreateVariable { key: String, value: String },
    CreateConfigurationVersion { auto_queue_runs: bool },
    Upload { target: String, bytes: Vec<u8> },
    CreateRun { request_cv: Option<String>, auto_apply: Option<bool> },
    GetRun { run_id: String },
    ApplyRun { run_id: String, comment: Option<String> },
}

#[derive(Debug, Default)]
struct FakeState {
    variables: Vec<Variable>,
    // deleted entries still visible to the listing for N more reads
    ghosts: Vec<(Variable, u32)>,
    delete_lag: u32,
    create_failures: u32,
    rejected_keys: Vec<String>,
    fail_listing_after: Option<usize>,
    listings: usize,
    fail_version_create: bool,
    fail_upload: bool,
    fail_run_create: bool,
    fail_status_fetches: u32,
    run_script: VecDeque<RunStatus>,
    next_id: u32,
    calls: Vec<ApiCall>,
}

#[derive(Debug, Default)]
pub struct FakeWorkspace {
    state: Mutex<FakeState>,
}

fn rejected(endpoint: &str, status: u16, body: &str) -> ApiError {
    ApiError::Status {
        endpoint: endpoint.to_string(),
        status,
        body: body.to_string(),
    }
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed remote variables; each gets a fresh remote id
    pub fn with_variables(self, variables: Vec<Variable>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for var in variables {
                state.next_id += 1;
                let id = format!("var-{}", state.next_id);
                state.variables.push(var.with_remote_id(&id));
            }
        }
        self
    }

    /// Deleted variables stay visible for `listings` further listing reads
    pub fn with_delete_lag(self, listings: u32) -> Self {
        self.state.lock().unwrap().delete_lag = listings;
        self
    }

    /// The next `count` create requests are rejected
    pub fn failing_creates(self, count: u32) -> Self {
        self.state.lock().unwrap().create_failures = count;
        self
    }

    /// Every create for `key` is rejected
    pub fn rejecting_key(self, key: &str) -> Self {
        self.state.lock().unwrap().rejected_keys.push(key.to_string());
        self
    }

    /// Listing succeeds `successes` times, then fails
    pub fn failing_listing_after(self, successes: usize) -> Self {
        self.state.lock().unwrap().fail_listing_after = Some(successes);
        self
    }

    pub fn failing_version_create(self) -> Self {
        self.state.lock().unwrap().fail_version_create = true;
        self
    }

    pub fn failing_upload(self) -> Self {
        self.state.lock().unwrap().fail_upload = true;
        self
    }

    pub fn failing_run_create(self) -> Self {
        self.state.lock().unwrap().fail_run_create = true;
        self
    }

    /// The next `count` run status fetches fail
    pub fn failing_status_fetches(self, count: u32) -> Self {
        self.state.lock().unwrap().fail_status_fetches = count;
        self
    }

    /// Statuses returned by successive run fetches; the last one repeats
    pub fn with_run_script(self, statuses: &[&str]) -> Self {
        self.state.lock().unwrap().run_script =
            statuses.iter().map(|s| RunStatus::from(*s)).collect();
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Variables that actually exist remotely (ignores listing lag)
    pub fn live_variables(&self) -> Vec<Variable> {
        self.state.lock().unwrap().variables.clone()
    }

    fn record(&self, call: ApiCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl WorkspaceApi for FakeWorkspace {
    async fn list_variables(&self) -> Result<Vec<Variable>, ApiError> {
        self.record(ApiCall::ListVariables);
        let mut state = self.state.lock().unwrap();

        if let Some(limit) = state.fail_listing_after {
            if state.listings >= limit {
                return Err(rejected("/vars", 503, "service unavailable"));
            }
        }
        state.listings += 1;

        let mut listing = state.variables.clone();
        for (ghost, remaining) in state.ghosts.iter_mut() {
            if *remaining > 0 {
                listing.push(ghost.clone());
                *remaining -= 1;
            }
        }
        state.ghosts.retain(|(_, remaining)| *remaining > 0);
        Ok(listing)
    }

    async fn delete_variable(&self, remote_id: &str) -> Result<(), ApiError> {
        self.record(ApiCall::DeleteVariable {
            remote_id: remote_id.to_string(),
        });
        let mut state = self.state.lock().unwrap();

        let Some(index) = state
            .variables
            .iter()
            .position(|v| v.remote_id.as_deref() == Some(remote_id))
        else {
            return Err(rejected("/vars", 404, "not found"));
        };
        let removed = state.variables.remove(index);
        if state.delete_lag > 0 {
            let lag = state.delete_lag;
            state.ghosts.push((removed, lag));
        }
        Ok(())
    }

    async fn create_variable(&self, variable: &Variable) -> Result<Variable, ApiError> {
        self.record(ApiCall::CreateVariable {
            key: variable.key.clone(),
            value: variable.value.clone(),
        });
        let mut state = self.state.lock().unwrap();

        if state.create_failures > 0 {
            state.create_failures -= 1;
            return Err(rejected("/vars", 500, r#"{"errors":[{"status":"500"}]}"#));
        }
        if state.rejected_keys.contains(&variable.key) {
            return Err(rejected("/vars", 422, r#"{"errors":[{"detail":"Key is invalid"}]}"#));
        }
        if state
            .variables
            .iter()
            .any(|v| v.correlation_key() == variable.correlation_key())
        {
            return Err(rejected(
                "/vars",
                422,
                r#"{"errors":[{"detail":"Key has already been taken"}]}"#,
            ));
        }

        state.next_id += 1;
        let created = variable.clone().with_remote_id(&format!("var-{}", state.next_id));
        state.variables.push(created.clone());
        Ok(created)
    }

    async fn create_configuration_version(
        &self,
        auto_queue_runs: bool,
    ) -> Result<ConfigurationVersion, ApiError> {
        self.record(ApiCall::CreateConfigurationVersion { auto_queue_runs });
        if self.state.lock().unwrap().fail_version_create {
            return Err(rejected("/configuration-versions", 404, "workspace not found"));
        }
        Ok(ConfigurationVersion {
            id: "cv-1".to_string(),
            upload_target: Url::parse("https://archivist.example.io/v1/object/upload-token")
                .unwrap(),
            status: ConfigurationVersionStatus::Pending,
        })
    }

    async fn upload_configuration(&self, target: &Url, bytes: Vec<u8>) -> Result<(), ApiError> {
        self.record(ApiCall::Upload {
            target: target.to_string(),
            bytes,
        });
        if self.state.lock().unwrap().fail_upload {
            return Err(rejected(target.as_str(), 403, "upload token expired"));
        }
        Ok(())
    }

    async fn create_run(&self, request: &RunRequest) -> Result<Run, ApiError> {
        self.record(ApiCall::CreateRun {
            request_cv: request.configuration_version_id.clone(),
            auto_apply: request.auto_apply,
        });
        if self.state.lock().unwrap().fail_run_create {
            return Err(rejected("/runs", 422, "configuration version not uploaded"));
        }
        Ok(Run {
            id: "run-1".to_string(),
            status: RunStatus::Pending,
            created_at: None,
        })
    }

    async fn get_run(&self, run_id: &str) -> Result<Run, ApiError> {
        self.record(ApiCall::GetRun {
            run_id: run_id.to_string(),
        });
        let mut state = self.state.lock().unwrap();

        if state.fail_status_fetches > 0 {
            state.fail_status_fetches -= 1;
            return Err(rejected("/runs", 502, "bad gateway"));
        }
        let status = if state.run_script.len() > 1 {
            state.run_script.pop_front()
        } else {
            state.run_script.front().cloned()
        };
        let Some(status) = status else {
            return Err(rejected("/runs", 404, "run not found"));
        };
        Ok(Run {
            id: run_id.to_string(),
            status,
            created_at: None,
        })
    }

    async fn apply_run(&self, run_id: &str, comment: Option<String>) -> Result<(), ApiError> {
        self.record(ApiCall::ApplyRun {
            run_id: run_id.to_string(),
            comment,
        });
        Ok(())
    }
}
