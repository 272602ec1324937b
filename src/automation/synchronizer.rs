// Variable reconciliation against a workspace whose listing lags behind deletes

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::AutomationError;
use super::retry::RetryPolicy;
use crate::workspace::{Variable, VariableCategory, WorkspaceApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    pub create_retry: RetryPolicy,
    /// Listing checks made after a delete before giving up
    pub deletion_checks: u32,
    pub deletion_check_interval: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            create_retry: RetryPolicy::new(3, Duration::from_secs(2)),
            deletion_checks: 5,
            deletion_check_interval: Duration::from_secs(2),
        }
    }
}

/// What happened to one desired variable
#[derive(Debug, Clone)]
pub struct SyncedVariable {
    pub variable: Variable,
    /// Remote ids removed before the variable was recreated
    pub replaced: Vec<String>,
    pub create_attempts: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub synced: Vec<SyncedVariable>,
}

impl SyncReport {
    pub fn created(&self) -> usize {
        self.synced.iter().filter(|s| s.replaced.is_empty()).count()
    }

    pub fn replaced(&self) -> usize {
        self.synced.iter().filter(|s| !s.replaced.is_empty()).count()
    }
}

/// Makes the remote variable set hold exactly one entry per desired key.
///
/// Existing entries are deleted and recreated rather than updated in place;
/// a create is only issued once the listing no longer shows the old entry,
/// so two variables never share a key at rest. Keys are processed in order
/// and a failure leaves earlier keys synchronized.
pub struct VariableSynchronizer {
    api: Arc<dyn WorkspaceApi>,
    policy: SyncPolicy,
}

impl VariableSynchronizer {
    pub fn new(api: Arc<dyn WorkspaceApi>, policy: SyncPolicy) -> Self {
        Self { api, policy }
    }

    pub async fn synchronize(&self, desired: &[Variable]) -> Result<SyncReport, AutomationError> {
        validate_desired(desired)?;
        info!(count = desired.len(), "Synchronizing workspace variables");

        let existing = self
            .api
            .list_variables()
            .await
            .map_err(|source| AutomationError::Retrieval { source })?;
        let index = index_remote(&existing);

        let mut report = SyncReport::default();
        for var in desired {
            let stale = index
                .get(&(var.category, var.key.as_str()))
                .cloned()
                .unwrap_or_default();

            if !stale.is_empty() {
                info!(key = %var.key, category = %var.category, "Variable exists, deleting it first");
                for remote_id in &stale {
                    self.api.delete_variable(remote_id).await.map_err(|source| {
                        AutomationError::Delete {
                            key: var.key.clone(),
                            remote_id: remote_id.clone(),
                            source,
                        }
                    })?;
                }
                self.confirm_deleted(var).await?;
            }

            let (created, attempts) = self.create(var).await?;
            report.synced.push(SyncedVariable {
                variable: created,
                replaced: stale,
                create_attempts: attempts,
            });
        }

        info!(
            created = report.created(),
            replaced = report.replaced(),
            "Workspace variables synchronized"
        );
        Ok(report)
    }

    /// Poll the listing until no entry for the variable's key remains
    async fn confirm_deleted(&self, var: &Variable) -> Result<(), AutomationError> {
        let checks = self.policy.deletion_checks.max(1);
        for attempt in 1..=checks {
            let listing = self
                .api
                .list_variables()
                .await
                .map_err(|source| AutomationError::Retrieval { source })?;

            let still_listed = listing
                .iter()
                .any(|v| v.correlation_key() == var.correlation_key());
            if !still_listed {
                debug!(key = %var.key, attempt, "Variable confirmed deleted");
                return Ok(());
            }

            debug!(key = %var.key, attempt, checks, "Variable still listed, waiting");
            if attempt < checks {
                tokio::time::sleep(self.policy.deletion_check_interval).await;
            }
        }

        warn!(key = %var.key, checks, "Deletion never became visible");
        Err(AutomationError::StaleDelete {
            key: var.key.clone(),
            attempts: checks,
        })
    }

    async fn create(&self, var: &Variable) -> Result<(Variable, u32), AutomationError> {
        let api = &self.api;
        let mut attempts = 0;
        let result = self
            .policy
            .create_retry
            .execute("create_variable", || {
                attempts += 1;
                api.create_variable(var)
            })
            .await;

        match result {
            Ok(created) => {
                info!(key = %var.key, attempts, "Created variable");
                Ok((created, attempts))
            }
            Err((source, attempts)) => {
                warn!(
                    key = %var.key,
                    attempts,
                    body = source.body().unwrap_or_default(),
                    "Variable creation failed"
                );
                Err(AutomationError::Create {
                    key: var.key.clone(),
                    attempts,
                    source,
                })
            }
        }
    }
}

fn validate_desired(desired: &[Variable]) -> Result<(), AutomationError> {
    let mut seen = HashSet::new();
    for var in desired {
        if !seen.insert(var.correlation_key()) {
            return Err(AutomationError::DuplicateDesiredKey {
                key: var.key.clone(),
                category: var.category,
            });
        }
    }
    Ok(())
}

/// (category, key) → every remote id listed under it
fn index_remote(listing: &[Variable]) -> HashMap<(VariableCategory, &str), Vec<String>> {
    let mut index: HashMap<(VariableCategory, &str), Vec<String>> = HashMap::new();
    for var in listing {
        if let Some(id) = &var.remote_id {
            index
                .entry(var.correlation_key())
                .or_default()
                .push(id.clone());
        }
    }
    index
}
