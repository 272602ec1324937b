// Bounded fixed-delay retry for workspace service calls

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::{debug, warn};

use crate::observability::api_metrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// A single attempt with no retry
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        FixedInterval::new(self.delay).take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    /// On exhaustion the last error is returned with the number of attempts made.
    pub async fn execute<F, Fut, T, E>(&self, operation_name: &str, mut operation: F) -> Result<T, (E, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let attempts = AtomicU32::new(0);
        let max_attempts = self.max_attempts.max(1);
        let operation_id = uuid::Uuid::new_v4();
        debug!(
            operation = operation_name,
            %operation_id,
            max_attempts,
            "Starting operation with retry"
        );

        let result = Retry::spawn(self.strategy(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt > 1 {
                api_metrics().record_retry();
            }
            let call = operation();
            async move {
                match call.await {
                    Ok(value) => Ok(value),
                    Err(error) => {
                        if attempt < max_attempts {
                            warn!(
                                operation = operation_name,
                                %operation_id,
                                attempt,
                                max_attempts,
                                error = %error,
                                "Attempt failed, retrying"
                            );
                        }
                        Err(error)
                    }
                }
            }
        })
        .await;

        result.map_err(|error| (error, attempts.load(Ordering::SeqCst)))
    }
}
