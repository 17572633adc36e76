//! Claim a resource, run work on the selected worker, release the claim.

mod assignment;
pub use assignment::Assignment;

use std::{any::Any, sync::Arc, time::Duration};

use depot_model::Worker;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::CoreError,
    selector::{SelectionPolicy, WorkerSelector},
    store::{ReservationStore, WorkerRegistry},
};

const DEFAULT_MAX_ATTEMPTS: u32 = 30;
const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Retry behavior for reservation acquisition.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Attempts before giving up with the last retryable error (at least one attempt is made).
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_delay_ms: u64,
    /// Policy handed to the worker selector.
    pub policy: SelectionPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            policy: SelectionPolicy::default(),
        }
    }
}

impl DispatchConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

pub struct Dispatcher {
    selector: WorkerSelector,
    reservations: Arc<dyn ReservationStore>,
    cfg: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        workers: Arc<dyn WorkerRegistry>,
        reservations: Arc<dyn ReservationStore>,
        cfg: DispatchConfig,
    ) -> Self {
        let selector =
            WorkerSelector::new(workers, Arc::clone(&reservations)).with_policy(cfg.policy);
        Self {
            selector,
            reservations,
            cfg,
        }
    }

    #[inline]
    pub fn selector(&self) -> &WorkerSelector {
        &self.selector
    }

    /// Reserve `resource_id` for an unreserved worker.
    ///
    /// `NoWorkers` and lost claims are retried up to `max_attempts`; store errors return immediately.
    #[instrument(level = "debug", skip(self))]
    pub async fn acquire(&self, resource_id: &str) -> Result<Assignment, CoreError> {
        if resource_id.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "resource_id cannot be empty".into(),
            ));
        }

        let attempts = self.cfg.max_attempts.max(1);
        let mut last = CoreError::NoWorkers;

        for attempt in 1..=attempts {
            match self.try_acquire(resource_id).await {
                Ok(assignment) => {
                    info!(worker = %assignment.worker().name, attempt, "resource reserved");
                    return Ok(assignment);
                }
                Err(e) if e.is_retryable() => {
                    debug!(attempt, reason = %e, "reservation attempt failed; will retry");
                    last = e;
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(self.cfg.retry_delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        warn!(attempts, reason = %last, "gave up reserving resource");
        Err(last)
    }

    async fn try_acquire(&self, resource_id: &str) -> Result<Assignment, CoreError> {
        if self.reservations.find(resource_id).await?.is_some() {
            return Err(CoreError::ReservationConflict(resource_id.to_string()));
        }

        let worker = self.selector.get_unreserved_worker().await?;
        if !self
            .reservations
            .insert_if_absent(resource_id, &worker.name)
            .await?
        {
            return Err(CoreError::ReservationConflict(resource_id.to_string()));
        }

        Ok(Assignment::new(
            resource_id.to_string(),
            worker,
            Arc::clone(&self.reservations),
        ))
    }

    /// Reserve `resource_id`, run `job` on a blocking thread, and release the reservation
    /// once the job has finished, whether it returned or panicked.
    ///
    /// Release is owned by a spawned task that outlives this future: dropping `run` early does
    /// not free the resource while the job is still executing. A failed release is logged and
    /// does not discard the job's output.
    #[instrument(level = "debug", skip(self, job))]
    pub async fn run<F, T>(&self, resource_id: &str, job: F) -> Result<T, CoreError>
    where
        F: FnOnce(Worker) -> T + Send + 'static,
        T: Send + 'static,
    {
        let assignment = self.acquire(resource_id).await?;
        let worker = assignment.worker().clone();

        let handle = tokio::task::spawn_blocking(move || job(worker));
        let supervised = tokio::spawn(async move {
            let outcome = handle.await;
            if let Err(e) = assignment.release().await {
                warn!(error = %e, "failed to release reservation after job");
            }
            outcome
        });

        supervised.await.and_then(|outcome| outcome).map_err(|e| {
            let reason = if e.is_panic() {
                panic_reason(e.into_panic())
            } else {
                e.to_string()
            };
            CoreError::JobPanicked {
                resource_id: resource_id.to_string(),
                reason,
            }
        })
    }
}

pub(crate) fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
