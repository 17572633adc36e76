//! Removal of workers that stopped sending heartbeats, together with their reservations.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use depot_model::WorkerName;
use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::CoreError,
    store::{ReservationStore, WorkerRegistry},
};

const REAPER_TASK: &str = "depot-worker-reaper";

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// A worker silent for longer than this is considered dead.
    pub heartbeat_timeout_ms: u64,
    /// Pause between two reaping passes when run in a loop.
    pub interval_ms: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 300_000,
            interval_ms: 60_000,
        }
    }
}

/// What one reaping pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapOutcome {
    pub removed_workers: Vec<WorkerName>,
    pub released_reservations: usize,
}

pub struct WorkerReaper {
    workers: Arc<dyn WorkerRegistry>,
    reservations: Arc<dyn ReservationStore>,
    cfg: ReaperConfig,
}

impl WorkerReaper {
    pub fn new(
        workers: Arc<dyn WorkerRegistry>,
        reservations: Arc<dyn ReservationStore>,
        cfg: ReaperConfig,
    ) -> Self {
        Self {
            workers,
            reservations,
            cfg,
        }
    }

    /// Remove stale workers and delete every reservation they held.
    #[instrument(level = "debug", skip(self))]
    pub async fn reap(&self, now: SystemTime) -> Result<ReapOutcome, CoreError> {
        let timeout = Duration::from_millis(self.cfg.heartbeat_timeout_ms);
        let mut outcome = ReapOutcome::default();

        let stale: Vec<WorkerName> = self
            .workers
            .list_all()
            .await?
            .into_iter()
            .filter(|w| w.is_stale(now, timeout))
            .map(|w| w.name)
            .collect();
        if stale.is_empty() {
            return Ok(outcome);
        }

        let held = self.reservations.find_all().await?;
        for name in stale {
            // Unregister first so the selector cannot hand out this worker again.
            self.workers.remove(&name).await?;
            for r in held.iter().filter(|r| r.worker_name == name) {
                if self.reservations.delete(&r.resource_id, &name).await? {
                    outcome.released_reservations += 1;
                }
            }
            warn!(worker = %name, "worker missed heartbeats and was removed");
            outcome.removed_workers.push(name);
        }

        info!(
            workers = outcome.removed_workers.len(),
            reservations = outcome.released_reservations,
            "reaped dead workers"
        );
        Ok(outcome)
    }

    /// Reap every `interval_ms` until `ctx` is canceled.
    pub async fn run_until(&self, ctx: CancellationToken) {
        let interval = Duration::from_millis(self.cfg.interval_ms);
        loop {
            if let Err(e) = self.reap(SystemTime::now()).await {
                warn!(error = %e, "reaping pass failed");
            }
            tokio::select! {
                _ = ctx.cancelled() => {
                    debug!("reaper stopped");
                    return;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Single reaping pass packaged for a taskvisor supervisor.
    ///
    /// Schedule it with a periodic restart policy of `interval_ms`.
    pub fn reaper_task(self: Arc<Self>) -> TaskRef {
        TaskFn::arc(REAPER_TASK, move |ctx: CancellationToken| {
            let reaper = Arc::clone(&self);
            async move {
                if ctx.is_cancelled() {
                    return Err(TaskError::Canceled);
                }
                match reaper.reap(SystemTime::now()).await {
                    Ok(_) => Ok(()),
                    Err(e) => Err(TaskError::Fail {
                        reason: format!("reap failed: {e}"),
                    }),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryReservations, MemoryWorkers};
    use std::time::UNIX_EPOCH;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[tokio::test]
    async fn stale_workers_and_their_reservations_are_removed() {
        let workers = MemoryWorkers::new();
        workers.heartbeat("alive@h", at(1_000)).unwrap();
        workers.heartbeat("dead@h", at(100)).unwrap();

        let reservations = MemoryReservations::new();
        let dead = WorkerName::from("dead@h");
        let alive = WorkerName::from("alive@h");
        reservations.insert_if_absent("repo-1", &dead).await.unwrap();
        reservations.insert_if_absent("repo-2", &dead).await.unwrap();
        reservations.insert_if_absent("repo-3", &alive).await.unwrap();

        let reaper = WorkerReaper::new(
            Arc::new(workers.clone()),
            Arc::new(reservations.clone()),
            ReaperConfig {
                heartbeat_timeout_ms: 300_000,
                interval_ms: 1_000,
            },
        );

        let outcome = reaper.reap(at(1_050)).await.unwrap();
        assert_eq!(outcome.removed_workers, vec![dead]);
        assert_eq!(outcome.released_reservations, 2);

        assert_eq!(workers.len(), 1);
        let left = reservations.find_all().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].worker_name, alive);
    }

    #[tokio::test]
    async fn fresh_fleet_is_untouched() {
        let workers = MemoryWorkers::new();
        workers.heartbeat("a@h", at(1_000)).unwrap();

        let reaper = WorkerReaper::new(
            Arc::new(workers.clone()),
            Arc::new(MemoryReservations::new()),
            ReaperConfig::default(),
        );
        let outcome = reaper.reap(at(1_010)).await.unwrap();
        assert_eq!(outcome, ReapOutcome::default());
        assert_eq!(workers.len(), 1);
    }

    #[tokio::test]
    async fn run_until_stops_on_cancel() {
        let reaper = WorkerReaper::new(
            Arc::new(MemoryWorkers::new()),
            Arc::new(MemoryReservations::new()),
            ReaperConfig::default(),
        );
        let ctx = CancellationToken::new();
        ctx.cancel();
        reaper.run_until(ctx).await;
    }

    #[test]
    fn task_can_be_built() {
        let reaper = Arc::new(WorkerReaper::new(
            Arc::new(MemoryWorkers::new()),
            Arc::new(MemoryReservations::new()),
            ReaperConfig::default(),
        ));
        let _task: TaskRef = reaper.reaper_task();
    }
}
