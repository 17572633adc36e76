//! Worker selection for resource-bound work.
//!
//! Selection is advisory: it reads two independently changing collections and picks a worker
//! that was unreserved as of that read. The reservation write that follows is authoritative.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use depot_model::{Worker, WorkerName};
use tracing::{debug, instrument, trace};

use crate::{
    error::CoreError,
    store::{ReservationStore, WorkerRegistry},
};

/// How to choose among equally eligible workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// First eligible worker in name order.
    #[default]
    Any,
    /// Rotate through eligible workers across calls.
    RoundRobin,
}

pub struct WorkerSelector {
    workers: Arc<dyn WorkerRegistry>,
    reservations: Arc<dyn ReservationStore>,
    policy: SelectionPolicy,
    cursor: AtomicUsize,
}

impl WorkerSelector {
    pub fn new(workers: Arc<dyn WorkerRegistry>, reservations: Arc<dyn ReservationStore>) -> Self {
        Self {
            workers,
            reservations,
            policy: SelectionPolicy::default(),
            cursor: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Returns `false` for control-plane identities (scheduler, resource manager).
    #[inline]
    pub fn is_worker(name: &WorkerName) -> bool {
        name.is_assignable()
    }

    /// Pick a worker that holds no reservation.
    ///
    /// Fails with [`CoreError::NoWorkers`] when every assignable worker is reserved or the registry is empty.
    #[instrument(level = "debug", skip(self), fields(policy = ?self.policy))]
    pub async fn get_unreserved_worker(&self) -> Result<Worker, CoreError> {
        let registered = self.workers.list_all().await?;
        let reserved: HashSet<WorkerName> = self
            .reservations
            .find_all()
            .await?
            .into_iter()
            .map(|r| r.worker_name)
            .collect();

        // Keyed by name so duplicates from a sloppy backend collapse and order is stable.
        let eligible: BTreeMap<WorkerName, Worker> = registered
            .into_iter()
            .filter(|w| Self::is_worker(&w.name) && !reserved.contains(&w.name))
            .map(|w| (w.name.clone(), w))
            .collect();

        trace!(
            eligible = eligible.len(),
            reserved = reserved.len(),
            "computed unreserved workers"
        );
        if eligible.is_empty() {
            debug!("all workers are reserved or excluded");
            return Err(CoreError::NoWorkers);
        }

        let index = match self.policy {
            SelectionPolicy::Any => 0,
            SelectionPolicy::RoundRobin => {
                self.cursor.fetch_add(1, Ordering::Relaxed) % eligible.len()
            }
        };
        eligible
            .into_values()
            .nth(index)
            .ok_or(CoreError::NoWorkers)
    }

    /// Worker currently holding the reservation for `resource_id`.
    ///
    /// This is a lookup, not an allocator. No reservation gives [`CoreError::NoWorkers`];
    /// a reservation whose worker record has disappeared gives `Ok(None)`.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_worker_for_reservation(
        &self,
        resource_id: &str,
    ) -> Result<Option<Worker>, CoreError> {
        if resource_id.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "resource_id cannot be empty".into(),
            ));
        }

        let Some(reservation) = self.reservations.find(resource_id).await? else {
            return Err(CoreError::NoWorkers);
        };

        let worker = self.workers.get(&reservation.worker_name).await?;
        if worker.is_none() {
            debug!(worker = %reservation.worker_name, "reserved worker is no longer registered");
        }
        Ok(worker)
    }
}
