//! Persistence contracts for reservations and live workers.
//!
//! Backends provide the atomicity; the core only relies on `insert_if_absent` being a single
//! compare-and-set and `delete` removing a record only when it is held by the given worker.

mod memory;
pub use memory::{MemoryReservations, MemoryWorkers};

use async_trait::async_trait;
use depot_model::{Reservation, Worker, WorkerName};

use crate::error::StoreError;

/// Resource-id to worker-name mapping with at most one record per resource.
#[async_trait]
pub trait ReservationStore: Send + Sync + 'static {
    /// Atomically create the reservation unless one already exists for `resource_id`.
    ///
    /// Returns `false` when another holder won.
    async fn insert_if_absent(
        &self,
        resource_id: &str,
        worker: &WorkerName,
    ) -> Result<bool, StoreError>;

    /// Remove the reservation if it is held by `worker`. Returns whether a record was removed.
    async fn delete(&self, resource_id: &str, worker: &WorkerName) -> Result<bool, StoreError>;

    /// Reservation for one resource.
    async fn find(&self, resource_id: &str) -> Result<Option<Reservation>, StoreError>;

    /// Every reservation currently held.
    async fn find_all(&self) -> Result<Vec<Reservation>, StoreError>;
}

/// Set of live workers, refreshed by an external heartbeat collaborator.
#[async_trait]
pub trait WorkerRegistry: Send + Sync + 'static {
    async fn list_all(&self) -> Result<Vec<Worker>, StoreError>;

    async fn get(&self, name: &WorkerName) -> Result<Option<Worker>, StoreError>;

    /// Forget a worker. Returns whether it was present.
    async fn remove(&self, name: &WorkerName) -> Result<bool, StoreError>;
}
