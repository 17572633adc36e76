use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::SystemTime,
};

use async_trait::async_trait;
use depot_model::{Reservation, ResourceId, Worker, WorkerName};
use tracing::trace;

use super::{ReservationStore, WorkerRegistry};
use crate::error::StoreError;

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Backend("lock poisoned".into())
}

/// In-memory reservation store.
///
/// Check-and-insert happens under one write lock, which gives the same guarantee as a
/// unique index on `resource_id` in a database.
#[derive(Clone, Default)]
pub struct MemoryReservations {
    inner: Arc<RwLock<HashMap<ResourceId, WorkerName>>>,
}

impl MemoryReservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReservationStore for MemoryReservations {
    async fn insert_if_absent(
        &self,
        resource_id: &str,
        worker: &WorkerName,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        if inner.contains_key(resource_id) {
            return Ok(false);
        }
        inner.insert(resource_id.to_string(), worker.clone());
        trace!(resource_id, worker = %worker, "reservation created");
        Ok(true)
    }

    async fn delete(&self, resource_id: &str, worker: &WorkerName) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let held_by_worker = inner.get(resource_id).is_some_and(|holder| holder == worker);
        if !held_by_worker {
            return Ok(false);
        }
        inner.remove(resource_id);
        trace!(resource_id, worker = %worker, "reservation deleted");
        Ok(true)
    }

    async fn find(&self, resource_id: &str) -> Result<Option<Reservation>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .get(resource_id)
            .map(|w| Reservation::new(resource_id, w.clone())))
    }

    async fn find_all(&self) -> Result<Vec<Reservation>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .iter()
            .map(|(r, w)| Reservation::new(r.clone(), w.clone()))
            .collect())
    }
}

/// In-memory worker registry.
#[derive(Clone, Default)]
pub struct MemoryWorkers {
    inner: Arc<RwLock<HashMap<WorkerName, Worker>>>,
}

impl MemoryWorkers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or refresh a worker record (called on heartbeat receipt).
    pub fn heartbeat(&self, name: impl Into<WorkerName>, at: SystemTime) -> Result<(), StoreError> {
        let name = name.into();
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner
            .entry(name.clone())
            .and_modify(|w| w.last_heartbeat = at)
            .or_insert_with(|| Worker::new(name, at));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WorkerRegistry for MemoryWorkers {
    async fn list_all(&self) -> Result<Vec<Worker>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.values().cloned().collect())
    }

    async fn get(&self, name: &WorkerName) -> Result<Option<Worker>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.get(name).cloned())
    }

    async fn remove(&self, name: &WorkerName) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        Ok(inner.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[tokio::test]
    async fn insert_if_absent_allows_one_holder() {
        let store = MemoryReservations::new();
        let a = WorkerName::from("a@host");
        let b = WorkerName::from("b@host");

        assert!(store.insert_if_absent("repo-1", &a).await.unwrap());
        assert!(!store.insert_if_absent("repo-1", &b).await.unwrap());

        let held = store.find("repo-1").await.unwrap().unwrap();
        assert_eq!(held.worker_name, a);
    }

    #[tokio::test]
    async fn one_worker_may_hold_many_resources() {
        let store = MemoryReservations::new();
        let a = WorkerName::from("a@host");

        assert!(store.insert_if_absent("repo-1", &a).await.unwrap());
        assert!(store.insert_if_absent("repo-2", &a).await.unwrap());
        assert_eq!(store.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_requires_matching_holder() {
        let store = MemoryReservations::new();
        let a = WorkerName::from("a@host");
        let b = WorkerName::from("b@host");

        store.insert_if_absent("repo-1", &a).await.unwrap();
        assert!(!store.delete("repo-1", &b).await.unwrap());
        assert!(store.find("repo-1").await.unwrap().is_some());

        assert!(store.delete("repo-1", &a).await.unwrap());
        assert!(store.find("repo-1").await.unwrap().is_none());
        assert!(!store.delete("repo-1", &a).await.unwrap());
    }

    #[tokio::test]
    async fn heartbeat_creates_then_refreshes() {
        let workers = MemoryWorkers::new();
        let t1 = UNIX_EPOCH + Duration::from_secs(10);
        let t2 = UNIX_EPOCH + Duration::from_secs(20);

        workers.heartbeat("w@host", t1).unwrap();
        workers.heartbeat("w@host", t2).unwrap();

        assert_eq!(workers.len(), 1);
        let w = workers.get(&WorkerName::from("w@host")).await.unwrap().unwrap();
        assert_eq!(w.last_heartbeat, t2);
    }

    #[tokio::test]
    async fn remove_forgets_worker() {
        let workers = MemoryWorkers::new();
        workers.heartbeat("w@host", SystemTime::now()).unwrap();

        assert!(workers.remove(&WorkerName::from("w@host")).await.unwrap());
        assert!(!workers.remove(&WorkerName::from("w@host")).await.unwrap());
        assert!(workers.list_all().await.unwrap().is_empty());
    }
}
