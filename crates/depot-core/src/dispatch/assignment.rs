use std::sync::Arc;

use depot_model::{ResourceId, Worker};
use tracing::{debug, warn};

use crate::{error::CoreError, store::ReservationStore};

/// A committed reservation of one resource for one worker.
///
/// Call [`Assignment::release`] when the work is done. If the assignment is dropped without
/// being released (the owning future was canceled, for instance), the release is spawned on the
/// current tokio runtime.
pub struct Assignment {
    resource_id: ResourceId,
    worker: Worker,
    store: Arc<dyn ReservationStore>,
    released: bool,
}

impl Assignment {
    pub(crate) fn new(resource_id: ResourceId, worker: Worker, store: Arc<dyn ReservationStore>) -> Self {
        Self {
            resource_id,
            worker,
            store,
            released: false,
        }
    }

    #[inline]
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    #[inline]
    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    /// Delete the reservation. Returns whether the record was still present.
    ///
    /// On a store error the guard is dropped unreleased, so the drop path tries once more.
    pub async fn release(mut self) -> Result<bool, CoreError> {
        let removed = self
            .store
            .delete(&self.resource_id, &self.worker.name)
            .await?;
        self.released = true;
        if !removed {
            warn!(
                resource_id = %self.resource_id,
                worker = %self.worker.name,
                "reservation was already gone at release"
            );
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assignment")
            .field("resource_id", &self.resource_id)
            .field("worker", &self.worker)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for Assignment {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(resource_id = %self.resource_id, "assignment dropped outside a runtime; reservation leaked");
            return;
        };

        let store = Arc::clone(&self.store);
        let resource_id = std::mem::take(&mut self.resource_id);
        let worker = self.worker.name.clone();
        debug!(%resource_id, %worker, "releasing dropped assignment");
        handle.spawn(async move {
            if let Err(e) = store.delete(&resource_id, &worker).await {
                warn!(%resource_id, %worker, error = %e, "failed to release dropped assignment");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryReservations;
    use async_trait::async_trait;
    use depot_model::{Reservation, WorkerName};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::SystemTime;

    /// Fails the first delete, then behaves like the in-memory store.
    struct FirstDeleteFails {
        inner: MemoryReservations,
        failed: AtomicBool,
    }

    #[async_trait]
    impl ReservationStore for FirstDeleteFails {
        async fn insert_if_absent(&self, r: &str, w: &WorkerName) -> Result<bool, StoreError> {
            self.inner.insert_if_absent(r, w).await
        }
        async fn delete(&self, r: &str, w: &WorkerName) -> Result<bool, StoreError> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            self.inner.delete(r, w).await
        }
        async fn find(&self, r: &str) -> Result<Option<Reservation>, StoreError> {
            self.inner.find(r).await
        }
        async fn find_all(&self) -> Result<Vec<Reservation>, StoreError> {
            self.inner.find_all().await
        }
    }

    #[tokio::test]
    async fn failed_release_falls_back_to_drop_path() {
        let inner = MemoryReservations::new();
        let name = WorkerName::from("a@h");
        let store = FirstDeleteFails {
            inner: inner.clone(),
            failed: AtomicBool::new(false),
        };
        store.insert_if_absent("repo-1", &name).await.unwrap();

        let assignment = Assignment::new(
            "repo-1".into(),
            Worker::new(name, SystemTime::now()),
            Arc::new(store),
        );
        assert!(format!("{assignment:?}").contains("released: false"));
        assert!(matches!(
            assignment.release().await,
            Err(CoreError::Store(StoreError::Unavailable(_)))
        ));

        for _ in 0..100 {
            if inner.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(inner.is_empty());
    }

    #[tokio::test]
    async fn dropped_assignment_is_released_in_background() {
        let store = MemoryReservations::new();
        let name = WorkerName::from("a@h");
        store.insert_if_absent("repo-1", &name).await.unwrap();

        let assignment = Assignment::new(
            "repo-1".into(),
            Worker::new(name, SystemTime::now()),
            Arc::new(store.clone()),
        );
        drop(assignment);

        for _ in 0..100 {
            if store.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(store.is_empty());
    }
}
