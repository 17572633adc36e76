use serde::{Deserialize, Serialize};

use crate::{ResourceId, WorkerName};

/// Binds a resource to the single worker currently permitted to act on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub resource_id: ResourceId,
    pub worker_name: WorkerName,
}

impl Reservation {
    pub fn new(resource_id: impl Into<ResourceId>, worker_name: impl Into<WorkerName>) -> Self {
        Self {
            resource_id: resource_id.into(),
            worker_name: worker_name.into(),
        }
    }
}
