use depot_model::{ModelError, ResourceId, StepId};
use thiserror::Error;

/// Failure reported by a reservation store or worker registry backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store operation failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    /// No eligible, unreserved worker could be found. The caller should retry.
    #[error("no eligible worker available")]
    NoWorkers,

    /// The resource is held by someone else, or the atomic claim lost a race.
    #[error("resource is already reserved: {0}")]
    ReservationConflict(ResourceId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("job for resource {resource_id} panicked: {reason}")]
    JobPanicked {
        resource_id: ResourceId,
        reason: String,
    },
}

impl CoreError {
    /// Returns `true` for conditions expected to clear as fleet state changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::NoWorkers | CoreError::ReservationConflict(_))
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("step {0} is not attached to a pipeline")]
    Detached(StepId),

    #[error("invalid configuration: {0}")]
    Config(#[from] ModelError),

    #[error("unit source failed: {0}")]
    Conduit(String),

    #[error("unit {unit} failed: {reason}")]
    Unit { unit: String, reason: String },

    #[error("child step {step_id} failed: {reason}")]
    ChildFailed { step_id: StepId, reason: String },

    #[error("{0}")]
    Hook(String),
}
