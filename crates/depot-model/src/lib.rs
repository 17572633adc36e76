//! Plain data shared by the depot crates.
//!
//! Nothing here talks to a store or spawns work; `depot-core` owns behavior.

mod constants;
pub use constants::{API_VERSION, QUEUE_SUFFIX, RESOURCE_MANAGER_WORKER_NAME, SCHEDULER_WORKER_NAME};

mod error;
pub use error::ModelError;

mod domain;
pub use domain::*;
