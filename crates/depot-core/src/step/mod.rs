//! Step tree executed by a worker for one sync or publish run.
//!
//! A run is single-threaded: children are processed in order and cancellation is cooperative,
//! polled between sibling steps and between units.

mod conduit;
pub use conduit::{Conduit, MemoryConduit, UnitStream};

mod context;
pub use context::{CancelHandle, StepContext};

mod base;
pub use base::StepCore;

mod lifecycle;
pub use lifecycle::process;

mod group;
pub use group::GroupStep;

mod unit;
pub use unit::{FailurePolicy, FnHandler, UnitHandler, UnitStep, handler_fn};

mod pipeline;
pub use pipeline::{Pipeline, PipelineKind};

mod progress;
pub use progress::ProgressListener;

use crate::error::StepError;

/// A node of the step tree.
///
/// Implementors own a [`StepCore`] and override the hooks they need; [`process`] drives the
/// hooks and children in a fixed order.
pub trait Step: Send {
    fn core(&self) -> &StepCore;

    fn core_mut(&mut self) -> &mut StepCore;

    /// Whether the whole step should be skipped for this run.
    fn is_skipped(&mut self) -> Result<bool, StepError> {
        Ok(false)
    }

    /// Expected number of units, computed once before processing starts.
    fn total(&mut self) -> Result<u64, StepError> {
        Ok(1)
    }

    /// Runs before the children.
    fn initialize(&mut self) -> Result<(), StepError> {
        Ok(())
    }

    /// Main work of the step; runs after the children.
    fn process_main(&mut self) -> Result<(), StepError> {
        Ok(())
    }

    /// Runs after `process_main` succeeds.
    fn finalize(&mut self) -> Result<(), StepError> {
        Ok(())
    }
}
