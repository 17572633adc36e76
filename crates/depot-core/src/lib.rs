pub mod error;
pub use error::{CoreError, StepError, StoreError};

pub mod store;
pub use store::{MemoryReservations, MemoryWorkers, ReservationStore, WorkerRegistry};

pub mod selector;
pub use selector::{SelectionPolicy, WorkerSelector};

pub mod dispatch;
pub use dispatch::{Assignment, DispatchConfig, Dispatcher};

pub mod reaper;
pub use reaper::{ReapOutcome, ReaperConfig, WorkerReaper};

pub mod status;
pub use status::{BrokerProbe, StaticProbe, StatusManager};

pub mod step;
pub use step::{
    CancelHandle, Conduit, FailurePolicy, FnHandler, GroupStep, MemoryConduit, Pipeline,
    PipelineKind, ProgressListener, Step, StepContext, StepCore, UnitHandler, UnitStep,
    UnitStream, handler_fn, process,
};
