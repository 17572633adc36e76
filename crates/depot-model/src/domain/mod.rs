mod time_serde;

mod worker_name;
pub use worker_name::WorkerName;

mod worker;
pub use worker::Worker;

mod reservation;
pub use reservation::Reservation;

mod step_state;
pub use step_state::StepState;

mod skip;
pub use skip::{SkipDirective, SkipList};

mod plugin_config;
pub use plugin_config::PluginConfig;

mod unit;
pub use unit::{Unit, UnitCriteria};

mod repository;
pub use repository::Repository;

mod report;
pub use report::{FinalReport, ProgressReport};

mod status;
pub use status::StatusReport;

/// Identifier of a content repository or any other scope that needs exclusive access.
pub type ResourceId = String;

/// Content unit type tag (e.g. `"rpm"`, `"erratum"`).
pub type TypeId = String;

/// Identifier of a step inside a step tree.
pub type StepId = String;
