/// Name prefix of the scheduler process; it never receives resource-bound work.
pub const SCHEDULER_WORKER_NAME: &str = "scheduler";

/// Name prefix of the resource manager process; it never receives resource-bound work.
pub const RESOURCE_MANAGER_WORKER_NAME: &str = "resource_manager";

/// Suffix appended to a worker name to build its dedicated queue name.
pub const QUEUE_SUFFIX: &str = ".dq";

/// Version of the status surface reported to clients.
pub const API_VERSION: &str = "2";
