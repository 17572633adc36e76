use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid worker name: {0} (expected: <role>@<host>)")]
    InvalidWorkerName(String),
    #[error("invalid skip directive: {0}")]
    InvalidSkip(String),
    #[error("failed to resolve hostname: {0}")]
    Hostname(String),
}
