use serde::{Deserialize, Serialize};

use crate::Worker;

/// Fleet health snapshot served by the status surface.
///
/// Field names are part of the wire contract and stay snake_case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub api_version: String,
    pub platform_version: String,
    pub messaging_connected: bool,
    pub workers: Vec<Worker>,
}
