use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{StepId, StepState};

/// Progress of one step and, recursively, of its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub step_id: StepId,
    pub state: StepState,
    /// Expected number of units; `1` when the total could not be estimated cheaply.
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_details: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProgressReport>,
}

impl ProgressReport {
    /// `Failed` if this step or any descendant failed, otherwise the step's own state.
    pub fn aggregate_state(&self) -> StepState {
        if self.any_failed() {
            StepState::Failed
        } else {
            self.state
        }
    }

    fn any_failed(&self) -> bool {
        self.state == StepState::Failed || self.children.iter().any(ProgressReport::any_failed)
    }

    /// Depth-first lookup by step id.
    pub fn find(&self, step_id: &str) -> Option<&ProgressReport> {
        if self.step_id == step_id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(step_id))
    }
}

/// Result of a complete sync or publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    /// Identifier of the run that produced this report.
    pub run_id: String,
    /// `false` iff the root step itself ended in `Failed`.
    pub success_flag: bool,
    /// Whether the run was canceled.
    pub canceled_flag: bool,
    /// Child step id to terminal state, for quick scanning.
    pub summary: BTreeMap<StepId, StepState>,
    /// Full nested progress tree rooted at the pipeline step.
    pub details: ProgressReport,
}

impl FinalReport {
    /// Summary entries in the given state.
    pub fn steps_in(&self, state: StepState) -> Vec<&str> {
        self.summary
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
