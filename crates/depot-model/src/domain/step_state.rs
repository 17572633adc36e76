use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution state of a single step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepState {
    /// Constructed but not processed yet.
    #[default]
    NotStarted,
    /// Currently processing.
    Running,
    /// Finished without error.
    Success,
    /// Finished with an error.
    Failed,
    /// Every unit type of the step was excluded by the skip-list.
    Skipped,
    /// Stopped early because the run was canceled.
    Canceled,
}

impl StepState {
    /// Returns `true` if the step will not transition further during this run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Success | StepState::Failed | StepState::Skipped | StepState::Canceled
        )
    }

    /// Short lowercase label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepState::NotStarted => "not_started",
            StepState::Running => "running",
            StepState::Success => "success",
            StepState::Failed => "failed",
            StepState::Skipped => "skipped",
            StepState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(StepState::Success.is_terminal());
        assert!(StepState::Failed.is_terminal());
        assert!(StepState::Skipped.is_terminal());
        assert!(StepState::Canceled.is_terminal());

        assert!(!StepState::NotStarted.is_terminal());
        assert!(!StepState::Running.is_terminal());
    }

    #[test]
    fn default_is_not_started() {
        assert_eq!(StepState::default(), StepState::NotStarted);
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_string(&StepState::NotStarted).unwrap();
        assert_eq!(json, r#""notStarted""#);

        let back: StepState = serde_json::from_str(r#""canceled""#).unwrap();
        assert_eq!(back, StepState::Canceled);
    }
}
