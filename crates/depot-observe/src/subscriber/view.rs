use std::borrow::Borrow;

use depot_model::{ProgressReport, StepState};
use tracing::{debug, error, info, trace, warn};

pub trait View {
    fn as_step(&self) -> &str;
    fn state(&self) -> StepState;
    fn total(&self) -> u64;
    fn successes(&self) -> u64;
    fn failures(&self) -> u64;
    fn last_error(&self) -> &str;
}

impl<T> View for T
where
    T: Borrow<ProgressReport>,
{
    #[inline]
    fn as_step(&self) -> &str {
        &self.borrow().step_id
    }
    #[inline]
    fn state(&self) -> StepState {
        self.borrow().state
    }
    #[inline]
    fn total(&self) -> u64 {
        self.borrow().total
    }
    #[inline]
    fn successes(&self) -> u64 {
        self.borrow().successes
    }
    #[inline]
    fn failures(&self) -> u64 {
        self.borrow().failures
    }
    #[inline]
    fn last_error(&self) -> &str {
        self.borrow()
            .error_details
            .last()
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}

#[inline]
pub fn message_for(state: StepState) -> &'static str {
    match state {
        StepState::NotStarted => "step not started",
        StepState::Running => "step running",
        StepState::Success => "step finished",
        StepState::Failed => "step failed",
        StepState::Skipped => "step skipped by configuration",
        StepState::Canceled => "step canceled",
    }
}

#[inline]
pub fn log_progress<R: View>(r: R) {
    let msg = message_for(r.state());

    match r.state() {
        StepState::NotStarted => trace!(step = r.as_step(), "{msg}"),
        StepState::Running => {
            trace!(
                step = r.as_step(),
                total = r.total(),
                successes = r.successes(),
                failures = r.failures(),
                "{msg}"
            )
        }
        StepState::Skipped => debug!(step = r.as_step(), "{msg}"),
        StepState::Success => info!(
            step = r.as_step(),
            total = r.total(),
            successes = r.successes(),
            failures = r.failures(),
            "{msg}"
        ),
        StepState::Canceled => warn!(step = r.as_step(), successes = r.successes(), "{msg}"),
        StepState::Failed => error!(
            step = r.as_step(),
            failures = r.failures(),
            reason = r.last_error(),
            "{msg}"
        ),
    }
}
