use depot_model::StepState;
use tracing::{debug, instrument, warn};

use super::Step;
use crate::error::StepError;

/// Drive one step and its subtree through the lifecycle.
///
/// Order: skip check, total, `Running`, `initialize`, children, `process_main`, `finalize`.
/// Once cancellation is observed no further hook runs.
/// The step ends in `Skipped`, `Success`, `Canceled` or `Failed`. A failing child fails its
/// parent and no further siblings are started.
#[instrument(level = "debug", skip_all, fields(step = %step.core().step_id()))]
pub fn process(step: &mut dyn Step) -> Result<(), StepError> {
    match step.is_skipped() {
        Ok(true) => {
            debug!("step skipped");
            step.core_mut().set_state(StepState::Skipped);
            return Ok(());
        }
        Ok(false) => {}
        Err(e) => return fail(step, e),
    }

    match run_hooks(step) {
        Ok(()) => {
            let state = if step.core().is_canceled() {
                StepState::Canceled
            } else {
                StepState::Success
            };
            step.core_mut().set_state(state);
            Ok(())
        }
        Err(e) => fail(step, e),
    }
}

fn run_hooks(step: &mut dyn Step) -> Result<(), StepError> {
    let total = step.total()?;
    step.core_mut().set_total(total);
    step.core_mut().set_state(StepState::Running);

    step.initialize()?;
    process_children(step)?;
    if step.core().is_canceled() {
        debug!("canceled, skipping own processing");
        return Ok(());
    }
    step.process_main()?;
    if step.core().is_canceled() {
        debug!("canceled, skipping finalize");
        return Ok(());
    }
    step.finalize()
}

fn process_children(step: &mut dyn Step) -> Result<(), StepError> {
    for i in 0..step.core().children().len() {
        if step.core().is_canceled() {
            debug!(remaining = step.core().children().len() - i, "canceled, not starting further children");
            break;
        }
        let child = &mut step.core_mut().children_mut()[i];
        if let Err(e) = process(child.as_mut()) {
            return Err(StepError::ChildFailed {
                step_id: child.core().step_id().to_string(),
                reason: e.to_string(),
            });
        }
    }
    Ok(())
}

fn fail(step: &mut dyn Step, err: StepError) -> Result<(), StepError> {
    warn!(error = %err, "step failed");
    let core = step.core_mut();
    core.push_error(err.to_string());
    core.set_state(StepState::Failed);
    Err(err)
}
