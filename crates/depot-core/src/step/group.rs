use super::{Step, StepContext, StepCore};

/// Step that only orchestrates its children.
#[derive(Debug)]
pub struct GroupStep {
    core: StepCore,
}

impl GroupStep {
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            core: StepCore::new(step_id),
        }
    }

    pub fn with_context(step_id: impl Into<String>, ctx: StepContext) -> Self {
        Self {
            core: StepCore::with_context(step_id, ctx),
        }
    }

    pub fn with_child(mut self, child: impl Step + 'static) -> Self {
        self.core.add_child(Box::new(child));
        self
    }

    pub fn add_child(&mut self, child: Box<dyn Step>) {
        self.core.add_child(child);
    }
}

impl Step for GroupStep {
    fn core(&self) -> &StepCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StepCore {
        &mut self.core
    }
}
