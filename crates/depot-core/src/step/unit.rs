use depot_model::{SkipList, TypeId, Unit, UnitCriteria};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{Step, StepContext, StepCore};
use crate::error::StepError;

/// What a unit step does when its handler rejects a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Count the failure and move on to the next unit.
    #[default]
    Continue,
    /// Count the failure and fail the step.
    Abort,
}

/// Per-unit work of a [`UnitStep`].
pub trait UnitHandler: Send {
    fn initialize(&mut self, _step: &StepCore) -> Result<(), StepError> {
        Ok(())
    }

    fn process_unit(&mut self, unit: &Unit, step: &StepCore) -> Result<(), StepError>;

    fn finalize(&mut self, _step: &StepCore) -> Result<(), StepError> {
        Ok(())
    }
}

/// [`UnitHandler`] backed by a closure. Built with [`handler_fn`].
pub struct FnHandler<F>(F);

impl<F> UnitHandler for FnHandler<F>
where
    F: FnMut(&Unit, &StepCore) -> Result<(), StepError> + Send,
{
    fn process_unit(&mut self, unit: &Unit, step: &StepCore) -> Result<(), StepError> {
        (self.0)(unit, step)
    }
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(&Unit, &StepCore) -> Result<(), StepError> + Send,
{
    FnHandler(f)
}

/// Step that pulls units of its types from the conduit and hands each to a [`UnitHandler`].
///
/// The skip list is read from the plugin config on first use and cached for the rest of the run.
pub struct UnitStep<H> {
    core: StepCore,
    unit_types: Vec<TypeId>,
    association_filters: Option<Map<String, Value>>,
    unit_fields: Option<Vec<String>>,
    skip: SkipList,
    skip_resolved: bool,
    policy: FailurePolicy,
    handler: H,
}

impl<H: UnitHandler> UnitStep<H> {
    pub fn new<I, T>(step_id: impl Into<String>, unit_types: I, handler: H) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeId>,
    {
        Self::with_context(step_id, StepContext::child(), unit_types, handler)
    }

    pub fn with_context<I, T>(
        step_id: impl Into<String>,
        ctx: StepContext,
        unit_types: I,
        handler: H,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeId>,
    {
        Self {
            core: StepCore::with_context(step_id, ctx),
            unit_types: unit_types.into_iter().map(Into::into).collect(),
            association_filters: None,
            unit_fields: None,
            skip: SkipList::new(),
            skip_resolved: false,
            policy: FailurePolicy::default(),
            handler,
        }
    }

    pub fn with_association_filters(mut self, filters: Map<String, Value>) -> Self {
        self.association_filters = Some(filters);
        self
    }

    pub fn with_unit_fields(mut self, fields: Vec<String>) -> Self {
        self.unit_fields = Some(fields);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn unit_types(&self) -> &[TypeId] {
        &self.unit_types
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    fn resolve_skip(&mut self) -> Result<(), StepError> {
        if !self.skip_resolved {
            self.skip = self.core.config()?.skip()?;
            self.skip_resolved = true;
        }
        Ok(())
    }

    /// What this step asks the conduit for: its types minus skipped ones, plus filters and projection.
    pub fn criteria(&mut self) -> Result<UnitCriteria, StepError> {
        self.resolve_skip()?;
        let type_ids = self.skip.retain_unskipped(&self.unit_types);
        let mut criteria = UnitCriteria::new(type_ids);
        criteria.association_filters = self.association_filters.clone();
        criteria.unit_fields = self.unit_fields.clone();
        Ok(criteria)
    }

    fn has_association_filters(&self) -> bool {
        self.association_filters
            .as_ref()
            .is_some_and(|f| !f.is_empty())
    }
}

impl<H: UnitHandler> Step for UnitStep<H> {
    fn core(&self) -> &StepCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StepCore {
        &mut self.core
    }

    fn is_skipped(&mut self) -> Result<bool, StepError> {
        self.resolve_skip()?;
        Ok(self.skip.covers(&self.unit_types))
    }

    /// Sum of the repository's per-type counts; `1` when association filters make that count meaningless.
    fn total(&mut self) -> Result<u64, StepError> {
        if self.has_association_filters() {
            return Ok(1);
        }
        self.resolve_skip()?;
        let types = self.skip.retain_unskipped(&self.unit_types);
        let repo = self.core.repo()?;
        Ok(types.iter().map(|t| repo.unit_count(t)).sum())
    }

    fn initialize(&mut self) -> Result<(), StepError> {
        self.handler.initialize(&self.core)
    }

    fn process_main(&mut self) -> Result<(), StepError> {
        let criteria = self.criteria()?;
        let conduit = self.core.conduit()?;

        for unit in conduit.get_units(&criteria)? {
            if self.core.is_canceled() {
                debug!(step = %self.core.step_id(), successes = self.core.successes(), "canceled between units");
                break;
            }
            let unit = unit?;
            match self.handler.process_unit(&unit, &self.core) {
                Ok(()) => self.core.record_success(),
                Err(e) => {
                    self.core.record_failure(e.to_string());
                    if self.policy == FailurePolicy::Abort {
                        return Err(e);
                    }
                    warn!(step = %self.core.step_id(), error = %e, "unit failed, continuing");
                }
            }
            self.core.report_progress();
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), StepError> {
        self.handler.finalize(&self.core)
    }
}
