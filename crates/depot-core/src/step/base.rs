use std::collections::BTreeMap;
use std::sync::Arc;

use depot_model::{PluginConfig, ProgressReport, Repository, StepId, StepState};
use tracing::warn;

use super::{Conduit, Step, StepContext};
use crate::error::StepError;

/// State shared by every step: identity, lifecycle state, counters, children and context.
pub struct StepCore {
    step_id: StepId,
    state: StepState,
    ctx: Arc<StepContext>,
    children: Vec<Box<dyn Step>>,
    total: u64,
    successes: u64,
    failures: u64,
    error_details: Vec<String>,
}

impl StepCore {
    /// Core with an empty child context.
    pub fn new(step_id: impl Into<StepId>) -> Self {
        Self::with_context(step_id, StepContext::child())
    }

    pub fn with_context(step_id: impl Into<StepId>, ctx: StepContext) -> Self {
        Self {
            step_id: step_id.into(),
            state: StepState::NotStarted,
            ctx: Arc::new(ctx),
            children: Vec::new(),
            total: 1,
            successes: 0,
            failures: 0,
            error_details: Vec::new(),
        }
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    pub fn context(&self) -> &StepContext {
        &self.ctx
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn error_details(&self) -> &[String] {
        &self.error_details
    }

    pub fn children(&self) -> &[Box<dyn Step>] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Box<dyn Step>] {
        &mut self.children
    }

    /// Append a child and attach its context to this step's context.
    pub fn add_child(&mut self, child: Box<dyn Step>) {
        if !child.core().ctx.attach(self.ctx.clone()) {
            warn!(
                parent = %self.step_id,
                child = %child.core().step_id,
                "child step already has a parent, keeping the original"
            );
        }
        self.children.push(child);
    }

    pub fn repo(&self) -> Result<Arc<Repository>, StepError> {
        self.ctx.repo().ok_or_else(|| self.detached())
    }

    pub fn conduit(&self) -> Result<Arc<dyn Conduit>, StepError> {
        self.ctx.conduit().ok_or_else(|| self.detached())
    }

    pub fn config(&self) -> Result<Arc<PluginConfig>, StepError> {
        self.ctx.config().ok_or_else(|| self.detached())
    }

    pub fn plugin_type(&self) -> Option<String> {
        self.ctx.plugin_type()
    }

    pub fn is_canceled(&self) -> bool {
        self.ctx.is_canceled()
    }

    fn detached(&self) -> StepError {
        StepError::Detached(self.step_id.clone())
    }

    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    pub fn record_failure(&mut self, detail: impl Into<String>) {
        self.failures += 1;
        self.error_details.push(detail.into());
    }

    pub(crate) fn push_error(&mut self, detail: impl Into<String>) {
        self.error_details.push(detail.into());
    }

    pub(crate) fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    /// Change the lifecycle state and push progress.
    pub(crate) fn set_state(&mut self, state: StepState) {
        self.state = state;
        self.report_progress();
    }

    /// Change the lifecycle state without calling the listener.
    pub(crate) fn set_state_silent(&mut self, state: StepState) {
        self.state = state;
    }

    /// Snapshot of this step and its descendants.
    pub fn progress_report(&self) -> ProgressReport {
        ProgressReport {
            step_id: self.step_id.clone(),
            state: self.state,
            total: self.total,
            successes: self.successes,
            failures: self.failures,
            error_details: self.error_details.clone(),
            children: self
                .children
                .iter()
                .map(|c| c.core().progress_report())
                .collect(),
        }
    }

    /// Push the current snapshot to the run's listener, if any.
    pub fn report_progress(&self) {
        if let Some(listener) = self.ctx.listener() {
            listener.on_progress(&self.progress_report());
        }
    }

    /// Direct children by step id.
    pub fn summary(&self) -> BTreeMap<StepId, StepState> {
        self.children
            .iter()
            .map(|c| (c.core().step_id.clone(), c.core().state))
            .collect()
    }
}

impl std::fmt::Debug for StepCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepCore")
            .field("step_id", &self.step_id)
            .field("state", &self.state)
            .field("total", &self.total)
            .field("successes", &self.successes)
            .field("failures", &self.failures)
            .field("children", &self.children.len())
            .finish()
    }
}
