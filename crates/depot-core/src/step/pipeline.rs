use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use depot_model::{FinalReport, PluginConfig, Repository, StepState};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use super::{CancelHandle, Conduit, GroupStep, Step, StepContext, process};
use crate::dispatch::panic_reason;
use crate::error::StepError;

/// Which repository operation a pipeline performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Sync,
    Publish,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Sync => "sync",
            PipelineKind::Publish => "publish",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sync or publish run: a root step, its run id and its cancellation token.
pub struct Pipeline {
    run_id: Uuid,
    kind: PipelineKind,
    root: Box<dyn Step>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn sync(repo: Repository, conduit: Arc<dyn Conduit>, config: PluginConfig) -> Self {
        Self::rooted(PipelineKind::Sync, StepContext::root(repo, conduit, config))
    }

    pub fn publish(repo: Repository, conduit: Arc<dyn Conduit>, config: PluginConfig) -> Self {
        Self::rooted(PipelineKind::Publish, StepContext::root(repo, conduit, config))
    }

    /// Pipeline whose root is a [`GroupStep`] over a prepared root context
    /// (for example one carrying a listener or a plugin type).
    pub fn from_context(kind: PipelineKind, ctx: StepContext) -> Result<Self, StepError> {
        if !ctx.is_root() {
            return Err(StepError::Detached(kind.as_str().to_string()));
        }
        Ok(Self::rooted(kind, ctx))
    }

    /// Pipeline over a custom root step. The root must own a root context.
    pub fn with_root(kind: PipelineKind, root: Box<dyn Step>) -> Result<Self, StepError> {
        let ctx = root.core().context();
        let cancel = match ctx.cancel_token() {
            Some(token) if ctx.is_root() => token,
            _ => return Err(StepError::Detached(root.core().step_id().to_string())),
        };
        Ok(Self {
            run_id: Uuid::new_v4(),
            kind,
            root,
            cancel,
        })
    }

    fn rooted(kind: PipelineKind, ctx: StepContext) -> Self {
        let cancel = ctx.cancel_token().unwrap_or_default();
        Self {
            run_id: Uuid::new_v4(),
            kind,
            root: Box::new(GroupStep::with_context(kind.as_str(), ctx)),
            cancel,
        }
    }

    pub fn add_step(&mut self, step: impl Step + 'static) -> &mut Self {
        self.root.core_mut().add_child(Box::new(step));
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn root(&self) -> &dyn Step {
        self.root.as_ref()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(self.cancel.clone())
    }

    /// Process the whole tree and build the final report.
    ///
    /// Never fails: step errors and panics end up as a failed root in the report.
    pub fn run(&mut self) -> FinalReport {
        let span = info_span!("pipeline", run_id = %self.run_id, kind = %self.kind);
        let _enter = span.enter();
        info!(steps = self.root.core().children().len(), "pipeline started");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| process(self.root.as_mut())));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "pipeline finished with a failed step"),
            Err(payload) => {
                let reason = panic_reason(payload);
                error!(%reason, "step panicked");
                mark_panicked(self.root.as_mut(), &reason);
            }
        }

        let report = self.report();
        info!(
            success = report.success_flag,
            canceled = report.canceled_flag,
            "pipeline finished"
        );
        report
    }

    fn report(&self) -> FinalReport {
        let core = self.root.core();
        FinalReport {
            run_id: self.run_id.to_string(),
            success_flag: core.state() != StepState::Failed,
            canceled_flag: self.cancel.is_cancelled(),
            summary: core.summary(),
            details: core.progress_report(),
        }
    }
}

/// Steps left `Running` by a panic become `Failed`; the root always does and records the reason.
///
/// The listener is not called here: it may be what panicked.
fn mark_panicked(root: &mut dyn Step, reason: &str) {
    fail_running(root);
    let core = root.core_mut();
    core.push_error(format!("step panicked: {reason}"));
    core.set_state_silent(StepState::Failed);
}

fn fail_running(step: &mut dyn Step) {
    for child in step.core_mut().children_mut() {
        fail_running(child.as_mut());
    }
    if step.core().state() == StepState::Running {
        step.core_mut().set_state_silent(StepState::Failed);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use depot_model::{ProgressReport, Unit};
    use serde_json::{Map, json};

    use super::*;
    use crate::step::{
        FailurePolicy, MemoryConduit, ProgressListener, StepCore, UnitStep, handler_fn,
    };

    fn units(n: usize) -> Arc<MemoryConduit> {
        Arc::new(MemoryConduit::new(
            (0..n)
                .map(|i| {
                    let mut key = Map::new();
                    key.insert("name".into(), json!(format!("pkg-{i}")));
                    Unit::new("rpm", key)
                })
                .collect(),
        ))
    }

    fn ok_handler() -> impl crate::step::UnitHandler + 'static {
        handler_fn(|_: &Unit, _: &StepCore| Ok(()))
    }

    struct FailsItself(StepCore);

    impl Step for FailsItself {
        fn core(&self) -> &StepCore {
            &self.0
        }
        fn core_mut(&mut self) -> &mut StepCore {
            &mut self.0
        }
        fn finalize(&mut self) -> Result<(), StepError> {
            Err(StepError::Hook("could not write repomd.xml".into()))
        }
    }

    #[test]
    fn successful_run() {
        let mut p = Pipeline::sync(Repository::new("zoo"), units(3), PluginConfig::new());
        p.add_step(UnitStep::new("packages", ["rpm"], ok_handler()))
            .add_step(GroupStep::new("cleanup"));

        let report = p.run();
        assert!(report.success_flag);
        assert!(!report.canceled_flag);
        assert_eq!(report.run_id, p.run_id().to_string());
        assert_eq!(report.summary.len(), 2);
        assert_eq!(report.steps_in(StepState::Success), vec!["cleanup", "packages"]);
        assert_eq!(report.details.step_id, "sync");
        assert_eq!(report.details.find("packages").unwrap().successes, 3);
    }

    #[test]
    fn root_failure_fails_run_even_with_successful_children() {
        let ctx = StepContext::root(Repository::new("zoo"), units(1), PluginConfig::new());
        let mut root = FailsItself(StepCore::with_context("publish", ctx));
        root.0
            .add_child(Box::new(UnitStep::new("packages", ["rpm"], ok_handler())));

        let mut p = Pipeline::with_root(PipelineKind::Publish, Box::new(root)).unwrap();
        let report = p.run();

        assert!(!report.success_flag);
        assert_eq!(report.summary["packages"], StepState::Success);
        assert_eq!(report.details.state, StepState::Failed);
    }

    #[test]
    fn failed_child_fails_run() {
        let mut p = Pipeline::publish(Repository::new("zoo"), units(2), PluginConfig::new());
        p.add_step(
            UnitStep::new(
                "packages",
                ["rpm"],
                handler_fn(|_: &Unit, _: &StepCore| Err(StepError::Hook("disk full".into()))),
            )
            .with_policy(FailurePolicy::Abort),
        );

        let report = p.run();
        assert!(!report.success_flag);
        assert_eq!(report.summary["packages"], StepState::Failed);
    }

    #[test]
    fn panic_yields_failure_report() {
        let mut p = Pipeline::sync(Repository::new("zoo"), units(2), PluginConfig::new());
        p.add_step(UnitStep::new(
            "packages",
            ["rpm"],
            handler_fn(|_: &Unit, _: &StepCore| -> Result<(), StepError> { panic!("bad unit") }),
        ));

        let report = p.run();
        assert!(!report.success_flag);
        assert_eq!(report.details.state, StepState::Failed);
        assert_eq!(report.summary["packages"], StepState::Failed);
        assert!(
            report
                .details
                .error_details
                .iter()
                .any(|d| d.contains("bad unit"))
        );
    }

    #[test]
    fn cancel_before_run_reports_canceled() {
        let mut p = Pipeline::sync(Repository::new("zoo"), units(2), PluginConfig::new());
        p.add_step(UnitStep::new("packages", ["rpm"], ok_handler()));
        let handle = p.cancel_handle();
        handle.cancel();

        let report = p.run();
        assert!(report.success_flag);
        assert!(report.canceled_flag);
        assert_eq!(report.details.state, StepState::Canceled);
        assert_eq!(report.summary["packages"], StepState::NotStarted);
    }

    #[test]
    fn detached_root_is_rejected() {
        let root = GroupStep::new("sync");
        assert!(matches!(
            Pipeline::with_root(PipelineKind::Sync, Box::new(root)),
            Err(StepError::Detached(_))
        ));
        assert!(Pipeline::from_context(PipelineKind::Sync, StepContext::child()).is_err());
    }

    #[test]
    fn panicking_listener_still_yields_report() {
        struct Broken;
        impl ProgressListener for Broken {
            fn on_progress(&self, _: &ProgressReport) {
                panic!("progress sink closed");
            }
        }

        let ctx = StepContext::root(Repository::new("zoo"), units(2), PluginConfig::new())
            .with_listener(Arc::new(Broken));
        let mut p = Pipeline::from_context(PipelineKind::Sync, ctx).unwrap();
        p.add_step(UnitStep::new("packages", ["rpm"], ok_handler()));

        let report = panic::catch_unwind(AssertUnwindSafe(|| p.run()))
            .expect("run must not panic");
        assert!(!report.success_flag);
        assert_eq!(report.details.state, StepState::Failed);
        assert!(
            report
                .details
                .error_details
                .iter()
                .any(|d| d.contains("progress sink closed"))
        );
    }

    #[test]
    fn listener_sees_unit_progress() {
        #[derive(Default)]
        struct Last(Mutex<Vec<ProgressReport>>);
        impl ProgressListener for Last {
            fn on_progress(&self, report: &ProgressReport) {
                self.0.lock().unwrap().push(report.clone());
            }
        }

        let listener = Arc::new(Last::default());
        let ctx = StepContext::root(Repository::new("zoo").with_count("rpm", 3), units(3), PluginConfig::new())
            .with_listener(listener.clone());
        let mut p = Pipeline::from_context(PipelineKind::Sync, ctx).unwrap();
        p.add_step(UnitStep::new("packages", ["rpm"], ok_handler()));
        p.run();

        let seen = listener.0.lock().unwrap();
        let unit_updates: Vec<u64> = seen
            .iter()
            .filter(|r| r.step_id == "packages" && r.state == StepState::Running)
            .map(|r| r.successes)
            .collect();
        assert_eq!(unit_updates, vec![0, 1, 2, 3]);
        assert_eq!(seen.last().unwrap().step_id, "sync");
    }
}
