use depot_model::ProgressReport;

/// Receives a progress snapshot whenever a step changes state or processes a unit.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, report: &ProgressReport);
}
