use depot_core::ProgressListener;
use depot_model::ProgressReport;

use crate::subscriber::view::log_progress;

/// Progress listener that writes every step update to the tracing log.
#[derive(Debug, Default)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressListener for Journal {
    fn on_progress(&self, report: &ProgressReport) {
        log_progress(report);
    }
}
