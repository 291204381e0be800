//! Structured run logging.
//!
//! Every lifecycle event of a pipeline run carries the run id and the phase
//! so interleaved runs stay separable in JSON logs.

use tracing::{error, info, warn, Span};

use shortgen_models::{PipelinePhase, RunId};

/// Logger for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    title: String,
}

impl RunLogger {
    pub fn new(run_id: &RunId, title: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            title: title.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, title = %self.title, "Run started: {}", message);
    }

    pub fn log_phase_start(&self, phase: PipelinePhase, items: usize) {
        info!(
            run_id = %self.run_id,
            phase = %phase,
            items,
            "Phase started"
        );
    }

    pub fn log_phase_done(&self, phase: PipelinePhase, message: &str) {
        info!(run_id = %self.run_id, phase = %phase, "Phase done: {}", message);
    }

    pub fn log_warning(&self, phase: PipelinePhase, message: &str) {
        warn!(run_id = %self.run_id, phase = %phase, "Run warning: {}", message);
    }

    pub fn log_error(&self, phase: PipelinePhase, message: &str) {
        error!(run_id = %self.run_id, phase = %phase, "Run error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, title = %self.title, "Run completed: {}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Span wrapping the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id, title = %self.title)
    }
}
