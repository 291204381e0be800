//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.

use metrics::{counter, histogram};

use shortgen_models::{AssetKind, PipelinePhase};

/// Metric names as constants for consistency.
pub mod names {
    pub const PROVIDER_ITEMS_TOTAL: &str = "shortgen_provider_items_total";
    pub const PROVIDER_ATTEMPTS_TOTAL: &str = "shortgen_provider_attempts_total";
    pub const PHASE_DURATION_SECONDS: &str = "shortgen_phase_duration_seconds";
    pub const COMPOSE_DURATION_SECONDS: &str = "shortgen_compose_duration_seconds";
}

/// Record the outcome of one provider work item.
pub fn record_item(provider: AssetKind, outcome: &'static str, attempts: u32) {
    let labels = [("provider", provider.as_str()), ("outcome", outcome)];
    counter!(names::PROVIDER_ITEMS_TOTAL, &labels).increment(1);
    if attempts > 0 {
        counter!(names::PROVIDER_ATTEMPTS_TOTAL, "provider" => provider.as_str()).increment(u64::from(attempts));
    }
}

pub fn record_phase(phase: PipelinePhase, duration_secs: f64) {
    histogram!(names::PHASE_DURATION_SECONDS, "phase" => phase.as_str()).record(duration_secs);
}

pub fn record_compose(duration_secs: f64) {
    histogram!(names::COMPOSE_DURATION_SECONDS).record(duration_secs);
}
