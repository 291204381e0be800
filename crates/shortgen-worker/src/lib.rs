//! Content-to-short pipeline.
//!
//! This crate provides:
//! - The scene scheduler turning source text into a script document
//! - The pipeline runner driving providers phase by phase
//! - Document persistence with validation on every save
//! - Retry, logging and metrics shared by every phase

pub mod composer;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use composer::Composer;
pub use config::PipelineConfig;
pub use error::{ConfigurationError, PipelineError, PipelineResult};
pub use logging::RunLogger;
pub use runner::{
    required_kinds, PerSceneError, PhaseReport, PipelineRunner, ProviderSet, RunOptions, RunSummary,
};
pub use scheduler::{ScheduleRequest, SceneScheduler};
pub use store::DocumentStore;
