//! The pipeline runner: drives a script document through every phase.
//!
//! Phases run strictly in order. Each one applies its providers, merges
//! their deltas into the document, checks that the merge only added
//! artifacts, then validates and persists the document before the next
//! phase starts. Per-item failures are collected; structural problems stop
//! the run.

pub mod apply;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, Instrument};

use shortgen_media::{check_preconditions, CompositionOptions, CompositionOutcome, MediaError, SubtitleMode};
use shortgen_models::{
    ensure_additive, AssetKind, PipelinePhase, RunId, RunLayout, ScriptDocument, VisualType, WorkItem,
};
use shortgen_providers::AssetProvider;

use crate::composer::Composer;
use crate::config::PipelineConfig;
use crate::error::{ConfigurationError, PipelineError, PipelineResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::store::DocumentStore;

pub use apply::{
    apply_provider, existing_artifact, ApplyContext, ApplyOutcome, ArtifactDelta, ItemCounts, ItemOutcome,
    PerSceneError,
};

/// Providers keyed by the kind of asset they produce.
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: Vec<Arc<dyn AssetProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `provider`, replacing any earlier one of the same kind.
    pub fn with(mut self, provider: Arc<dyn AssetProvider>) -> Self {
        let kind = provider.kind();
        self.providers.retain(|p| p.kind() != kind);
        self.providers.push(provider);
        self
    }

    pub fn get(&self, kind: AssetKind) -> Option<&Arc<dyn AssetProvider>> {
        self.providers.iter().find(|p| p.kind() == kind)
    }
}

/// Per-invocation options.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub skip_existing: bool,
    pub include_music: bool,
    /// Overrides the document's own subtitle flag.
    pub subtitles: Option<SubtitleMode>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            skip_existing: true,
            include_music: true,
            subtitles: None,
        }
    }
}

impl RunOptions {
    pub fn composition(&self, doc: &ScriptDocument, config: &PipelineConfig) -> CompositionOptions {
        let subtitles = self.subtitles.unwrap_or(if doc.subtitles {
            SubtitleMode::Burn
        } else {
            SubtitleMode::Off
        });
        CompositionOptions {
            subtitles,
            include_narration: true,
            include_music: self.include_music,
            duration_tolerance: config.duration_tolerance,
        }
    }
}

/// What one phase did.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReport {
    pub phase: PipelinePhase,
    pub counts: ItemCounts,
    pub errors: Vec<PerSceneError>,
    pub duration_secs: f64,
    /// Cancellation cut the phase short; the document kept its earlier tag.
    pub interrupted: bool,
}

impl PhaseReport {
    fn new(phase: PipelinePhase) -> Self {
        Self {
            phase,
            counts: ItemCounts::default(),
            errors: Vec::new(),
            duration_secs: 0.0,
            interrupted: false,
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{}: {} generated, {} skipped, {} failed, {} cancelled",
            self.phase,
            self.counts.generated,
            self.counts.skipped,
            self.counts.failed,
            self.counts.cancelled
        )
    }
}

/// Everything a run produced, including how it ended.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: RunId,
    pub document: ScriptDocument,
    pub phases: Vec<PhaseReport>,
    pub composition: Option<CompositionOutcome>,
    /// Why the run stopped early, if it did.
    pub error: Option<PipelineError>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.document.phase.is_terminal()
    }

    pub fn errors(&self) -> impl Iterator<Item = &PerSceneError> {
        self.phases.iter().flat_map(|p| p.errors.iter())
    }

    pub fn totals(&self) -> ItemCounts {
        let mut totals = ItemCounts::default();
        for phase in &self.phases {
            totals.merge(&phase.counts);
        }
        totals
    }
}

/// Provider kinds a phase applies, in order.
pub fn phase_kinds(phase: PipelinePhase, options: &RunOptions) -> Vec<AssetKind> {
    match phase {
        PipelinePhase::Scheduled | PipelinePhase::Composed => Vec::new(),
        PipelinePhase::ImagesAcquired => vec![AssetKind::WebImage, AssetKind::GeneratedImage],
        PipelinePhase::VideosGenerated => vec![AssetKind::GeneratedVideo],
        PipelinePhase::NarrationGenerated => vec![AssetKind::Narration],
        PipelinePhase::MusicGenerated if options.include_music => vec![AssetKind::Music],
        PipelinePhase::MusicGenerated => Vec::new(),
    }
}

/// Provider kinds that will have to make at least one external call for
/// `doc`. Used to demand API keys only where they are needed.
pub async fn required_kinds(doc: &ScriptDocument, layout: &RunLayout, options: &RunOptions) -> Vec<AssetKind> {
    let mut required = Vec::new();
    for phase in PipelinePhase::ORDER {
        for kind in phase_kinds(*phase, options) {
            let items: Vec<WorkItem> = match kind {
                // Stills may not exist yet, so count every motion scene.
                AssetKind::GeneratedVideo => doc
                    .scenes
                    .iter()
                    .filter(|s| s.visual_type == VisualType::GeneratedVideo)
                    .map(|s| WorkItem::Scene(s.index))
                    .collect(),
                other => shortgen_providers::responsibilities(other, doc),
            };

            let mut needed = false;
            for item in items {
                let Some(slot) = kind.slot_for(item) else { continue };
                if !options.skip_existing || existing_artifact(doc, layout, slot).await.is_none() {
                    needed = true;
                    break;
                }
            }
            if needed {
                required.push(kind);
            }
        }
    }
    required
}

/// Motion scenes that reach the videos phase without a still and without a
/// clip. The video provider never sees them.
fn scenes_missing_stills(doc: &ScriptDocument) -> Vec<PerSceneError> {
    doc.scenes
        .iter()
        .filter(|s| s.visual_type == VisualType::GeneratedVideo)
        .filter(|s| s.image_path.is_none() && s.video_path.is_none())
        .map(|s| PerSceneError {
            scene_index: Some(s.index),
            provider: AssetKind::GeneratedVideo,
            cause: "no source image".to_string(),
            attempts: 0,
        })
        .collect()
}

pub struct PipelineRunner {
    config: PipelineConfig,
    layout: RunLayout,
    store: DocumentStore,
    providers: ProviderSet,
    composer: Arc<dyn Composer>,
    cancel: watch::Receiver<bool>,
    run_id: RunId,
}

impl PipelineRunner {
    pub fn new(
        config: PipelineConfig,
        layout: RunLayout,
        store: DocumentStore,
        providers: ProviderSet,
        composer: Arc<dyn Composer>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            layout,
            store,
            providers,
            composer,
            cancel,
            run_id: RunId::new(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Drive `doc` through every remaining phase and compose it.
    pub async fn run(&self, doc: ScriptDocument, options: &RunOptions) -> RunSummary {
        let logger = RunLogger::new(&self.run_id, &doc.title);
        let span = logger.create_span();
        self.run_inner(doc, options, logger).instrument(span).await
    }

    async fn run_inner(&self, mut doc: ScriptDocument, options: &RunOptions, logger: RunLogger) -> RunSummary {
        logger.log_start(&format!(
            "{} scenes, {}s, {} (skip existing: {})",
            doc.scenes.len(),
            doc.target_duration_seconds,
            doc.visual_mode,
            options.skip_existing
        ));

        let mut phases = Vec::new();
        let mut composition = None;
        let result = self
            .drive(&mut doc, options, &logger, &mut phases, &mut composition)
            .await;

        for report in &phases {
            logger.log_phase_done(report.phase, &report.summary_line());
        }
        match &result {
            Ok(()) => logger.log_completion(&format!("phase {}", doc.phase)),
            Err(e) => logger.log_error(doc.phase, &format!("{} ({})", e, e.kind())),
        }

        RunSummary {
            run_id: self.run_id.clone(),
            document: doc,
            phases,
            composition,
            error: result.err(),
        }
    }

    async fn drive(
        &self,
        doc: &mut ScriptDocument,
        options: &RunOptions,
        logger: &RunLogger,
        phases: &mut Vec<PhaseReport>,
        composition: &mut Option<CompositionOutcome>,
    ) -> PipelineResult<()> {
        doc.validate()?;
        for dir in self.layout.directories() {
            tokio::fs::create_dir_all(&dir).await?;
        }

        for phase in PipelinePhase::ORDER.iter().copied() {
            match phase {
                PipelinePhase::Scheduled => continue,
                PipelinePhase::Composed => {
                    *composition = Some(self.compose(doc, options, logger).await?);
                }
                _ => {
                    let report = self.run_phase(doc, phase, options, logger).await?;
                    let interrupted = report.interrupted;
                    phases.push(report);
                    if interrupted {
                        return Err(PipelineError::Cancelled { phase });
                    }
                }
            }
        }
        Ok(())
    }

    /// Run one generation phase, merge its deltas and persist the document.
    ///
    /// A cancelled phase still returns its report, with `interrupted` set.
    pub async fn run_phase(
        &self,
        doc: &mut ScriptDocument,
        phase: PipelinePhase,
        options: &RunOptions,
        logger: &RunLogger,
    ) -> PipelineResult<PhaseReport> {
        doc.validate()?;
        let started = Instant::now();
        let mut report = PhaseReport::new(phase);

        if phase == PipelinePhase::VideosGenerated {
            for err in scenes_missing_stills(doc) {
                logger.log_warning(phase, &err.to_string());
                metrics::record_item(err.provider, ItemOutcome::Failed.as_str(), 0);
                report.counts.record(ItemOutcome::Failed);
                report.errors.push(err);
            }
        }

        let ctx = ApplyContext {
            layout: &self.layout,
            config: &self.config,
            cancel: &self.cancel,
            skip_existing: options.skip_existing,
        };

        for kind in phase_kinds(phase, options) {
            let Some(provider) = self.providers.get(kind) else {
                if shortgen_providers::responsibilities(kind, doc).is_empty() {
                    continue;
                }
                return Err(ConfigurationError::invalid(format!("no {kind} provider configured")).into());
            };

            let items = provider.work_items(doc).len();
            logger.log_phase_start(phase, items);

            let outcome = apply_provider(provider.as_ref(), doc, &ctx).await;
            self.merge(doc, &outcome.deltas)?;
            for err in &outcome.errors {
                logger.log_warning(phase, &err.to_string());
            }
            report.counts.merge(&outcome.counts);
            report.errors.extend(outcome.errors);
        }

        report.duration_secs = started.elapsed().as_secs_f64();
        metrics::record_phase(phase, report.duration_secs);

        if self.is_cancelled() || report.counts.cancelled > 0 {
            // Keep what finished; the phase tag stays where it was.
            self.store.save(doc).await?;
            report.interrupted = true;
            return Ok(report);
        }

        // A resumed run re-walks earlier phases; the tag never moves back.
        doc.phase = doc.phase.max(phase);
        self.store.save(doc).await?;
        info!(phase = %phase, "{}", report.summary_line());
        Ok(report)
    }

    fn merge(&self, doc: &mut ScriptDocument, deltas: &[ArtifactDelta]) -> PipelineResult<()> {
        let before = doc.clone();
        for delta in deltas {
            if !delta.slot.set(doc, delta.path.clone()) {
                return Err(PipelineError::Validation(
                    shortgen_models::ValidationError::SceneStructureChanged(format!(
                        "{} does not exist in the document",
                        delta.slot
                    )),
                ));
            }
        }
        ensure_additive(&before, doc)?;
        Ok(())
    }

    /// Check preconditions, render the final video and persist the result.
    pub async fn compose(
        &self,
        doc: &mut ScriptDocument,
        options: &RunOptions,
        logger: &RunLogger,
    ) -> PipelineResult<CompositionOutcome> {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled {
                phase: PipelinePhase::Composed,
            });
        }

        let composition_options = options.composition(doc, &self.config);
        check_preconditions(doc, &composition_options).await?;

        logger.log_phase_start(PipelinePhase::Composed, doc.scenes.len());
        let started = Instant::now();
        let outcome = self
            .composer
            .compose(doc, &composition_options)
            .await
            .map_err(|e| match e {
                // FFmpeg killed by the cancel watch.
                MediaError::Cancelled => PipelineError::Cancelled {
                    phase: PipelinePhase::Composed,
                },
                other => other.into(),
            })?;
        metrics::record_compose(started.elapsed().as_secs_f64());

        for warning in &outcome.warnings {
            logger.log_warning(PipelinePhase::Composed, warning);
        }

        outcome.apply_to(doc);
        doc.phase = PipelinePhase::Composed;
        self.store.save(doc).await?;
        Ok(outcome)
    }
}
