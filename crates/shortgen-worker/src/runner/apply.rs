//! Generic driver applying one provider to a document.
//!
//! Handles skip-existing, bounded fan-out, per-attempt timeouts, retries
//! and cancellation for every provider. It never mutates the document; the
//! caller merges the returned deltas.

use futures::future::join_all;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use shortgen_media::is_nonempty_file;
use shortgen_models::{ArtifactSlot, AssetKind, RunLayout, ScriptDocument, WorkItem};
use shortgen_providers::{AssetProvider, GenerationRequest, ProviderError};

use crate::config::PipelineConfig;
use crate::metrics;
use crate::retry::{retry_async, RetryResult};

/// What happened to one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Generated,
    Skipped,
    Failed,
    Cancelled,
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Generated => "generated",
            ItemOutcome::Skipped => "skipped",
            ItemOutcome::Failed => "failed",
            ItemOutcome::Cancelled => "cancelled",
        }
    }
}

/// A failed item. Recorded in the report; never aborts the phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PerSceneError {
    /// Absent for document-scoped items.
    pub scene_index: Option<u32>,
    pub provider: AssetKind,
    pub cause: String,
    pub attempts: u32,
}

impl std::fmt::Display for PerSceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scene_index {
            Some(index) => write!(f, "{} failed for scene {}: {}", self.provider, index, self.cause),
            None => write!(f, "{} failed: {}", self.provider, self.cause),
        }
    }
}

/// One slot assignment produced by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDelta {
    pub slot: ArtifactSlot,
    pub path: PathBuf,
}

/// Item counts for one application of one or more providers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemCounts {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl ItemCounts {
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Generated => self.generated += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::Cancelled => self.cancelled += 1,
        }
    }

    pub fn merge(&mut self, other: &ItemCounts) {
        self.generated += other.generated;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.cancelled += other.cancelled;
    }

    pub fn total(&self) -> usize {
        self.generated + self.skipped + self.failed + self.cancelled
    }
}

/// Result of applying one provider.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub deltas: Vec<ArtifactDelta>,
    pub counts: ItemCounts,
    pub errors: Vec<PerSceneError>,
}

/// Shared inputs for [`apply_provider`].
pub struct ApplyContext<'a> {
    pub layout: &'a RunLayout,
    pub config: &'a PipelineConfig,
    pub cancel: &'a watch::Receiver<bool>,
    pub skip_existing: bool,
}

impl ApplyContext<'_> {
    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

enum ItemResult {
    Generated { delta: ArtifactDelta, attempts: u32 },
    Skipped(Option<ArtifactDelta>),
    Failed(PerSceneError),
    Cancelled,
}

/// Whether `slot` already holds a usable artifact. Returns the adoption
/// delta when the file was found at the layout path but not recorded.
pub async fn existing_artifact(
    doc: &ScriptDocument,
    layout: &RunLayout,
    slot: ArtifactSlot,
) -> Option<Option<ArtifactDelta>> {
    if let Some(recorded) = slot.get(doc) {
        if is_nonempty_file(recorded).await {
            return Some(None);
        }
    }
    let expected = layout.path_for(slot);
    if is_nonempty_file(&expected).await {
        let adopt = (slot.get(doc) != Some(expected.as_path())).then(|| ArtifactDelta {
            slot,
            path: expected,
        });
        return Some(adopt);
    }
    None
}

/// Apply `provider` to every item it is responsible for in `doc`.
pub async fn apply_provider(
    provider: &dyn AssetProvider,
    doc: &ScriptDocument,
    ctx: &ApplyContext<'_>,
) -> ApplyOutcome {
    let kind = provider.kind();
    let items = provider.work_items(doc);
    let semaphore = Semaphore::new(ctx.config.max_scene_parallel.max(1));

    debug!(provider = kind.as_str(), "Applying to {} items", items.len());

    let futures = items
        .iter()
        .map(|&item| run_item(provider, kind, doc, item, ctx, &semaphore));
    let results = join_all(futures).await;

    let mut outcome = ApplyOutcome::default();
    for result in results {
        let (item_outcome, attempts) = match result {
            ItemResult::Generated { delta, attempts } => {
                outcome.deltas.push(delta);
                (ItemOutcome::Generated, attempts)
            }
            ItemResult::Skipped(adopt) => {
                outcome.deltas.extend(adopt);
                (ItemOutcome::Skipped, 0)
            }
            ItemResult::Failed(err) => {
                let attempts = err.attempts;
                outcome.errors.push(err);
                (ItemOutcome::Failed, attempts)
            }
            ItemResult::Cancelled => (ItemOutcome::Cancelled, 0),
        };
        outcome.counts.record(item_outcome);
        metrics::record_item(kind, item_outcome.as_str(), attempts);
    }

    info!(
        provider = kind.as_str(),
        generated = outcome.counts.generated,
        skipped = outcome.counts.skipped,
        failed = outcome.counts.failed,
        cancelled = outcome.counts.cancelled,
        "Provider pass finished"
    );
    outcome
}

async fn run_item(
    provider: &dyn AssetProvider,
    kind: AssetKind,
    doc: &ScriptDocument,
    item: WorkItem,
    ctx: &ApplyContext<'_>,
    semaphore: &Semaphore,
) -> ItemResult {
    let failed = |cause: String, attempts: u32| {
        ItemResult::Failed(PerSceneError {
            scene_index: item.scene_index(),
            provider: kind,
            cause,
            attempts,
        })
    };

    let Some(slot) = kind.slot_for(item) else {
        return failed(format!("{kind} has no artifact slot for {item}"), 0);
    };

    if ctx.skip_existing {
        if let Some(adopt) = existing_artifact(doc, ctx.layout, slot).await {
            debug!(provider = kind.as_str(), "Skipping {}: artifact exists", item);
            return ItemResult::Skipped(adopt);
        }
    }

    let Ok(_permit) = semaphore.acquire().await else {
        return ItemResult::Cancelled;
    };

    let output = ctx.layout.path_for(slot);
    let request = GenerationRequest::new(doc, item, &output);
    let timeout = ctx.config.item_timeout;
    let retry = ctx.config.retry(format!("{kind} {item}"));

    let result = retry_async(
        &retry,
        || attempt(provider, &request, timeout),
        ProviderError::is_retryable,
        || ctx.is_cancelled(),
    )
    .await;

    match result {
        RetryResult::Success { attempts, .. } => {
            if !is_nonempty_file(&output).await {
                return failed("provider reported success but wrote no file".to_string(), attempts);
            }
            ItemResult::Generated {
                delta: ArtifactDelta { slot, path: output },
                attempts,
            }
        }
        RetryResult::Failed { error, attempts } => {
            warn!(
                provider = kind.as_str(),
                scene_index = item.scene_index(),
                "{} failed after {} attempt(s): {}",
                item,
                attempts,
                error
            );
            failed(error.to_string(), attempts)
        }
        RetryResult::Stopped { attempts } => {
            debug!(provider = kind.as_str(), "{} cancelled after {} attempt(s)", item, attempts);
            ItemResult::Cancelled
        }
    }
}

async fn attempt(
    provider: &dyn AssetProvider,
    request: &GenerationRequest<'_>,
    timeout: Duration,
) -> Result<(), ProviderError> {
    match tokio::time::timeout(timeout, provider.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout.as_secs())),
    }
}
