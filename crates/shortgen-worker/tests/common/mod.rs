//! Fakes shared by the pipeline integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

use shortgen_media::{CompositionOptions, CompositionOutcome, MediaError, MediaResult};
use shortgen_models::{AssetKind, PipelinePhase, RunLayout, ScriptDocument};
use shortgen_providers::{AssetProvider, GenerationRequest, ProviderError, ProviderResult};
use shortgen_worker::{
    Composer, DocumentStore, PipelineConfig, PipelineRunner, ProviderSet, RunLogger, RunOptions,
};

/// Provider that writes a small file per item and counts its calls.
pub struct FakeProvider {
    kind: AssetKind,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    failing_scenes: HashSet<u32>,
    /// Scenes whose calls never finish on their own.
    stalled_scenes: HashSet<u32>,
    /// Every call fails with a retryable error.
    unavailable: bool,
    latency: Duration,
    /// Flipped to true after the first call.
    cancel_after_first: Option<watch::Sender<bool>>,
}

impl FakeProvider {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            failing_scenes: HashSet::new(),
            stalled_scenes: HashSet::new(),
            unavailable: false,
            latency: Duration::ZERO,
            cancel_after_first: None,
        }
    }

    pub fn failing_on(mut self, scene: u32) -> Self {
        self.failing_scenes.insert(scene);
        self
    }

    pub fn stalling_on(mut self, scene: u32) -> Self {
        self.stalled_scenes.insert(scene);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn cancelling(mut self, tx: watch::Sender<bool>) -> Self {
        self.cancel_after_first = Some(tx);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn produce(&self, request: &GenerationRequest<'_>) -> ProviderResult<()> {
        if let Some(tx) = &self.cancel_after_first {
            let _ = tx.send(true);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.unavailable {
            return Err(ProviderError::Timeout(1));
        }
        if let Some(index) = request.item.scene_index() {
            if self.stalled_scenes.contains(&index) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.failing_scenes.contains(&index) {
                return Err(ProviderError::ContentFiltered(format!("scene {index} rejected")));
            }
        }
        shortgen_media::write_atomic(request.output, format!("{} {}", self.kind, request.item).as_bytes())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AssetProvider for FakeProvider {
    fn kind(&self) -> AssetKind {
        self.kind
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> ProviderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.produce(request).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Composer that writes a placeholder output instead of running FFmpeg.
pub struct FakeComposer {
    layout: RunLayout,
    pub calls: AtomicUsize,
    pub last_options: Mutex<Option<CompositionOptions>>,
    /// Behave like an FFmpeg run killed by cancellation.
    killed: AtomicBool,
}

impl FakeComposer {
    pub fn new(layout: RunLayout) -> Self {
        Self {
            layout,
            calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
            killed: AtomicBool::new(false),
        }
    }

    pub fn killed(layout: RunLayout) -> Self {
        let composer = Self::new(layout);
        composer.killed.store(true, Ordering::SeqCst);
        composer
    }
}

#[async_trait]
impl Composer for FakeComposer {
    async fn compose(
        &self,
        doc: &ScriptDocument,
        options: &CompositionOptions,
    ) -> MediaResult<CompositionOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        if self.killed.load(Ordering::SeqCst) {
            return Err(MediaError::Cancelled);
        }
        let output = self.layout.output_video(&doc.slug());
        shortgen_media::write_atomic(&output, b"mp4").await?;
        Ok(CompositionOutcome {
            output,
            actual_duration: f64::from(doc.target_duration_seconds),
            subtitle_track: None,
            warnings: Vec::new(),
        })
    }
}

/// One provider of every kind, kept so tests can read the call counts.
pub struct Fakes {
    pub web: Arc<FakeProvider>,
    pub image: Arc<FakeProvider>,
    pub video: Arc<FakeProvider>,
    pub narration: Arc<FakeProvider>,
    pub music: Arc<FakeProvider>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::with_video(FakeProvider::new(AssetKind::GeneratedVideo))
    }

    pub fn with_video(video: FakeProvider) -> Self {
        Self::with(FakeProvider::new(AssetKind::WebImage), video)
    }

    pub fn with(web: FakeProvider, video: FakeProvider) -> Self {
        Self {
            web: Arc::new(web),
            image: Arc::new(FakeProvider::new(AssetKind::GeneratedImage)),
            video: Arc::new(video),
            narration: Arc::new(FakeProvider::new(AssetKind::Narration)),
            music: Arc::new(FakeProvider::new(AssetKind::Music)),
        }
    }

    pub fn with_image(image: FakeProvider) -> Self {
        Self {
            image: Arc::new(image),
            ..Self::new()
        }
    }

    pub fn with_narration(narration: FakeProvider) -> Self {
        Self {
            narration: Arc::new(narration),
            ..Self::new()
        }
    }

    pub fn set(&self) -> ProviderSet {
        ProviderSet::new()
            .with(self.web.clone())
            .with(self.image.clone())
            .with(self.video.clone())
            .with(self.narration.clone())
            .with(self.music.clone())
    }

    pub fn total_calls(&self) -> usize {
        self.web.calls() + self.image.calls() + self.video.calls() + self.narration.calls() + self.music.calls()
    }
}

/// Scratch run directory with its script path and layout.
pub struct Workspace {
    pub dir: TempDir,
    pub layout: RunLayout,
    pub store: DocumentStore,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("script.json");
        Self {
            layout: RunLayout::beside_script(&script),
            store: DocumentStore::new(script),
            dir,
        }
    }

    pub fn runner(
        &self,
        fakes: &Fakes,
        composer: Arc<FakeComposer>,
        cancel: watch::Receiver<bool>,
    ) -> PipelineRunner {
        self.runner_with_fan_out(fakes, composer, cancel, 2)
    }

    pub fn runner_with_fan_out(
        &self,
        fakes: &Fakes,
        composer: Arc<FakeComposer>,
        cancel: watch::Receiver<bool>,
        fan_out: usize,
    ) -> PipelineRunner {
        let config = PipelineConfig {
            max_scene_parallel: fan_out,
            ..fast_config()
        };
        self.runner_with_config(fakes, composer, cancel, config)
    }

    pub fn runner_with_config(
        &self,
        fakes: &Fakes,
        composer: Arc<FakeComposer>,
        cancel: watch::Receiver<bool>,
        config: PipelineConfig,
    ) -> PipelineRunner {
        PipelineRunner::new(
            config,
            self.layout.clone(),
            self.store.clone(),
            fakes.set(),
            composer,
            cancel,
        )
    }

    pub fn composer(&self) -> Arc<FakeComposer> {
        Arc::new(FakeComposer::new(self.layout.clone()))
    }
}

/// Default settings with a 1 ms retry backoff.
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        retry_base_delay: Duration::from_millis(1),
        ..Default::default()
    }
}

pub fn never_cancelled() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    // The receiver keeps the last value once the sender is gone.
    drop(tx);
    rx
}

pub fn logger(runner: &PipelineRunner, doc: &ScriptDocument) -> RunLogger {
    RunLogger::new(runner.run_id(), &doc.title)
}

pub fn options() -> RunOptions {
    RunOptions::default()
}

pub const GENERATION_PHASES: [PipelinePhase; 4] = [
    PipelinePhase::ImagesAcquired,
    PipelinePhase::VideosGenerated,
    PipelinePhase::NarrationGenerated,
    PipelinePhase::MusicGenerated,
];
