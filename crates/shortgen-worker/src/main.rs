//! `shortgen` binary: turn written content into a vertical short.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shortgen_media::{check_ffmpeg, check_ffprobe, Compositor, FfmpegRunner, SubtitleMode};
use shortgen_models::{estimate_cost, AssetKind, RunLayout, ScriptDocument, Style, VisualMode};
use shortgen_providers::{
    AssetProvider, DeepgramProvider, FalClient, FalMusicProvider, FalVideoProvider, ImagenProvider,
    PexelsProvider, ProviderError,
};
use shortgen_worker::{
    required_kinds, DocumentStore, PipelineConfig, PipelineError, PipelineRunner, ProviderSet, RunLogger,
    RunOptions, RunSummary, ScheduleRequest, SceneScheduler,
};

#[derive(Parser, Debug)]
#[command(name = "shortgen", version, about = "Turn written content into a vertical short video")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Schedule a script from content and produce the video.
    Run {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        render: RenderArgs,
        /// Skip items whose artifact already exists.
        #[arg(long)]
        skip_existing: bool,
        /// Maximum provider calls in flight per phase.
        #[arg(long)]
        fan_out: Option<usize>,
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Continue a run from an existing script.
    Resume {
        script: PathBuf,
        #[command(flatten)]
        render: RenderArgs,
        /// Always on when resuming; accepted for symmetry with `run`.
        #[arg(long, hide = true)]
        skip_existing: bool,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        fan_out: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Write the script only.
    Schedule {
        #[command(flatten)]
        source: SourceArgs,
        /// Render subtitles by default when this script is composed.
        #[arg(long)]
        subtitles: bool,
    },
    /// Compose the final video from a fully populated script.
    Compose {
        script: PathBuf,
        #[command(flatten)]
        render: RenderArgs,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the JSON schema of script.json.
    Schema,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Markdown, HTML or plain text file.
    source: Option<PathBuf>,
    /// Read the content from stdin.
    #[arg(long, conflicts_with = "source")]
    stdin: bool,
    /// Where to write the script (default: script.json beside the source).
    #[arg(long)]
    script: Option<PathBuf>,
    /// Target duration in seconds.
    #[arg(long, default_value_t = 30)]
    duration: u32,
    #[arg(long, default_value = "educational")]
    style: Style,
    #[arg(long, default_value = "mixed")]
    visual_mode: VisualMode,
    /// Narration voice (default: the style's voice).
    #[arg(long)]
    voice: Option<String>,
    /// Artifact directory (default: output/ beside the script).
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Print the estimated provider spend.
    #[arg(long)]
    cost_estimate: bool,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Burn subtitles into the video.
    #[arg(long, conflicts_with = "embed_subtitles")]
    subtitles: bool,
    /// Add subtitles as a soft track instead of burning them in.
    #[arg(long)]
    embed_subtitles: bool,
    /// Leave out background music.
    #[arg(long)]
    no_music: bool,
}

impl RenderArgs {
    fn run_options(&self, skip_existing: bool) -> RunOptions {
        let subtitles = if self.embed_subtitles {
            Some(SubtitleMode::Embed)
        } else if self.subtitles {
            Some(SubtitleMode::Burn)
        } else {
            None
        };
        RunOptions {
            skip_existing,
            include_music: !self.no_music,
            subtitles,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryView<'a> {
    run_id: String,
    phase: String,
    complete: bool,
    output_video: Option<&'a Path>,
    actual_duration_seconds: Option<f64>,
    phases: Vec<PhaseView>,
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhaseView {
    phase: String,
    generated: usize,
    skipped: usize,
    failed: usize,
    cancelled: usize,
    errors: Vec<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight work");
            let _ = cancel_tx.send(true);
        }
    });

    match execute(cli.command, cancel_rx).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            let code = e.downcast_ref::<PipelineError>().map_or(1, exit_code_for);
            std::process::exit(code);
        }
    }
}

/// Conventional SIGINT status for an operator stop, 1 for everything else.
fn exit_code_for(err: &PipelineError) -> i32 {
    if err.is_fatal() {
        1
    } else {
        130
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shortgen=info,warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

/// Returns the process exit code.
async fn execute(command: Command, cancel: watch::Receiver<bool>) -> anyhow::Result<i32> {
    let mut config = PipelineConfig::from_env();

    match command {
        Command::Schema => {
            let schema = schemars::schema_for!(ScriptDocument);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(0)
        }
        Command::Schedule { source, subtitles } => {
            let (doc, script) = schedule(&source, subtitles, &config).await?;
            println!("Wrote {} ({} scenes)", script.display(), doc.scenes.len());
            Ok(0)
        }
        Command::Run {
            source,
            render,
            skip_existing,
            fan_out,
            json,
        } => {
            if let Some(n) = fan_out {
                config.max_scene_parallel = n.max(1);
            }
            let (doc, script) = prepare_script(&source, render.subtitles, skip_existing, &config).await?;
            let layout = layout_for(&script, source.output_dir.as_deref());
            let summary = run_pipeline(doc, &script, layout, &render.run_options(skip_existing), config, cancel).await?;
            report(&summary, json)
        }
        Command::Resume {
            script,
            render,
            skip_existing: _,
            output_dir,
            fan_out,
            json,
        } => {
            if let Some(n) = fan_out {
                config.max_scene_parallel = n.max(1);
            }
            let doc = DocumentStore::new(&script).load().await?;
            let layout = layout_for(&script, output_dir.as_deref());
            let summary = run_pipeline(doc, &script, layout, &render.run_options(true), config, cancel).await?;
            report(&summary, json)
        }
        Command::Compose {
            script,
            render,
            output_dir,
        } => {
            check_ffmpeg()?;
            check_ffprobe()?;
            let store = DocumentStore::new(&script);
            let mut doc = store.load().await?;
            let layout = layout_for(&script, output_dir.as_deref());
            let runner = build_runner(&config, layout, store, ProviderSet::new(), cancel);
            let logger = RunLogger::new(runner.run_id(), &doc.title);
            let outcome = runner.compose(&mut doc, &render.run_options(true), &logger).await?;
            println!(
                "Composed {} ({:.2}s)",
                outcome.output.display(),
                outcome.actual_duration
            );
            Ok(0)
        }
    }
}

async fn read_source(args: &SourceArgs) -> anyhow::Result<String> {
    match (&args.source, args.stdin) {
        (_, true) => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading content from stdin")?;
            Ok(text)
        }
        (Some(path), false) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        (None, false) => anyhow::bail!("provide a content file or use --stdin"),
    }
}

fn script_path(args: &SourceArgs) -> PathBuf {
    args.script.clone().unwrap_or_else(|| match &args.source {
        Some(source) => source.with_file_name("script.json"),
        None => PathBuf::from("script.json"),
    })
}

/// With `--skip-existing`, keep a script that is already on disk so its
/// creation time and recorded artifacts survive; otherwise schedule afresh.
async fn prepare_script(
    args: &SourceArgs,
    subtitles: bool,
    skip_existing: bool,
    config: &PipelineConfig,
) -> anyhow::Result<(ScriptDocument, PathBuf)> {
    let script = script_path(args);
    if skip_existing && tokio::fs::try_exists(&script).await.unwrap_or(false) {
        let doc = DocumentStore::new(&script).load().await?;
        info!(phase = %doc.phase, "Reusing existing script {}", script.display());
        return Ok((doc, script));
    }
    schedule(args, subtitles, config).await
}

async fn schedule(
    args: &SourceArgs,
    subtitles: bool,
    config: &PipelineConfig,
) -> anyhow::Result<(ScriptDocument, PathBuf)> {
    let text = read_source(args).await?;

    let mut request = ScheduleRequest::new(args.style, args.duration, args.visual_mode);
    request.voice = args.voice.clone();
    request.subtitles = subtitles;
    request.source_file = args.source.clone();

    let doc = SceneScheduler::new(config.unit_seconds).schedule(&request, &text)?;

    if args.cost_estimate {
        let cost = estimate_cost(doc.scenes.len(), doc.visual_mode, true);
        println!("Cost estimate ({}, {} scenes):", doc.visual_mode, doc.scenes.len());
        println!("  narration    ${:.2}", cost.narration);
        println!("  music        ${:.2}", cost.music);
        println!("  images       ${:.2}", cost.images);
        println!("  video clips  ${:.2}", cost.video_clips);
        println!("  total        ${:.2}", cost.total());
    }

    let script = script_path(args);
    DocumentStore::new(&script).save(&doc).await?;
    info!(
        scenes = doc.scenes.len(),
        "Scheduled \"{}\" into {}",
        doc.title,
        script.display()
    );
    Ok((doc, script))
}

fn layout_for(script: &Path, output_dir: Option<&Path>) -> RunLayout {
    match output_dir {
        Some(dir) => RunLayout::new(dir),
        None => RunLayout::beside_script(script),
    }
}

fn build_runner(
    config: &PipelineConfig,
    layout: RunLayout,
    store: DocumentStore,
    providers: ProviderSet,
    cancel: watch::Receiver<bool>,
) -> PipelineRunner {
    let ffmpeg = FfmpegRunner::new()
        .with_cancel(cancel.clone())
        .with_timeout(config.ffmpeg_timeout_secs);
    let compositor = Compositor::new(layout.clone(), config.encoding()).with_runner(ffmpeg);
    PipelineRunner::new(config.clone(), layout, store, providers, Arc::new(compositor), cancel)
}

/// Build only the providers that have work, so unused keys are never demanded.
fn build_providers(
    kinds: &[AssetKind],
    config: &PipelineConfig,
    cancel: &watch::Receiver<bool>,
) -> Result<ProviderSet, ProviderError> {
    let mut set = ProviderSet::new();
    let mut fal: Option<FalClient> = None;
    let mut fal_client = || -> Result<FalClient, ProviderError> {
        if let Some(client) = &fal {
            return Ok(client.clone());
        }
        let client = FalClient::from_env()?;
        fal = Some(client.clone());
        Ok(client)
    };

    for kind in kinds {
        let provider: Arc<dyn AssetProvider> = match kind {
            AssetKind::WebImage => Arc::new(PexelsProvider::from_env()?),
            AssetKind::GeneratedImage => Arc::new(ImagenProvider::from_env()?),
            AssetKind::GeneratedVideo => Arc::new(FalVideoProvider::new(fal_client()?)),
            AssetKind::Music => Arc::new(FalMusicProvider::new(fal_client()?)),
            AssetKind::Narration => {
                let runner = FfmpegRunner::new()
                    .with_cancel(cancel.clone())
                    .with_timeout(config.ffmpeg_timeout_secs);
                Arc::new(DeepgramProvider::from_env()?.with_runner(runner))
            }
        };
        set = set.with(provider);
    }
    Ok(set)
}

async fn run_pipeline(
    doc: ScriptDocument,
    script: &Path,
    layout: RunLayout,
    options: &RunOptions,
    config: PipelineConfig,
    cancel: watch::Receiver<bool>,
) -> anyhow::Result<RunSummary> {
    check_ffmpeg()?;
    check_ffprobe()?;

    let kinds = required_kinds(&doc, &layout, options).await;
    info!(
        "Providers needed: {}",
        kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
    );
    let providers = build_providers(&kinds, &config, &cancel).map_err(PipelineError::from)?;

    let runner = build_runner(&config, layout, DocumentStore::new(script), providers, cancel);
    Ok(runner.run(doc, options).await)
}

fn report(summary: &RunSummary, json: bool) -> anyhow::Result<i32> {
    if json {
        let view = SummaryView {
            run_id: summary.run_id.to_string(),
            phase: summary.document.phase.to_string(),
            complete: summary.is_complete(),
            output_video: summary.document.artifacts.output_video.as_deref(),
            actual_duration_seconds: summary.document.artifacts.actual_duration_seconds,
            phases: summary
                .phases
                .iter()
                .map(|p| PhaseView {
                    phase: p.phase.to_string(),
                    generated: p.counts.generated,
                    skipped: p.counts.skipped,
                    failed: p.counts.failed,
                    cancelled: p.counts.cancelled,
                    errors: p.errors.iter().map(ToString::to_string).collect(),
                })
                .collect(),
            error: summary.error.as_ref().map(ToString::to_string),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("Run {} ended at phase {}", summary.run_id, summary.document.phase);
        for phase in &summary.phases {
            println!("  {}", phase.summary_line());
            for err in &phase.errors {
                println!("    - {}", err);
            }
        }
        if let Some(outcome) = &summary.composition {
            println!("Output: {} ({:.2}s)", outcome.output.display(), outcome.actual_duration);
        }
        if let Some(err) = &summary.error {
            if err.is_fatal() {
                eprintln!("error: {} ({})", err, err.kind());
            } else {
                eprintln!("{}; run `shortgen resume` to continue", err);
            }
        }
    }
    Ok(match &summary.error {
        Some(err) => exit_code_for(err),
        None if summary.is_complete() => 0,
        None => 1,
    })
}
