#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper and compositor for vertical shorts.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeouts via tokio
//! - Ken Burns, fit/hold and audio mix filter builders
//! - SRT and ASS subtitle rendering from scene boundaries
//! - The compositor that assembles scene clips, audio and subtitles

pub mod command;
pub mod compose;
pub mod concat;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod subtitles;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compose::{
    check_preconditions, plan_composition, CompositionOptions, CompositionOutcome, CompositionPlan,
    Compositor, SubtitleMode, DEFAULT_DURATION_TOLERANCE_SECS,
};
pub use concat::concat_files;
pub use error::{MediaError, MediaResult, MissingArtifact};
pub use fs_utils::{is_nonempty_file, move_file, partial_path, write_atomic};
pub use probe::{get_duration, probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use subtitles::{cues_from_document, SubtitleCue, SubtitleFormat};
