//! Concat demuxer helpers.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Render a concat demuxer list. Single quotes in paths are closed,
/// escaped and reopened.
pub fn concat_list(paths: &[PathBuf]) -> String {
    let mut out = String::new();
    for path in paths {
        let escaped = path.to_string_lossy().replace('\'', "'\\''");
        let _ = writeln!(out, "file '{escaped}'");
    }
    out
}

/// Join same-codec files in order with stream copy.
pub async fn concat_files(
    runner: &FfmpegRunner,
    inputs: &[PathBuf],
    list_path: &Path,
    output: &Path,
) -> MediaResult<()> {
    if inputs.is_empty() {
        return Err(MediaError::internal("Nothing to concatenate"));
    }

    // Entries resolve against the list's directory, not the working directory.
    let mut absolute = Vec::with_capacity(inputs.len());
    for input in inputs {
        absolute.push(tokio::fs::canonicalize(input).await?);
    }

    tokio::fs::write(list_path, concat_list(&absolute)).await?;
    debug!("Concatenating {} files into {}", inputs.len(), output.display());

    let cmd = FfmpegCommand::new(list_path, output)
        .input_args(["-f", "concat", "-safe", "0"])
        .codec_copy();
    runner.run(&cmd).await
}
