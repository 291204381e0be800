//! Parsed `-progress pipe:2` state.

/// Latest values reported by FFmpeg for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfmpegProgress {
    pub frame: u64,
    pub fps: f64,
    /// Output position in microseconds, as FFmpeg reports `out_time_us`.
    pub out_time_us: i64,
    /// Encoding speed relative to realtime.
    pub speed: f64,
    /// Set once FFmpeg reports `progress=end`.
    pub is_complete: bool,
}

impl FfmpegProgress {
    pub fn out_seconds(&self) -> f64 {
        self.out_time_us as f64 / 1_000_000.0
    }

    /// Share of `total_seconds` written so far, clamped to 0..=100.
    pub fn percentage(&self, total_seconds: f64) -> f64 {
        if total_seconds <= 0.0 {
            return 0.0;
        }
        (self.out_seconds() / total_seconds * 100.0).clamp(0.0, 100.0)
    }
}
