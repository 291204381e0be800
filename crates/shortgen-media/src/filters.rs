//! FFmpeg filter builders for scene clips and the final audio mix.

/// Zoom factor reached by the zoom in/out moves.
const KEN_BURNS_MAX_ZOOM: f64 = 1.15;
/// Fixed zoom used while panning, leaving room to travel.
const KEN_BURNS_PAN_ZOOM: f64 = 1.10;

/// Camera move applied to a still image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KenBurnsDirection {
    ZoomIn,
    ZoomOut,
    PanLeftToRight,
    PanTopToBottom,
}

impl KenBurnsDirection {
    const CYCLE: [KenBurnsDirection; 4] = [
        KenBurnsDirection::ZoomIn,
        KenBurnsDirection::ZoomOut,
        KenBurnsDirection::PanLeftToRight,
        KenBurnsDirection::PanTopToBottom,
    ];

    /// Direction for the scene at `position` (0-based). Adjacent stills
    /// never share a move.
    pub fn for_position(position: usize) -> Self {
        Self::CYCLE[position % Self::CYCLE.len()]
    }

    /// `zoompan` z/x/y expressions spanning `frames` output frames.
    fn zoompan_expr(&self, frames: u32) -> String {
        let last = frames.saturating_sub(1).max(1);
        let center_x = "iw/2-(iw/zoom/2)";
        let center_y = "ih/2-(ih/zoom/2)";
        let span = KEN_BURNS_MAX_ZOOM - 1.0;
        match self {
            KenBurnsDirection::ZoomIn => format!(
                "z='min(1+{span:.3}*on/{last},{KEN_BURNS_MAX_ZOOM})':x='{center_x}':y='{center_y}'"
            ),
            KenBurnsDirection::ZoomOut => format!(
                "z='max({KEN_BURNS_MAX_ZOOM}-{span:.3}*on/{last},1)':x='{center_x}':y='{center_y}'"
            ),
            KenBurnsDirection::PanLeftToRight => format!(
                "z='{KEN_BURNS_PAN_ZOOM}':x='(iw-iw/zoom)*on/{last}':y='{center_y}'"
            ),
            KenBurnsDirection::PanTopToBottom => format!(
                "z='{KEN_BURNS_PAN_ZOOM}':x='{center_x}':y='(ih-ih/zoom)*on/{last}'"
            ),
        }
    }
}

/// Number of frames for a clip of `seconds` at `fps`.
pub fn frame_count(seconds: f64, fps: u32) -> u32 {
    (seconds * fps as f64).round().max(1.0) as u32
}

/// Animate a single still into exactly `frames` frames of `width`x`height`.
///
/// The image is upscaled to twice the frame size first so the zoom stays
/// sharp, and cropped to the frame's aspect ratio.
pub fn ken_burns_filter(
    direction: KenBurnsDirection,
    width: u32,
    height: u32,
    fps: u32,
    frames: u32,
) -> String {
    let (w2, h2) = (width * 2, height * 2);
    format!(
        "scale={w2}:{h2}:force_original_aspect_ratio=increase,crop={w2}:{h2},\
         zoompan={expr}:d={frames}:s={width}x{height}:fps={fps},setsar=1,format=yuv420p",
        expr = direction.zoompan_expr(frames),
    )
}

/// Fit a motion clip into the frame and hold its last frame for up to
/// `seconds`, so trimming to `seconds` always yields the full length.
pub fn fit_and_hold_filter(width: u32, height: u32, fps: u32, seconds: f64) -> String {
    format!(
        "scale={width}:{height}:force_original_aspect_ratio=decrease,\
         pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={fps},\
         tpad=stop_mode=clone:stop_duration={seconds:.3},format=yuv420p"
    )
}

/// One audio track of the final mix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioTrack {
    /// FFmpeg input index of the track.
    pub input: usize,
    /// Linear gain.
    pub volume: f32,
}

/// Fade-out applied to looped music: 10% of the short, at most 1.5 s.
pub fn music_fade_seconds(total_seconds: f64) -> f64 {
    (total_seconds * 0.1).min(1.5)
}

/// Build the `filter_complex` that mixes narration and music into `[aout]`.
///
/// Narration is padded with silence and music is expected to be looped at the
/// input; both are cut to `total_seconds`. `amix` runs without normalisation
/// so the configured gains are the gains heard. Returns `None` when there is
/// no audio at all.
pub fn audio_mix_filter(
    narration: Option<AudioTrack>,
    music: Option<AudioTrack>,
    total_seconds: f64,
) -> Option<String> {
    const FORMAT: &str = "aformat=sample_rates=44100:channel_layouts=stereo";
    let trim = format!("atrim=0:{total_seconds:.3},asetpts=PTS-STARTPTS");

    let narration_chain = narration.map(|t| {
        format!(
            "[{}:a]{FORMAT},volume={:.3},apad,{trim}",
            t.input, t.volume
        )
    });
    let music_chain = music.map(|t| {
        let fade = music_fade_seconds(total_seconds);
        let fade_start = (total_seconds - fade).max(0.0);
        format!(
            "[{}:a]{FORMAT},volume={:.3},{trim},afade=t=out:st={fade_start:.3}:d={fade:.3}",
            t.input, t.volume
        )
    });

    match (narration_chain, music_chain) {
        (Some(n), Some(m)) => Some(format!(
            "{n}[narr];{m}[music];[narr][music]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]"
        )),
        (Some(only), None) | (None, Some(only)) => Some(format!("{only}[aout]")),
        (None, None) => None,
    }
}

/// Escape a value (typically a path) for use as a filter option inside a
/// filtergraph string.
pub fn escape_filter_value(value: &str) -> String {
    let mut option = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option.push('\\');
        }
        option.push(c);
    }

    let mut graph = String::with_capacity(option.len());
    for c in option.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph.push('\\');
        }
        graph.push(c);
    }
    graph
}

/// Burn an ASS subtitle file into the video.
pub fn subtitles_burn_filter(ass_path: &str) -> String {
    format!("ass={}", escape_filter_value(ass_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_cycles() {
        assert_eq!(KenBurnsDirection::for_position(0), KenBurnsDirection::ZoomIn);
        assert_eq!(KenBurnsDirection::for_position(3), KenBurnsDirection::PanTopToBottom);
        assert_eq!(KenBurnsDirection::for_position(4), KenBurnsDirection::ZoomIn);
        for i in 0..10 {
            assert_ne!(
                KenBurnsDirection::for_position(i),
                KenBurnsDirection::for_position(i + 1)
            );
        }
    }

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(5.0, 25), 125);
        assert_eq!(frame_count(0.0, 25), 1);
    }

    #[test]
    fn test_ken_burns_filter_emits_exact_frames() {
        let filter = ken_burns_filter(KenBurnsDirection::PanLeftToRight, 1080, 1920, 25, 125);
        assert!(filter.starts_with("scale=2160:3840"));
        assert!(filter.contains(":d=125:s=1080x1920:fps=25"));
        assert!(filter.contains("x='(iw-iw/zoom)*on/124'"));
    }

    #[test]
    fn test_fit_and_hold_filter() {
        let filter = fit_and_hold_filter(1080, 1920, 25, 5.0);
        assert!(filter.contains("pad=1080:1920"));
        assert!(filter.contains("tpad=stop_mode=clone:stop_duration=5.000"));
    }

    #[test]
    fn test_audio_mix_both_tracks() {
        let filter = audio_mix_filter(
            Some(AudioTrack { input: 1, volume: 1.0 }),
            Some(AudioTrack { input: 2, volume: 0.15 }),
            30.0,
        )
        .unwrap();
        assert!(filter.contains("[1:a]"));
        assert!(filter.contains("volume=1.000,apad,atrim=0:30.000"));
        assert!(filter.contains("volume=0.150"));
        assert!(filter.contains("afade=t=out:st=28.500:d=1.500"));
        assert!(filter.contains("normalize=0"));
        assert!(filter.ends_with("[aout]"));
    }

    #[test]
    fn test_audio_mix_single_track() {
        let filter = audio_mix_filter(Some(AudioTrack { input: 1, volume: 1.0 }), None, 10.0).unwrap();
        assert!(!filter.contains("amix"));
        assert!(filter.ends_with("[aout]"));
        assert!(audio_mix_filter(None, None, 10.0).is_none());
    }

    #[test]
    fn test_short_music_fade() {
        assert!((music_fade_seconds(10.0) - 1.0).abs() < 1e-9);
        assert!((music_fade_seconds(90.0) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("/tmp/out/subtitles.ass"), "/tmp/out/subtitles.ass");
        assert_eq!(escape_filter_value("C:/subs.ass"), "C\\\\:/subs.ass");
        assert_eq!(escape_filter_value("it's.ass"), "it\\\\\\'s.ass");
        assert_eq!(escape_filter_value("a,b.ass"), "a\\,b.ass");
    }
}
