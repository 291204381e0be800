//! Subtitle tracks timed from scene boundaries.
//!
//! Each scene's narration slice is spoken inside that scene's window, so the
//! scene boundaries are the cue timings. No alignment pass is needed.

use std::fmt::Write as _;

use shortgen_models::ScriptDocument;

/// Lines longer than this are split in two.
const WRAP_THRESHOLD_CHARS: usize = 40;
const ASS_FONT: &str = "Arial";
const ASS_FONT_SIZE: u32 = 48;
const ASS_OUTLINE: u32 = 3;
const ASS_MARGIN_V: u32 = 120;

/// Subtitle container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Ass,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Ass => "ass",
        }
    }
}

/// One timed caption.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub index: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// One cue per scene with narration, spanning exactly the scene window.
pub fn cues_from_document(doc: &ScriptDocument) -> Vec<SubtitleCue> {
    let mut cues = Vec::with_capacity(doc.scenes.len());
    let mut offset = 0.0;

    for scene in &doc.scenes {
        let start = offset;
        let end = start + scene.duration_seconds as f64;
        offset = end;

        let text = scene.narration_text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }
        cues.push(SubtitleCue {
            index: scene.index,
            start,
            end,
            text,
        });
    }

    cues
}

/// Render cues as SubRip.
pub fn render_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for (n, cue) in cues.iter().enumerate() {
        let _ = writeln!(out, "{}", n + 1);
        let _ = writeln!(out, "{} --> {}", srt_time(cue.start), srt_time(cue.end));
        let _ = writeln!(out, "{}", wrap_line(&cue.text, "\n"));
        out.push('\n');
    }
    out
}

/// Render cues as Advanced SubStation Alpha, styled for a vertical frame.
pub fn render_ass(cues: &[SubtitleCue], width: u32, height: u32) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "[Script Info]\n\
         Title: Short Video Subtitles\n\
         ScriptType: v4.00+\n\
         PlayResX: {width}\n\
         PlayResY: {height}\n\
         WrapStyle: 0\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, \
         Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, \
         Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Default,{ASS_FONT},{ASS_FONT_SIZE},&H00FFFFFF,&H000000FF,&H00000000,&H80000000,\
         -1,0,0,0,100,100,0,0,1,{ASS_OUTLINE},1,2,40,40,{ASS_MARGIN_V},1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n"
    );

    for cue in cues {
        let text = wrap_line(&escape_ass_text(&cue.text), "\\N");
        let _ = writeln!(
            out,
            "Dialogue: 0,{},{},Default,,0,0,0,,{}",
            ass_time(cue.start),
            ass_time(cue.end),
            text
        );
    }
    out
}

pub fn render(format: SubtitleFormat, cues: &[SubtitleCue], width: u32, height: u32) -> String {
    match format {
        SubtitleFormat::Srt => render_srt(cues),
        SubtitleFormat::Ass => render_ass(cues, width, height),
    }
}

/// Split long text at its middle word.
fn wrap_line(text: &str, separator: &str) -> String {
    if text.chars().count() <= WRAP_THRESHOLD_CHARS {
        return text.to_string();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 2 {
        return text.to_string();
    }
    let mid = words.len() / 2;
    format!("{}{}{}", words[..mid].join(" "), separator, words[mid..].join(" "))
}

// Braces start override blocks in ASS.
fn escape_ass_text(text: &str) -> String {
    text.replace('{', "(").replace('}', ")")
}

/// `HH:MM:SS,mmm`
fn srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let (h, rem) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (m, rem) = (rem / 60_000, rem % 60_000);
    let (s, ms) = (rem / 1000, rem % 1000);
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// `H:MM:SS.cc`
fn ass_time(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let (h, rem) = (total_cs / 360_000, total_cs % 360_000);
    let (m, rem) = (rem / 6000, rem % 6000);
    let (s, cs) = (rem / 100, rem % 100);
    format!("{h}:{m:02}:{s:02}.{cs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortgen_models::test_support::sample_document;

    #[test]
    fn test_cues_follow_scene_boundaries() {
        let doc = sample_document(30);
        let cues = cues_from_document(&doc);
        assert_eq!(cues.len(), 6);
        for (i, cue) in cues.iter().enumerate() {
            assert_eq!(cue.start, i as f64 * 5.0);
            assert_eq!(cue.end, (i + 1) as f64 * 5.0);
        }
        assert_eq!(cues.last().unwrap().end, 30.0);
    }

    #[test]
    fn test_time_formats() {
        assert_eq!(srt_time(0.0), "00:00:00,000");
        assert_eq!(srt_time(65.25), "00:01:05,250");
        assert_eq!(srt_time(3725.0), "01:02:05,000");
        assert_eq!(ass_time(65.25), "0:01:05.25");
        assert_eq!(ass_time(3725.5), "1:02:05.50");
    }

    #[test]
    fn test_srt_rendering() {
        let cues = vec![
            SubtitleCue { index: 1, start: 0.0, end: 5.0, text: "Hello there.".into() },
            SubtitleCue { index: 2, start: 5.0, end: 10.0, text: "General Kenobi.".into() },
        ];
        let srt = render_srt(&cues);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:05,000\nHello there.\n\n2\n"));
    }

    #[test]
    fn test_ass_wraps_long_lines_and_escapes_braces() {
        let cues = vec![SubtitleCue {
            index: 1,
            start: 0.0,
            end: 5.0,
            text: "Rust gives you {memory safety} without a garbage collector at all".into(),
        }];
        let ass = render_ass(&cues, 1080, 1920);
        assert!(ass.contains("PlayResX: 1080\nPlayResY: 1920"));
        let dialogue = ass.lines().find(|l| l.starts_with("Dialogue:")).unwrap();
        assert!(dialogue.starts_with("Dialogue: 0,0:00:00.00,0:00:05.00,Default,,0,0,0,,"));
        assert!(dialogue.contains("\\N"));
        assert!(dialogue.contains("(memory"));
        assert!(!dialogue.contains('{'));
    }

    #[test]
    fn test_short_lines_are_not_wrapped() {
        assert_eq!(wrap_line("Short and sweet.", "\\N"), "Short and sweet.");
    }
}
