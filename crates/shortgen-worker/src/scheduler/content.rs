//! Source content preparation: cleanup, title and section extraction,
//! section scoring and narration condensing.

use regex::Regex;
use std::sync::LazyLock;

static FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A---\r?\n.*?\r?\n---[ \t]*(\r?\n|\z)").unwrap());
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Markdown cleanup rules, applied in order.
static MARKDOWN_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"!\[[^\]]*\]\([^)]+\)").unwrap(), ""),
        (Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap(), "$1"),
        (Regex::new(r"```[\s\S]*?```").unwrap(), ""),
        (Regex::new(r"`[^`]+`").unwrap(), ""),
        (Regex::new(r"\*\*([^*]+)\*\*").unwrap(), "$1"),
        (Regex::new(r"\*([^*]+)\*").unwrap(), "$1"),
        (Regex::new(r"(?m)^#{1,6}\s+").unwrap(), ""),
        (Regex::new(r"(?m)^[-*]\s+").unwrap(), ""),
        (Regex::new(r"(?m)^\d+\.\s+").unwrap(), ""),
        (Regex::new(r"(?m)^>\s*").unwrap(), ""),
        (Regex::new(r"(?m)^-{3,}\s*$").unwrap(), ""),
        (Regex::new(r"\n{3,}").unwrap(), "\n\n"),
    ]
});

static H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());
static H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^##\s+(.+?)\s*$").unwrap());
static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());
static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").unwrap());

pub const DEFAULT_TITLE: &str = "Untitled Short";
const MAX_TITLE_CHARS: usize = 80;
const MAX_SECTION_TITLE_CHARS: usize = 50;
const MIN_PARAGRAPH_CHARS: usize = 20;

const STRONG_WORDS: [&str; 16] = [
    "important",
    "key",
    "critical",
    "essential",
    "remarkable",
    "surprising",
    "billion",
    "million",
    "breakthrough",
    "revolutionary",
    "first",
    "biggest",
    "most",
    "never",
    "always",
    "every",
];

/// A titled block of source content with a cleaned body.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

impl Section {
    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}

pub fn strip_front_matter(content: &str) -> &str {
    match FRONT_MATTER.find(content) {
        Some(m) => content[m.end()..].trim_start(),
        None => content,
    }
}

pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

pub fn strip_markdown(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, replacement) in MARKDOWN_RULES.iter() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out.trim().to_string()
}

/// HTML and Markdown removed, readable text kept.
pub fn clean_text(text: &str) -> String {
    strip_markdown(&strip_html(text))
}

/// First `#` heading, else the first substantial line, else a placeholder.
pub fn extract_title(content: &str) -> String {
    if let Some(caps) = H1.captures(content) {
        let raw = caps[1].trim();
        if !raw.starts_with("![") {
            let title = clean_text(raw);
            if !title.is_empty() {
                return truncate_chars(&title, MAX_TITLE_CHARS);
            }
        }
    }

    content
        .lines()
        .map(str::trim)
        .find(|line| line.chars().count() > 10 && !line.starts_with("![") && !line.starts_with("```"))
        .map(|line| truncate_chars(&clean_text(line), MAX_TITLE_CHARS))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// `##` sections with non-empty bodies; otherwise paragraphs long enough to
/// stand alone, titled by their first sentence.
pub fn extract_sections(content: &str) -> Vec<Section> {
    let headings: Vec<_> = H2.captures_iter(content).collect();
    if !headings.is_empty() {
        let mut sections = Vec::new();
        for (i, caps) in headings.iter().enumerate() {
            let Some(whole) = caps.get(0) else { continue };
            let end = headings
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(content.len());
            let body = clean_text(&content[whole.end()..end]);
            if !body.is_empty() {
                sections.push(Section {
                    title: truncate_chars(&clean_text(&caps[1]), MAX_SECTION_TITLE_CHARS),
                    body,
                });
            }
        }
        if !sections.is_empty() {
            return sections;
        }
    }

    PARAGRAPH_BREAK
        .split(content.trim())
        .map(clean_text)
        .filter(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        .map(|body| {
            let first = body
                .split(['.', '!', '?'])
                .next()
                .map(str::trim)
                .unwrap_or_default();
            Section {
                title: truncate_chars(first, MAX_SECTION_TITLE_CHARS),
                body,
            }
        })
        .collect()
}

/// Importance of a section for a short: position, length, strong wording,
/// numbers and quotes all count.
pub fn score_section(section: &Section, position: usize, total: usize) -> f64 {
    let mut score = 0.0;

    if position == 0 {
        score += 3.0;
    } else if position + 1 == total {
        score += 2.0;
    }

    let words = section.word_count();
    if (20..=100).contains(&words) {
        score += 2.0;
    } else if (10..=150).contains(&words) {
        score += 1.0;
    }

    let lower = section.body.to_lowercase();
    score += 0.5 * STRONG_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;

    if DIGIT.is_match(&section.body) {
        score += 0.5;
    }
    if section.body.contains('"') || section.body.contains('\u{201c}') {
        score += 0.3;
    }

    score
}

/// The `count` best sections, in their original order.
pub fn select_sections(sections: &[Section], count: usize) -> Vec<Section> {
    if sections.len() <= count {
        return sections.to_vec();
    }

    let total = sections.len();
    let mut scored: Vec<(f64, usize)> = sections
        .iter()
        .enumerate()
        .map(|(i, s)| (score_section(s, i, total), i))
        .collect();
    // Stable sort keeps earlier sections ahead on ties.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut keep: Vec<usize> = scored.into_iter().take(count).map(|(_, i)| i).collect();
    keep.sort_unstable();
    keep.into_iter().map(|i| sections[i].clone()).collect()
}

pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        let end = m.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Whole leading sentences within `max_words`; truncation when even the
/// first sentence is too long.
pub fn condense(text: &str, max_words: usize) -> String {
    let mut selected = Vec::new();
    let mut used = 0;
    for sentence in split_sentences(text) {
        let words = sentence.split_whitespace().count();
        if used + words > max_words {
            break;
        }
        selected.push(sentence);
        used += words;
    }
    if !selected.is_empty() {
        return selected.join(" ");
    }
    truncate_words(text, max_words)
}

/// First `max_words` words, cut back to a sentence end when one falls in the
/// second half.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    let truncated = words[..max_words].join(" ");
    match truncated.rfind('.') {
        Some(idx) if idx > truncated.len() / 2 => truncated[..=idx].to_string(),
        _ => truncated,
    }
}

/// Split `words` into `parts` contiguous runs whose lengths differ by at most
/// one. Callers guarantee `words.len() >= parts`.
pub fn split_even<'a>(words: &[&'a str], parts: usize) -> Vec<Vec<&'a str>> {
    let base = words.len() / parts;
    let extra = words.len() % parts;
    let mut runs = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        runs.push(words[start..start + len].to_vec());
        start += len;
    }
    runs
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect::<String>().trim().to_string()
}
