//! crates/study_assistant_core/src/chunking.rs
//!
//! Splits long document text into paragraph-aligned chunks that fit a
//! size-constrained summarization model. Paragraphs are never split; a chunk
//! may overrun the soft limit rather than be closed while still too small.

use regex::Regex;
use std::sync::LazyLock;

/// Paragraphs shorter than this are page headers or markers, not content.
pub const MIN_PARAGRAPH_CHARS: usize = 20;

/// A chunk is not closed, nor is a trailing one emitted, below this size.
pub const MIN_CHUNK_CHARS: usize = 200;

/// A blank line, a `--- Page N ---` marker or a bare `---` line.
static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\r?\n[ \t]*){2,}|-{3}\s*Page\s+\d+\s*-{3}|(?m:^[ \t]*-{3}[ \t]*$)")
        .expect("paragraph break pattern must compile")
});

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\r?\n\s*").expect("line break pattern must compile"));

/// Character length, which is what every size limit in the pipeline counts.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits `text` into trimmed paragraphs, joining the lines inside each one.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK
        .split(text)
        .map(|para| LINE_BREAK.replace_all(para.trim(), " ").into_owned())
        .filter(|para| !para.is_empty())
        .collect()
}

/// Greedily packs paragraphs into chunks of roughly `max_chunk_chars`.
///
/// Meant for text longer than `max_chunk_chars`. Chunks keep paragraph order
/// and every emitted chunk is at least [`MIN_CHUNK_CHARS`] long; a trailing
/// fragment below that size is dropped.
pub fn split_into_chunks(text: &str, max_chunk_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for para in split_paragraphs(text) {
        let para_len = char_len(&para);
        if para_len < MIN_PARAGRAPH_CHARS {
            continue;
        }

        if current_len + para_len > max_chunk_chars && current_len >= MIN_CHUNK_CHARS {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        } else if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(&para);
        current_len += para_len;
    }

    if current_len >= MIN_CHUNK_CHARS {
        chunks.push(current);
    }

    chunks
}
