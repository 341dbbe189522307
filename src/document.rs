//! Plain-text book source.
//!
//! A line starting with `# ` opens a chapter titled by the rest of the line.
//! Every other non-blank line is one paragraph; paragraphs longer than the
//! provider's input limit are split into several chunks.

use crate::error::{NarratorError, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    /// Non-empty text chunks in reading order.
    pub chunks: Vec<String>,
}

impl Chapter {
    pub fn characters(&self) -> usize {
        self.chunks.iter().map(|c| c.chars().count()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

impl Book {
    /// Read and parse a UTF-8 text file; the book title is the file stem.
    pub fn load(path: &Path, max_chunk_bytes: usize) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes).map_err(|e| NarratorError::Document {
            message: format!("{} is not valid UTF-8: {}", path.display(), e),
        })?;
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let book = Self::parse(&title, &text, max_chunk_bytes);
        if book.chapters.is_empty() {
            return Err(NarratorError::Document {
                message: format!(
                    "no chapters found in {} (chapters start with a line beginning with '# ')",
                    path.display()
                ),
            });
        }
        Ok(book)
    }

    /// Split `text` into chapters. Text before the first heading is dropped;
    /// chapters sharing a title are merged into the first one.
    pub fn parse(title: &str, text: &str, max_chunk_bytes: usize) -> Self {
        let mut chapters: Vec<Chapter> = Vec::new();
        let mut current: Option<usize> = None;

        for line in text.lines() {
            if let Some(heading) = line.strip_prefix("# ") {
                let heading = heading.trim();
                let index = match chapters.iter().position(|c| c.title == heading) {
                    Some(existing) => existing,
                    None => {
                        chapters.push(Chapter {
                            title: heading.to_string(),
                            chunks: Vec::new(),
                        });
                        chapters.len() - 1
                    }
                };
                current = Some(index);
                continue;
            }

            let Some(index) = current else {
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            chapters[index]
                .chunks
                .extend(split_chunk(line, max_chunk_bytes));
        }

        Self {
            title: title.to_string(),
            chapters,
        }
    }

    pub fn characters(&self) -> usize {
        self.chapters.iter().map(Chapter::characters).sum()
    }
}

/// Split `text` into trimmed pieces of at most `max_bytes` UTF-8 bytes.
///
/// Breaks at sentence ends first, then at whitespace, and only cuts inside
/// a word when a single word is longer than `max_bytes`.
pub fn split_chunk(text: &str, max_bytes: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.len() <= max_bytes {
        return vec![trimmed.to_string()];
    }
    pack(sentences(trimmed), max_bytes, split_words)
}

fn split_words(text: &str, max_bytes: usize) -> Vec<String> {
    pack(
        text.split_inclusive(char::is_whitespace).collect(),
        max_bytes,
        split_chars,
    )
}

fn split_chars(text: &str, max_bytes: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        // A char wider than max_bytes still goes out alone
        if !current.is_empty() && current.len() + c.len_utf8() > max_bytes {
            pieces.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Greedily join `units` into pieces of at most `max_bytes`, handing units
/// that are too long on their own to `oversized`.
fn pack(units: Vec<&str>, max_bytes: usize, oversized: fn(&str, usize) -> Vec<String>) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, pieces: &mut Vec<String>| {
        let piece = current.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        current.clear();
    };

    for unit in units {
        if current.len() + unit.len() <= max_bytes {
            current.push_str(unit);
            continue;
        }
        flush(&mut current, &mut pieces);
        if unit.trim().len() <= max_bytes {
            current.push_str(unit);
        } else {
            pieces.extend(oversized(unit.trim(), max_bytes));
        }
    }
    flush(&mut current, &mut pieces);
    pieces
}

/// Sentence-sized slices of `text`, each ending after `.`, `!` or `?`
/// that is followed by whitespace. Concatenated they give back `text`.
fn sentences(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_index, next)) = chars.peek()
            && next.is_whitespace()
        {
            pieces.push(&text[start..next_index]);
            start = next_index;
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
