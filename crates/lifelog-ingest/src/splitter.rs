//! Recursive character text splitter.
//!
//! Text is split on the first separator that occurs in it (paragraph,
//! line, word, then character). Pieces still longer than `chunk_size` are
//! split again with the remaining separators; shorter pieces are merged
//! back into chunks of at most `chunk_size` characters, carrying up to
//! `chunk_overlap` characters from the end of one chunk into the next.
//!
//! Lengths are counted in `char`s. Separators stay attached to the start
//! of the piece that follows them, and every chunk is trimmed.

use std::collections::VecDeque;

use lifelog_core::{Error, Result};

/// Separators tried in order, coarsest first.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits long sentences into overlapping chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter with the default separators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut short: Vec<String> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge(&short));
                short.clear();
            }
            if finer.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, finer));
            }
        }
        if !short.is_empty() {
            chunks.extend(self.merge(&short));
        }
        chunks
    }

    /// Greedily pack short pieces into chunks with overlap.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }
        push_joined(&mut chunks, &window);
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split on `separator`, keeping it at the start of the following piece.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        pieces.push(&text[start..idx]);
        start = idx;
    }
    pieces.push(&text[start..]);
    pieces
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
