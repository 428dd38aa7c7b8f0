//! Document chunking.
//!
//! Splits documents into overlapping chunks sized for embedding. Fenced
//! code blocks are treated as atomic units so that examples never get
//! split mid-snippet, and prose is divided along a ladder of separators
//! from headings down to single characters.

use crate::types::{approx_token_count, DocumentChunk};
use std::collections::HashMap;

/// Separator ladder, coarsest first. The empty string is the terminal
/// rung: split at character boundaries when nothing else fits.
const SEPARATORS: &[&str] = &["\n## ", "\n\n", "\n", ". ", " ", ""];

const FENCE: &str = "```";

/// Splits document text into size-bounded, overlapping chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    /// Target maximum chunk size in approximate tokens
    chunk_size: usize,

    /// Tokens of trailing context carried into the next chunk
    chunk_overlap: usize,

    /// Chunks smaller than this are discarded
    min_chunk_size: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, min_chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_chunk_size,
        }
    }

    /// Chunk a document into overlapping pieces.
    ///
    /// Every produced chunk carries the given source metadata. Chunks
    /// below the minimum size are dropped; an empty or whitespace-only
    /// document produces no chunks.
    pub fn chunk(&self, text: &str, source: &HashMap<String, String>) -> Vec<DocumentChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        for segment in split_code_fences(text) {
            match segment {
                Segment::Code(block) => {
                    // Atomic: a fenced block is never split, even when it
                    // exceeds the target size.
                    pieces.push(block.to_string());
                }
                Segment::Prose(prose) => {
                    self.split_recursive(prose, SEPARATORS, &mut pieces);
                }
            }
        }

        let merged = self.merge_with_overlap(&pieces);

        merged
            .into_iter()
            .filter(|text| effective_token_count(text) >= self.min_chunk_size)
            .map(|text| DocumentChunk::new(text, source.clone()))
            .collect()
    }

    /// Recursively split a span along the separator ladder until every
    /// piece fits within the chunk size.
    fn split_recursive(&self, text: &str, separators: &[&str], out: &mut Vec<String>) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        if approx_token_count(trimmed) <= self.chunk_size {
            out.push(trimmed.to_string());
            return;
        }

        let (separator, rest) = match separators.split_first() {
            Some(pair) => pair,
            None => {
                out.push(trimmed.to_string());
                return;
            }
        };

        if separator.is_empty() {
            // Terminal rung: hard split at character boundaries.
            let max_chars = self.chunk_size * 4;
            let chars: Vec<char> = trimmed.chars().collect();
            for window in chars.chunks(max_chars.max(1)) {
                out.push(window.iter().collect());
            }
            return;
        }

        let parts: Vec<&str> = trimmed.split(separator).collect();
        if parts.len() == 1 {
            // Separator not present, try the next rung.
            self.split_recursive(trimmed, rest, out);
            return;
        }

        for (i, part) in parts.iter().enumerate() {
            // Re-attach the separator prefix lost by split() so heading
            // markers and sentence endings survive in the output.
            let piece = if i == 0 {
                part.to_string()
            } else {
                format!("{}{}", separator.trim_start_matches('\n'), part)
            };
            if approx_token_count(&piece) <= self.chunk_size {
                if !piece.trim().is_empty() {
                    out.push(piece.trim().to_string());
                }
            } else {
                self.split_recursive(&piece, rest, out);
            }
        }
    }

    /// Greedily merge pieces up to the chunk size, carrying an overlap
    /// tail from each emitted chunk into the next.
    ///
    /// The overlap seed counts against the chunk size budget, so a merged
    /// chunk never exceeds `chunk_size` tokens; only an atomic code block
    /// larger than the budget can produce an oversized chunk.
    fn merge_with_overlap(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for piece in pieces {
            let piece_tokens = approx_token_count(piece);
            if !current.is_empty()
                && approx_token_count(&current) + piece_tokens + 1 > self.chunk_size
            {
                let tail = self.overlap_tail(&current);
                chunks.push(std::mem::take(&mut current));
                // Seed the next chunk with the tail only when the incoming
                // piece still fits next to it within the budget.
                if approx_token_count(&tail) + piece_tokens + 1 <= self.chunk_size {
                    current = tail;
                }
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(piece);
        }

        if !current.trim().is_empty() {
            chunks.push(current);
        }

        chunks
    }

    /// Trailing words of a chunk amounting to roughly `chunk_overlap`
    /// tokens, used as the seed of the next chunk.
    fn overlap_tail(&self, text: &str) -> String {
        if self.chunk_overlap == 0 {
            return String::new();
        }
        let max_chars = self.chunk_overlap * 4;
        let words: Vec<&str> = text.split_whitespace().collect();

        let mut tail: Vec<&str> = Vec::new();
        let mut chars = 0;
        for word in words.iter().rev() {
            chars += word.chars().count() + 1;
            if chars > max_chars {
                break;
            }
            tail.push(word);
        }
        tail.reverse();
        tail.join(" ")
    }
}

/// Token count of a chunk's effective content.
///
/// Heading markers and whitespace-only lines carry no information, so
/// they do not count toward the minimum chunk size.
fn effective_token_count(text: &str) -> usize {
    let stripped = text
        .lines()
        .map(|line| line.trim_start().trim_start_matches('#').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    approx_token_count(&stripped)
}

enum Segment<'a> {
    Prose(&'a str),
    Code(&'a str),
}

/// Split text into alternating prose and fenced-code segments.
///
/// An unterminated fence runs to the end of the document and is treated
/// as code.
fn split_code_fences(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut remaining = text;

    while let Some(open) = remaining.find(FENCE) {
        let (prose, rest) = remaining.split_at(open);
        if !prose.trim().is_empty() {
            segments.push(Segment::Prose(prose));
        }

        let after_open = &rest[FENCE.len()..];
        match after_open.find(FENCE) {
            Some(close) => {
                let block_end = FENCE.len() + close + FENCE.len();
                segments.push(Segment::Code(&rest[..block_end]));
                remaining = &rest[block_end..];
            }
            None => {
                segments.push(Segment::Code(rest));
                return segments;
            }
        }
    }

    if !remaining.trim().is_empty() {
        segments.push(Segment::Prose(remaining));
    }

    segments
}
