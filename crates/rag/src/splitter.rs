//! Recursive character text splitter.
//!
//! Produces overlapping windows of at most `chunk_size` characters,
//! preferring to break on paragraph, line, sentence and word boundaries
//! before falling back to a hard cut. Sizes are counted in Unicode scalar
//! values, so multi-byte text is never cut inside a character.

use codexplain_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Break candidates, highest priority first. A group is searched as a
/// whole and its latest match in the window wins.
const SEPARATORS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// Splitter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Byte range of one chunk inside the text passed to
/// [`TextSplitter::split_spans`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub start: usize,
    pub end: usize,
}

impl ChunkSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Deterministic overlapping-window splitter.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// Create a splitter, rejecting configurations that cannot make progress.
    pub fn new(config: SplitterConfig) -> AppResult<Self> {
        if config.chunk_size == 0 {
            return Err(AppError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split text into trimmed, non-empty chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_spans(text)
            .into_iter()
            .map(|span| text[span.range()].trim())
            .filter(|chunk| !chunk.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Compute chunk boundaries.
    ///
    /// Spans index into `text` and together cover its trimmed region:
    /// the first starts at the first non-whitespace character, the last
    /// ends after the last one, and each span starts at or before the
    /// end of the previous span.
    pub fn split_spans(&self, text: &str) -> Vec<ChunkSpan> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let base = text.len() - text.trim_start().len();
        let chars: Vec<(usize, char)> = trimmed.char_indices().collect();
        let total = chars.len();
        let byte_at = |idx: usize| {
            if idx == total {
                trimmed.len()
            } else {
                chars[idx].0
            }
        };

        let size = self.config.chunk_size;
        let mut spans = Vec::new();
        let mut start = 0;

        loop {
            if total - start <= size {
                spans.push(ChunkSpan {
                    start: base + byte_at(start),
                    end: base + trimmed.len(),
                });
                break;
            }

            let window_end = start + size;
            let end = self
                .find_break(trimmed, &chars, byte_at(start), byte_at(window_end), start)
                .unwrap_or(window_end);

            spans.push(ChunkSpan {
                start: base + byte_at(start),
                end: base + byte_at(end),
            });

            start = self.next_start(&chars, end);
        }

        tracing::debug!(
            "Split {} chars into {} chunks (size {}, overlap {})",
            total,
            spans.len(),
            size,
            self.config.chunk_overlap
        );

        spans
    }

    /// Char index just past the best separator in the window, if any
    /// yields a chunk longer than the overlap.
    fn find_break(
        &self,
        text: &str,
        chars: &[(usize, char)],
        window_start: usize,
        window_end: usize,
        start: usize,
    ) -> Option<usize> {
        let window = &text[window_start..window_end];

        for group in SEPARATORS {
            let best = group
                .iter()
                .filter_map(|sep| window.rfind(sep).map(|pos| pos + sep.len()))
                .max();

            if let Some(rel_end) = best {
                let byte_end = window_start + rel_end;
                let end = chars.partition_point(|(offset, _)| *offset < byte_end);
                if end - start > self.config.chunk_overlap {
                    return Some(end);
                }
            }
        }

        None
    }

    /// Start of the next window: `chunk_overlap` chars before `end`,
    /// moved forward to a word start when that lands inside a word.
    fn next_start(&self, chars: &[(usize, char)], end: usize) -> usize {
        let overlap = self.config.chunk_overlap;
        if overlap == 0 {
            return end;
        }

        let next = end - overlap;
        if chars[next - 1].1.is_whitespace() {
            return next;
        }

        chars[next..end]
            .iter()
            .position(|(_, c)| c.is_whitespace())
            .map(|i| next + i + 1)
            .unwrap_or(next)
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            config: SplitterConfig::default(),
        }
    }
}
