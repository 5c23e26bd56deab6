//! Splits documents into text units.
//!
//! Chunks are cut on paragraph boundaries where possible, then on sentence
//! boundaries, and only as a last resort on a fixed character count. Every
//! unit's text is an exact slice of the document text, so `start_offset` and
//! `end_offset` (byte offsets) always point back at the source.

use sieve_config::ChunkingConfig;
use sieve_core::{Document, TextUnit};

/// Configuration for chunking, in characters.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Target size of each chunk.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
    /// A trailing chunk shorter than this is merged into its predecessor.
    pub min_chunk_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            min_chunk_size: 100,
        }
    }
}

impl ChunkConfig {
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap,
            min_chunk_size: config.min_chunk_size,
        }
    }
}

/// Byte range into the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

/// Content chunker for splitting text.
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    /// Create a new chunker with the given configuration.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Create a chunker with default configuration.
    pub fn default_chunker() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// Split a document into units carrying its metadata, offsets and id.
    pub fn split(&self, document: &Document) -> Vec<TextUnit> {
        self.split_spans(&document.text)
            .into_iter()
            .enumerate()
            .map(|(index, span)| {
                TextUnit::with_raw_metadata(
                    format!("{}#{}", document.id, index),
                    &document.text[span.start..span.end],
                    document.metadata.clone(),
                )
                .with_metadata("chunk_index", index)
                .with_offsets(span.start, span.end)
                .with_source_ref(document.id.clone())
            })
            .collect()
    }

    fn split_spans(&self, text: &str) -> Vec<Span> {
        let pieces = self.pieces(text);
        if pieces.is_empty() {
            return vec![];
        }

        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut chunks: Vec<Span> = Vec::new();
        let mut i = 0;

        while i < pieces.len() {
            let start = pieces[i].start;
            let mut j = i;
            while j + 1 < pieces.len() && char_len(text, start, pieces[j + 1].end) <= size {
                j += 1;
            }
            let end = pieces[j].end;
            chunks.push(Span { start, end });

            if j + 1 >= pieces.len() {
                break;
            }

            // Restart at the earliest piece that fits in the overlap window and
            // still leaves room for the next new piece.
            let next_end = pieces[j + 1].end;
            i = (i + 1..=j)
                .find(|&k| {
                    char_len(text, pieces[k].start, end) <= overlap
                        && char_len(text, pieces[k].start, next_end) <= size
                })
                .unwrap_or(j + 1);
        }

        if chunks.len() > 1 {
            let last = chunks[chunks.len() - 1];
            if char_len(text, last.start, last.end) < self.config.min_chunk_size {
                chunks.pop();
                if let Some(prev) = chunks.last_mut() {
                    prev.end = last.end;
                }
            }
        }

        chunks
    }

    /// Paragraphs, with oversized ones broken into sentences and oversized
    /// sentences broken into fixed windows.
    fn pieces(&self, text: &str) -> Vec<Span> {
        let mut pieces = Vec::new();
        for para in paragraphs(text) {
            if char_len(text, para.start, para.end) <= self.config.chunk_size {
                pieces.push(para);
                continue;
            }
            for sentence in sentences(text, para) {
                if char_len(text, sentence.start, sentence.end) <= self.config.chunk_size {
                    pieces.push(sentence);
                } else {
                    pieces.extend(windows(text, sentence, self.config.chunk_size));
                }
            }
        }
        pieces
    }
}

fn char_len(text: &str, start: usize, end: usize) -> usize {
    text[start..end].chars().count()
}

fn trim_span(text: &str, start: usize, end: usize) -> Option<Span> {
    let slice = &text[start..end];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = slice.len() - slice.trim_start().len();
    Some(Span {
        start: start + lead,
        end: start + lead + trimmed.len(),
    })
}

/// Maximal runs of non-blank lines.
fn paragraphs(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut pos = 0;

    for line in text.split_inclusive('\n') {
        let line_start = pos;
        pos += line.len();
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                spans.extend(trim_span(text, s, line_start));
            }
        } else if start.is_none() {
            start = Some(line_start);
        }
    }
    if let Some(s) = start {
        spans.extend(trim_span(text, s, pos));
    }

    spans
}

/// Sentences ending in `.`, `!` or `?` followed by whitespace or the end.
fn sentences(text: &str, within: Span) -> Vec<Span> {
    let slice = &text[within.start..within.end];
    let mut spans = Vec::new();
    let mut start = 0;
    let mut chars = slice.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = match chars.peek() {
                None => true,
                Some((_, next)) => next.is_whitespace(),
            };
            if at_boundary {
                let end = i + c.len_utf8();
                spans.extend(trim_span(text, within.start + start, within.start + end));
                start = end;
            }
        }
    }
    if start < slice.len() {
        spans.extend(trim_span(text, within.start + start, within.end));
    }

    spans
}

/// Fixed windows of `size` characters, for content without natural breaks.
fn windows(text: &str, within: Span, size: usize) -> Vec<Span> {
    let slice = &text[within.start..within.end];
    let mut spans = Vec::new();
    let mut window_start = 0;
    let mut count = 0;

    for (i, _) in slice.char_indices() {
        if count == size {
            spans.extend(trim_span(text, within.start + window_start, within.start + i));
            window_start = i;
            count = 0;
        }
        count += 1;
    }
    spans.extend(trim_span(text, within.start + window_start, within.end));

    spans
}
