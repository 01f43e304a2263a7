//! Markdown-aware text splitting.
//!
//! Each chunk ends at the strongest boundary available inside its window:
//! headings, code fences, rules, paragraphs, lines, sentences, then words.
//! A window with no boundary at all is cut hard at `chunk_size`. Sizes and
//! overlaps are measured in characters. Chunk text is a verbatim slice of
//! the input, so dropping each chunk's leading overlap reconstructs it.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Upper bound on chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks. Must be below `chunk_size`.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// 0-based ordinal; becomes the point id in the vector index.
    pub index: usize,
    pub text: String,
    /// Byte offsets into the source text.
    pub start: usize,
    pub end: usize,
}

#[derive(Clone, Copy)]
enum CutAt {
    /// Boundary is just after the leading newline of the match, so the
    /// matched construct opens the next chunk.
    AfterNewline,
    MatchEnd,
}

struct Separator {
    pattern: Regex,
    cut: CutAt,
}

fn separators() -> &'static [Separator] {
    static SEPARATORS: OnceLock<Vec<Separator>> = OnceLock::new();
    SEPARATORS.get_or_init(|| {
        [
            (r"\n#{1,6} ", CutAt::AfterNewline),
            (r"\n```", CutAt::AfterNewline),
            (r"\n(?:\*{3,}|-{3,}|_{3,})\n", CutAt::MatchEnd),
            (r"\n[ \t]*\n", CutAt::MatchEnd),
            (r"\n", CutAt::MatchEnd),
            (r"[.!?]\s+", CutAt::MatchEnd),
            (r"\s+", CutAt::MatchEnd),
        ]
        .into_iter()
        .map(|(pattern, cut)| Separator {
            pattern: Regex::new(pattern).expect("static separator pattern"),
            cut,
        })
        .collect()
    })
}

#[derive(Debug, Clone)]
pub struct MarkdownChunker {
    config: ChunkingConfig,
}

impl MarkdownChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        let mut config = config;
        if config.chunk_size == 0 {
            tracing::warn!("chunk_size 0 is invalid; using 1");
            config.chunk_size = 1;
        }
        if config.overlap >= config.chunk_size {
            let clamped = config.chunk_size - 1;
            tracing::warn!(
                "overlap {} is not below chunk_size {}; clamping to {}",
                config.overlap,
                config.chunk_size,
                clamped
            );
            config.overlap = clamped;
        }
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Splits `text` into ordered, overlapping chunks. Empty or
    /// whitespace-only input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let ChunkingConfig {
            chunk_size,
            overlap,
        } = self.config;

        // Byte offset of every char, plus a sentinel for the end of text.
        let mut offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        let total = offsets.len();
        offsets.push(text.len());
        let chars: Vec<char> = text.chars().collect();

        let levels = boundary_levels(text, &offsets);

        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let limit = start + chunk_size;
            let end = if limit >= total {
                total
            } else {
                levels
                    .iter()
                    .find_map(|level| last_in_window(level, start + overlap, limit))
                    .unwrap_or(limit)
            };

            chunks.push(TextChunk {
                index: chunks.len(),
                text: text[offsets[start]..offsets[end]].to_string(),
                start: offsets[start],
                end: offsets[end],
            });

            if end >= total {
                break;
            }
            start = next_start(&chars, end, overlap);
        }

        chunks
    }
}

impl Default for MarkdownChunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

/// Convenience form returning only chunk bodies.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    MarkdownChunker::new(ChunkingConfig {
        chunk_size,
        overlap,
    })
    .split(text)
    .into_iter()
    .map(|chunk| chunk.text)
    .collect()
}

/// Sorted char positions of every boundary, one list per separator level.
fn boundary_levels(text: &str, offsets: &[usize]) -> Vec<Vec<usize>> {
    separators()
        .iter()
        .map(|sep| {
            let mut positions: Vec<usize> = sep
                .pattern
                .find_iter(text)
                .map(|m| match sep.cut {
                    CutAt::AfterNewline => m.start() + 1,
                    CutAt::MatchEnd => m.end(),
                })
                .map(|byte| offsets.partition_point(|&b| b < byte))
                .collect();
            positions.dedup();
            positions
        })
        .collect()
}

/// Last boundary `p` with `floor < p <= limit`.
fn last_in_window(boundaries: &[usize], floor: usize, limit: usize) -> Option<usize> {
    let upto = boundaries.partition_point(|&p| p <= limit);
    boundaries[..upto].last().copied().filter(|&p| p > floor)
}

/// Start of the next chunk: the first word start within the trailing
/// `overlap` characters of the previous one, else exactly `overlap` back.
fn next_start(chars: &[char], end: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return end;
    }
    let from = end - overlap;
    (from..end)
        .find(|&i| !chars[i].is_whitespace() && (i == 0 || chars[i - 1].is_whitespace()))
        .unwrap_or(from)
}
