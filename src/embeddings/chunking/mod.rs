
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A window of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk text, a contiguous substring of the source
    pub content: String,
    /// Position of this chunk in the sequence
    pub chunk_index: usize,
    /// Offset of the first character, counted in chars
    pub char_offset: usize,
}

/// Configuration for text chunking, measured in characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            chunk_overlap: 1_000,
        }
    }
}

/// Split text into overlapping windows, cutting at paragraph, sentence or
/// word boundaries when one is available.
///
/// Chunk `i + 1` always starts with the last `chunk_overlap` characters of
/// chunk `i`, so the source can be rebuilt by dropping that prefix from
/// every chunk after the first.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    if text.trim().is_empty() || config.chunk_size == 0 {
        return Vec::new();
    }

    let size = config.chunk_size;
    let overlap = config.chunk_overlap.min(size - 1);

    // Byte offset of every char, plus the end of the string
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let limit = (start + size).min(total);
        let end = if limit == total {
            total
        } else {
            find_break(&chars, start + overlap + 1, limit)
        };

        let content = text
            .get(offsets[start]..offsets[end])
            .unwrap_or_default()
            .to_string();
        chunks.push(TextChunk {
            content,
            chunk_index: chunks.len(),
            char_offset: start,
        });

        if end == total {
            break;
        }
        start = end - overlap;
    }

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        total,
        chunks.len(),
        size,
        overlap
    );

    chunks
}

/// Pick the cut position in `min..=max`, preferring the latest paragraph
/// break, then sentence end, then word boundary. Falls back to `max`.
fn find_break(chars: &[char], min: usize, max: usize) -> usize {
    let candidates = (min..=max).rev();

    let paragraph = candidates
        .clone()
        .find(|&pos| pos >= 2 && chars[pos - 1] == '\n' && chars[pos - 2] == '\n');
    if let Some(pos) = paragraph {
        return pos;
    }

    let sentence = candidates.clone().find(|&pos| {
        pos >= 2 && chars[pos - 1].is_whitespace() && matches!(chars[pos - 2], '.' | '!' | '?')
    });
    if let Some(pos) = sentence {
        return pos;
    }

    candidates
        .clone()
        .find(|&pos| pos >= 1 && chars[pos - 1].is_whitespace())
        .unwrap_or(max)
}

/// Join chunks back into the source text by dropping each overlap
#[inline]
pub fn reassemble(chunks: &[TextChunk], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(&chunk.content);
        } else {
            text.extend(chunk.content.chars().skip(overlap));
        }
    }
    text
}
