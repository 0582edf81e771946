//! Text chunking
//!
//! Knowledge-base documents are split into fixed-size, overlapping windows
//! measured in characters (never bytes, so multi-byte text is split safely).
//! Boundaries depend only on the text and the window parameters, which keeps
//! re-seeding deterministic.

use crate::config::ChunkConfig;
use crate::error::{Error, Result};
use blake3::Hasher;

/// A text chunk with its position in the source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The actual text content
    pub text: String,

    /// Character start position in original document
    pub char_start: usize,

    /// Character end position in original document
    pub char_end: usize,

    /// Chunk index (0-based)
    pub index: usize,

    /// Blake3 hash of the chunk text
    pub hash: String,
}

/// Hash of arbitrary text, hex encoded
pub fn compute_text_hash(text: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Split `text` into windows of at most `size` characters, each starting
/// `size - overlap` characters after the previous one.
///
/// Text no longer than `size` comes back as a single chunk (empty text
/// included). The last window may be shorter than `size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(chunk_windows(text, size, overlap)?
        .into_iter()
        .map(|chunk| chunk.text)
        .collect())
}

/// Chunk a document body using the configured window
pub fn chunk_document(text: &str, config: &ChunkConfig) -> Result<Vec<TextChunk>> {
    chunk_windows(text, config.max_chars, config.overlap_chars)
}

fn chunk_windows(text: &str, size: usize, overlap: usize) -> Result<Vec<TextChunk>> {
    if size == 0 {
        return Err(Error::InvalidInput(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if overlap >= size {
        return Err(Error::InvalidInput(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, size
        )));
    }

    // Byte offset of every char, plus the end of the string
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = offsets.len() - 1;

    if char_len <= size {
        return Ok(vec![TextChunk {
            text: text.to_string(),
            char_start: 0,
            char_end: char_len,
            index: 0,
            hash: compute_text_hash(text),
        }]);
    }

    let step = size - overlap;
    let mut chunks = Vec::with_capacity(char_len / step + 1);
    let mut start = 0;

    loop {
        let end = (start + size).min(char_len);
        let slice = &text[offsets[start]..offsets[end]];
        chunks.push(TextChunk {
            text: slice.to_string(),
            char_start: start,
            char_end: end,
            index: chunks.len(),
            hash: compute_text_hash(slice),
        });

        if end == char_len {
            break;
        }
        start += step;
    }

    Ok(chunks)
}
