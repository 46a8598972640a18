//! Fixed-size sliding window chunking.
//!
//! Windows are measured in characters (Unicode scalar values) so multi-byte
//! text never gets split inside a code point.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Document;

pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const DEFAULT_CHUNK_OVERLAP: usize = 128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkConfigError {
    #[error("Chunk size must be greater than zero")]
    ZeroSize,
    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    size: usize,
    overlap: usize,
}

impl ChunkConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkConfigError> {
        if size == 0 {
            return Err(ChunkConfigError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkConfigError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// A window of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk within its document.
    pub index: usize,
    /// Character offset of the first character in the document.
    pub offset: usize,
    pub text: String,
    pub source: String,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let source = document.source.display().to_string();
        split_text(&document.text, self.config)
            .into_iter()
            .enumerate()
            .map(|(index, (offset, text))| Chunk {
                index,
                offset,
                text: text.to_string(),
                source: source.clone(),
            })
            .collect()
    }
}

/// Returns `(char_offset, slice)` pairs. Every window starts `step` characters
/// after the previous one and the last window ends at the end of `text`.
fn split_text(text: &str, config: ChunkConfig) -> Vec<(usize, &str)> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte position of every char boundary, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + config.size).min(char_count);
        windows.push((start, &text[boundaries[start]..boundaries[end]]));
        if end == char_count {
            break;
        }
        start += config.step();
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new(text, "test.txt")
    }

    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&chunk.text);
            } else {
                out.extend(chunk.text.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        assert_eq!(
            ChunkConfig::new(10, 10),
            Err(ChunkConfigError::OverlapTooLarge { size: 10, overlap: 10 })
        );
        assert!(ChunkConfig::new(10, 12).is_err());
        assert_eq!(ChunkConfig::new(0, 0), Err(ChunkConfigError::ZeroSize));
        assert!(ChunkConfig::new(10, 9).is_ok());
    }

    #[test]
    fn test_short_document_is_single_chunk() {
        let chunker = Chunker::new(ChunkConfig::new(100, 10).unwrap());
        let chunks = chunker.split(&doc("The clinic opens at 9am."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "The clinic opens at 9am.");
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[0].source, "test.txt");
    }

    #[test]
    fn test_empty_document_has_no_chunks() {
        let chunker = Chunker::default();
        assert!(chunker.split(&doc("")).is_empty());
    }

    #[test]
    fn test_adjacent_chunks_share_exactly_overlap() {
        let text: String = (0..500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for (size, overlap) in [(10, 0), (10, 3), (64, 16), (7, 6), (500, 10), (499, 1)] {
            let config = ChunkConfig::new(size, overlap).unwrap();
            let chunks = Chunker::new(config).split(&doc(&text));
            for pair in chunks.windows(2) {
                let prev: Vec<char> = pair[0].text.chars().collect();
                let next: Vec<char> = pair[1].text.chars().collect();
                assert_eq!(prev.len(), size, "only the last chunk may be short");
                assert_eq!(&prev[size - overlap..], &next[..overlap]);
                assert_eq!(pair[1].offset, pair[0].offset + size - overlap);
            }
            assert_eq!(reconstruct(&chunks, overlap), text, "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn test_multibyte_text_reconstructs() {
        let text = "診所早上九點開門。週末休息，國定假日另行公告。Café ☕ opens at 9am.";
        let config = ChunkConfig::new(8, 3).unwrap();
        let chunks = Chunker::new(config).split(&doc(text));
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.char_len() <= 8));
        assert_eq!(reconstruct(&chunks, 3), text);
    }

    #[test]
    fn test_boundaries_are_deterministic() {
        let text = "lorem ipsum dolor sit amet ".repeat(40);
        let chunker = Chunker::new(ChunkConfig::new(50, 12).unwrap());
        assert_eq!(chunker.split(&doc(&text)), chunker.split(&doc(&text)));
    }
}
