use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};

/// A window of a file's text, the unit of embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source_file: PathBuf,
    /// Offset of the first character, counted in characters
    pub start_offset: usize,
    pub text: String,
}

impl Chunk {
    /// Length of the chunk in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Offset one past the last character
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.char_len()
    }
}

/// Splits text into overlapping fixed-size windows.
///
/// Windows are measured in characters, never bytes, so a multi-byte
/// character is never cut in half.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Requires `chunk_size > 0` and `overlap < chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Validation("chunk_size must be greater than 0".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::Validation(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Number of chunks produced for a text of `len` characters
    pub fn expected_chunks(&self, len: usize) -> usize {
        let stride = self.chunk_size - self.overlap;
        len.saturating_sub(self.overlap).div_ceil(stride).max(1)
    }

    /// Split `content` into chunks attributed to `source_file`.
    ///
    /// Always yields at least one chunk; an empty text gives one empty chunk.
    pub fn chunk(&self, source_file: &Path, content: &str) -> Vec<Chunk> {
        // Byte position of every char boundary, plus the end of the text.
        let bounds: Vec<usize> = content
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(content.len()))
            .collect();
        let len = bounds.len() - 1;

        let mut chunks = Vec::with_capacity(self.expected_chunks(len));
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(len);
            chunks.push(Chunk {
                source_file: source_file.to_path_buf(),
                start_offset: start,
                text: content[bounds[start]..bounds[end]].to_string(),
            });
            if end == len {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }
}

/// One-shot chunking with explicit parameters
pub fn chunk_text(
    source_file: &Path,
    content: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(chunk_size, overlap)?.chunk(source_file, content))
}
