//! Embedding matrix storage - memory-mapped little-endian f32 rows
//!
//! Used for both the raw embeddings written at ingestion and the normalized
//! vectors behind the flat backend. The row count is derived from the file
//! size, so a truncated file is detected on open.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::error::{RagError, RagResult};

const F32_SIZE: usize = std::mem::size_of::<f32>();

/// Read-only view over an embedding matrix file
pub struct EmbeddingsStore {
    mmap: Option<Mmap>,
    dimensions: usize,
    count: usize,
}

impl EmbeddingsStore {
    /// Open an existing embeddings file
    pub fn open(path: &Path, dimensions: usize) -> RagResult<Self> {
        if dimensions == 0 {
            return Err(RagError::corrupt(path, "embedding dimension is zero"));
        }

        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;

        let row_bytes = dimensions * F32_SIZE;
        if len % row_bytes != 0 {
            return Err(RagError::corrupt(
                path,
                format!("{} bytes is not a whole number of {}-dim rows", len, dimensions),
            ));
        }

        // Mapping an empty file fails on some platforms
        let mmap = if len == 0 {
            None
        } else {
            // Safety: index files are not modified while a build is being served
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            mmap,
            dimensions,
            count: len / row_bytes,
        })
    }

    /// Get embedding row `idx`
    #[cfg(test)]
    pub fn get(&self, idx: usize) -> Option<Vec<f32>> {
        if idx >= self.count {
            return None;
        }
        let mmap = self.mmap.as_ref()?;

        let row_bytes = self.dimensions * F32_SIZE;
        let start = idx * row_bytes;
        let row = &mmap[start..start + row_bytes];

        Some(
            row.chunks_exact(F32_SIZE)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    /// Copy the whole matrix into one contiguous row-major buffer
    pub fn to_flat_vec(&self) -> Vec<f32> {
        match &self.mmap {
            Some(mmap) => mmap
                .chunks_exact(F32_SIZE)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Get number of embeddings
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Writer for creating embeddings storage
pub struct EmbeddingsWriter {
    writer: BufWriter<File>,
    dimensions: usize,
    count: usize,
}

impl EmbeddingsWriter {
    /// Create a new embeddings file
    pub fn create(path: &Path, dimensions: usize) -> RagResult<Self> {
        let file = File::create(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            dimensions,
            count: 0,
        })
    }

    /// Append one row
    pub fn add(&mut self, embedding: &[f32]) -> RagResult<()> {
        if embedding.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        for value in embedding {
            self.writer.write_all(&value.to_le_bytes())?;
        }
        self.count += 1;

        Ok(())
    }

    /// Flush and return the number of rows written
    pub fn finish(mut self) -> RagResult<usize> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(self.count)
    }
}

/// Write a whole matrix in one go
pub fn write_matrix(path: &Path, dimensions: usize, rows: &[Vec<f32>]) -> RagResult<usize> {
    let mut writer = EmbeddingsWriter::create(path, dimensions)?;
    for row in rows {
        writer.add(row)?;
    }
    writer.finish()
}
