use std::ops::Range;

use anyhow::{anyhow, bail};
use nalgebra_sparse::CscMatrix;
use num_traits::ToPrimitive;

use super::{Chunk, ChunkMut, MatrixLoader};

/// Chunked source over an in-memory CSC matrix.
///
/// Each chunk holds (part of) one column. Values are converted to `f64` into
/// buffers owned by the loader and reused across loads.
pub struct CscLoader<'a, T> {
    matrix: &'a CscMatrix<T>,
    col_range: Range<usize>,
    chunk_size: usize,
    next_col: usize,
    next_offset: usize,
    values: Vec<f64>,
    row_idx: Vec<u32>,
    col: u32,
}

impl<'a, T> CscLoader<'a, T>
where
    T: ToPrimitive + Copy,
{
    pub fn new(matrix: &'a CscMatrix<T>) -> anyhow::Result<Self> {
        if u32::try_from(matrix.nrows()).is_err() || u32::try_from(matrix.ncols()).is_err() {
            bail!(
                "Matrix shape {}x{} exceeds the u32 index range",
                matrix.nrows(),
                matrix.ncols()
            );
        }
        Ok(CscLoader {
            matrix,
            col_range: 0..matrix.ncols(),
            chunk_size: usize::MAX,
            next_col: 0,
            next_offset: 0,
            values: Vec::new(),
            row_idx: Vec::new(),
            col: 0,
        })
    }

    /// Cap the number of entries per chunk; longer columns span several chunks.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> anyhow::Result<Self> {
        if chunk_size == 0 {
            bail!("Chunk size must be positive");
        }
        self.chunk_size = chunk_size;
        Ok(self)
    }

    /// Only emit columns in `range`. Column indices stay global.
    pub fn with_col_range(mut self, range: Range<usize>) -> anyhow::Result<Self> {
        if range.start > range.end || range.end > self.matrix.ncols() {
            bail!(
                "Column range {:?} out of bounds for {} columns",
                range,
                self.matrix.ncols()
            );
        }
        self.next_col = range.start;
        self.col_range = range;
        Ok(self)
    }
}

impl<T> MatrixLoader for CscLoader<'_, T>
where
    T: ToPrimitive + Copy,
{
    fn rows(&self) -> u32 {
        self.matrix.nrows() as u32
    }

    fn cols(&self) -> u32 {
        self.matrix.ncols() as u32
    }

    fn load(&mut self) -> anyhow::Result<bool> {
        let offsets = self.matrix.col_offsets();

        // Skip empty columns and columns already fully emitted.
        while self.next_col < self.col_range.end
            && offsets[self.next_col] + self.next_offset >= offsets[self.next_col + 1]
        {
            self.next_col += 1;
            self.next_offset = 0;
        }
        if self.next_col >= self.col_range.end {
            self.values.clear();
            self.row_idx.clear();
            return Ok(false);
        }

        let start = offsets[self.next_col] + self.next_offset;
        let end = offsets[self.next_col + 1].min(start.saturating_add(self.chunk_size));

        self.values.clear();
        for v in &self.matrix.values()[start..end] {
            let v = v
                .to_f64()
                .ok_or_else(|| anyhow!("Failed to convert value in column {} to f64", self.next_col))?;
            self.values.push(v);
        }
        self.row_idx.clear();
        self.row_idx
            .extend(self.matrix.row_indices()[start..end].iter().map(|&r| r as u32));
        self.col = self.next_col as u32;
        self.next_offset += end - start;
        Ok(true)
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        self.next_col = self.col_range.start;
        self.next_offset = 0;
        self.values.clear();
        self.row_idx.clear();
        Ok(())
    }

    fn chunk(&self) -> Chunk<'_> {
        Chunk {
            values: &self.values,
            rows: &self.row_idx,
            col: self.col,
        }
    }

    fn chunk_mut(&mut self) -> ChunkMut<'_> {
        ChunkMut {
            values: &mut self.values,
            rows: &self.row_idx,
            col: self.col,
        }
    }
}
