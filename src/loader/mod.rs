//! Pull-based loader protocol for streaming a sparse matrix one chunk at a time.
//!
//! A chunk is a slice of one column: the stored values, their row indices and
//! the column index. The buffers behind a chunk belong to the innermost source
//! and are reused on every `load()`. Views handed out by [`MatrixLoader::chunk`]
//! and [`MatrixLoader::chunk_mut`] borrow the loader, so they cannot outlive the
//! next call to `load()`; copy the data out if it is needed longer.

mod csc;
mod fuse;

pub use csc::CscLoader;
pub use fuse::{Fuse, LoaderState};

/// Read-only view of the chunk a loader currently holds.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub values: &'a [f64],
    pub rows: &'a [u32],
    pub col: u32,
}

/// Mutable view of the current chunk. Only the values may be rewritten.
#[derive(Debug)]
pub struct ChunkMut<'a> {
    pub values: &'a mut [f64],
    pub rows: &'a [u32],
    pub col: u32,
}

impl Chunk<'static> {
    pub const EMPTY: Chunk<'static> = Chunk {
        values: &[],
        rows: &[],
        col: 0,
    };
}

impl<'a> Chunk<'a> {
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + 'a {
        let (rows, values) = (self.rows, self.values);
        rows.iter().copied().zip(values.iter().copied())
    }
}

impl ChunkMut<'_> {
    pub fn capacity(&self) -> usize {
        self.values.len()
    }
}

pub trait MatrixLoader {
    /// Number of rows in the logical matrix.
    fn rows(&self) -> u32;

    /// Number of columns in the logical matrix.
    fn cols(&self) -> u32;

    /// Advance to the next chunk.
    ///
    /// `Ok(true)` leaves a populated chunk behind, `Ok(false)` signals that the
    /// matrix has been fully emitted and `Err` reports an upstream failure.
    fn load(&mut self) -> anyhow::Result<bool>;

    /// Rewind to before the first chunk.
    fn restart(&mut self) -> anyhow::Result<()>;

    fn chunk(&self) -> Chunk<'_>;

    fn chunk_mut(&mut self) -> ChunkMut<'_>;

    fn capacity(&self) -> usize {
        self.chunk().capacity()
    }

    fn val_data(&self) -> &[f64] {
        self.chunk().values
    }

    fn val_data_mut(&mut self) -> &mut [f64] {
        self.chunk_mut().values
    }

    fn row_data(&self) -> &[u32] {
        self.chunk().rows
    }

    fn current_col(&self) -> u32 {
        self.chunk().col
    }
}

impl<L: MatrixLoader + ?Sized> MatrixLoader for Box<L> {
    fn rows(&self) -> u32 {
        (**self).rows()
    }

    fn cols(&self) -> u32 {
        (**self).cols()
    }

    fn load(&mut self) -> anyhow::Result<bool> {
        (**self).load()
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        (**self).restart()
    }

    fn chunk(&self) -> Chunk<'_> {
        (**self).chunk()
    }

    fn chunk_mut(&mut self) -> ChunkMut<'_> {
        (**self).chunk_mut()
    }
}

impl<L: MatrixLoader + ?Sized> MatrixLoader for &mut L {
    fn rows(&self) -> u32 {
        (**self).rows()
    }

    fn cols(&self) -> u32 {
        (**self).cols()
    }

    fn load(&mut self) -> anyhow::Result<bool> {
        (**self).load()
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        (**self).restart()
    }

    fn chunk(&self) -> Chunk<'_> {
        (**self).chunk()
    }

    fn chunk_mut(&mut self) -> ChunkMut<'_> {
        (**self).chunk_mut()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::VecLoader;
    use super::*;

    #[test]
    fn test_default_accessors() {
        let mut loader = VecLoader::new(5, 1, vec![(0, vec![0, 2, 4], vec![1.0, 5.0, 3.0])]);
        assert!(loader.load().unwrap());
        assert_eq!(loader.capacity(), 3);
        assert_eq!(loader.row_data(), &[0, 2, 4]);
        assert_eq!(loader.val_data(), &[1.0, 5.0, 3.0]);
        assert_eq!(loader.current_col(), 0);

        loader.val_data_mut()[1] = 2.0;
        assert_eq!(loader.val_data(), &[1.0, 2.0, 3.0]);
        assert!(!loader.load().unwrap());
    }

    #[test]
    fn test_chunk_iter() {
        let mut loader = VecLoader::new(3, 2, vec![(1, vec![2, 0], vec![7.0, 8.0])]);
        loader.load().unwrap();
        let pairs: Vec<_> = loader.chunk().iter().collect();
        assert_eq!(pairs, vec![(2, 7.0), (0, 8.0)]);
        assert_eq!(Chunk::EMPTY.capacity(), 0);
    }

    #[test]
    fn test_boxed_loader_forwards() {
        let mut boxed: Box<dyn MatrixLoader> =
            Box::new(VecLoader::new(2, 1, vec![(0, vec![1], vec![4.0])]));
        assert_eq!((boxed.rows(), boxed.cols()), (2, 1));
        assert!(boxed.load().unwrap());
        assert_eq!(boxed.val_data(), &[4.0]);
        boxed.restart().unwrap();
        assert!(boxed.load().unwrap());
        assert!(!boxed.load().unwrap());
    }
}
