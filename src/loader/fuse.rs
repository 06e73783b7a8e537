use log::trace;

use super::{Chunk, ChunkMut, MatrixLoader};

/// Position of a loader in its traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    NotStarted,
    HasChunk,
    Exhausted,
}

/// Loader wrapper that makes exhaustion terminal.
///
/// Once the upstream reports `Ok(false)` or an error, every later `load()`
/// returns `Ok(false)` without touching the upstream again, until `restart()`.
/// Outside of `HasChunk` the chunk accessors expose an empty chunk.
pub struct Fuse<L> {
    inner: L,
    state: LoaderState,
}

impl<L: MatrixLoader> Fuse<L> {
    pub fn new(inner: L) -> Self {
        Fuse {
            inner,
            state: LoaderState::NotStarted,
        }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn get_ref(&self) -> &L {
        &self.inner
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: MatrixLoader> MatrixLoader for Fuse<L> {
    fn rows(&self) -> u32 {
        self.inner.rows()
    }

    fn cols(&self) -> u32 {
        self.inner.cols()
    }

    fn load(&mut self) -> anyhow::Result<bool> {
        if self.state == LoaderState::Exhausted {
            return Ok(false);
        }
        match self.inner.load() {
            Ok(true) => {
                self.state = LoaderState::HasChunk;
                Ok(true)
            }
            Ok(false) => {
                trace!("loader exhausted");
                self.state = LoaderState::Exhausted;
                Ok(false)
            }
            Err(e) => {
                self.state = LoaderState::Exhausted;
                Err(e)
            }
        }
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        self.inner.restart()?;
        self.state = LoaderState::NotStarted;
        Ok(())
    }

    fn chunk(&self) -> Chunk<'_> {
        match self.state {
            LoaderState::HasChunk => self.inner.chunk(),
            _ => Chunk::EMPTY,
        }
    }

    fn chunk_mut(&mut self) -> ChunkMut<'_> {
        match self.state {
            LoaderState::HasChunk => self.inner.chunk_mut(),
            _ => ChunkMut {
                values: &mut [],
                rows: &[],
                col: 0,
            },
        }
    }
}
