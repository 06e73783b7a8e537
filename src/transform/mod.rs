//! Value transforms applied to chunks as they stream through a loader stack.

mod chain;
mod fit;

pub use chain::TransformChain;
pub use fit::FitParams;

use log::trace;

use crate::loader::{Chunk, ChunkMut, MatrixLoader};

/// Lookup surface for fitted transform parameters.
///
/// Lookups are expected to be total over the index, row and column range the
/// provider was fitted for. Stages never mutate a provider, so one provider can
/// back several chains at once.
pub trait ParamProvider: Sync {
    fn global_params(&self, index: usize) -> f64;

    fn row_params(&self, index: usize, row: u32) -> f64;

    fn col_params(&self, index: usize, col: u32) -> f64;
}

impl<P: ParamProvider + ?Sized> ParamProvider for &P {
    fn global_params(&self, index: usize) -> f64 {
        (**self).global_params(index)
    }

    fn row_params(&self, index: usize, row: u32) -> f64 {
        (**self).row_params(index, row)
    }

    fn col_params(&self, index: usize, col: u32) -> f64 {
        (**self).col_params(index, col)
    }
}

/// Which axis a stage's parameter is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Global,
    Row,
    Col,
}

/// Binary operator combining a stored value with its parameter.
#[derive(Debug, Clone, Copy)]
pub enum Op {
    Min,
    Max,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Custom(fn(f64, f64) -> f64),
}

impl Op {
    #[inline]
    pub fn apply(self, value: f64, param: f64) -> f64 {
        match self {
            Op::Min => value.min(param),
            Op::Max => value.max(param),
            Op::Add => value + param,
            Op::Sub => value - param,
            Op::Mul => value * param,
            Op::Div => value / param,
            Op::Pow => value.powf(param),
            Op::Custom(f) => f(value, param),
        }
    }
}

/// A single transform stage: `value = op(value, param)` for every entry of the
/// chunk pulled from `loader`, with `param` chosen by `binding`.
pub struct Transform<'f, L, P: ?Sized> {
    loader: L,
    fit: &'f P,
    binding: Binding,
    op: Op,
    param_index: usize,
}

impl<'f, L, P> Transform<'f, L, P>
where
    L: MatrixLoader,
    P: ParamProvider + ?Sized,
{
    pub fn new(loader: L, fit: &'f P, binding: Binding, op: Op, param_index: usize) -> Self {
        Transform {
            loader,
            fit,
            binding,
            op,
            param_index,
        }
    }

    /// Clamp every value to the global parameter 0.
    pub fn min(loader: L, fit: &'f P) -> Self {
        Self::new(loader, fit, Binding::Global, Op::Min, 0)
    }

    /// Clamp every value to row parameter 0 of its row.
    pub fn min_by_row(loader: L, fit: &'f P) -> Self {
        Self::new(loader, fit, Binding::Row, Op::Min, 0)
    }

    /// Clamp every value to column parameter 0 of its column.
    pub fn min_by_col(loader: L, fit: &'f P) -> Self {
        Self::new(loader, fit, Binding::Col, Op::Min, 0)
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn into_inner(self) -> L {
        self.loader
    }
}

fn apply_param<P: ParamProvider + ?Sized>(
    fit: &P,
    binding: Binding,
    op: Op,
    param_index: usize,
    chunk: ChunkMut<'_>,
) {
    let ChunkMut { values, rows, col } = chunk;
    match binding {
        Binding::Global => {
            let param = fit.global_params(param_index);
            values.iter_mut().for_each(|v| *v = op.apply(*v, param));
        }
        Binding::Row => {
            for (v, &row) in values.iter_mut().zip(rows) {
                *v = op.apply(*v, fit.row_params(param_index, row));
            }
        }
        Binding::Col => {
            // Chunks never straddle columns.
            let param = fit.col_params(param_index, col);
            values.iter_mut().for_each(|v| *v = op.apply(*v, param));
        }
    }
}

impl<L, P> MatrixLoader for Transform<'_, L, P>
where
    L: MatrixLoader,
    P: ParamProvider + ?Sized,
{
    fn rows(&self) -> u32 {
        self.loader.rows()
    }

    fn cols(&self) -> u32 {
        self.loader.cols()
    }

    fn load(&mut self) -> anyhow::Result<bool> {
        if !self.loader.load()? {
            return Ok(false);
        }
        let chunk = self.loader.chunk_mut();
        trace!(
            "{:?}/{:?} stage on column {} ({} entries)",
            self.binding,
            self.op,
            chunk.col,
            chunk.capacity()
        );
        apply_param(self.fit, self.binding, self.op, self.param_index, chunk);
        Ok(true)
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        self.loader.restart()
    }

    fn chunk(&self) -> Chunk<'_> {
        self.loader.chunk()
    }

    fn chunk_mut(&mut self) -> ChunkMut<'_> {
        self.loader.chunk_mut()
    }
}
