use log::{debug, trace, warn};
use rayon::prelude::*;

use crate::error::EngineError;
use crate::loader::MatrixLoader;
use crate::Direction;

use super::welford::AxisWelford;
use super::{Stat, StatSet, StatsResult, VarianceConvention, ZeroPolicy};

pub struct StatsBuilder {
    stats: StatSet,
    convention: VarianceConvention,
    zeros: ZeroPolicy,
}

impl Default for StatsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsBuilder {
    /// Starts with every statistic requested, population variance and
    /// stored-entry semantics.
    pub fn new() -> Self {
        StatsBuilder {
            stats: StatSet::all(),
            convention: VarianceConvention::Population,
            zeros: ZeroPolicy::Stored,
        }
    }

    pub fn stats(mut self, stats: impl Into<StatSet>) -> Self {
        self.stats = stats.into();
        self
    }

    /// Request every statistic up to and including `stat`.
    pub fn up_to(mut self, stat: Stat) -> Self {
        self.stats = StatSet::up_to(stat);
        self
    }

    pub fn variance_convention(mut self, convention: VarianceConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn zero_policy(mut self, zeros: ZeroPolicy) -> Self {
        self.zeros = zeros;
        self
    }

    pub fn build(self) -> MatrixStats {
        MatrixStats {
            stats: self.stats,
            convention: self.convention,
            zeros: self.zeros,
        }
    }
}

/// Row and column accumulators for one matrix shape.
struct Accumulation {
    nrows: usize,
    ncols: usize,
    rows: AxisWelford,
    cols: AxisWelford,
}

impl Accumulation {
    fn merge(mut self, other: Accumulation) -> Result<Accumulation, EngineError> {
        if (self.nrows, self.ncols) != (other.nrows, other.ncols) {
            return Err(EngineError::ShapeMismatch {
                expected_rows: self.nrows,
                expected_cols: self.ncols,
                rows: other.nrows,
                cols: other.ncols,
            });
        }
        self.rows.merge(&other.rows);
        self.cols.merge(&other.cols);
        Ok(self)
    }
}

/// Single-pass row and column statistics over a loader.
///
/// Every stored entry updates one row and one column accumulator, so a single
/// traversal yields both orientations. Nonzero counts are structural: a stored
/// zero counts.
#[derive(Debug, Clone, Copy)]
pub struct MatrixStats {
    stats: StatSet,
    convention: VarianceConvention,
    zeros: ZeroPolicy,
}

impl MatrixStats {
    /// Rewind `loader` and consume it completely.
    ///
    /// An upstream failure at any point yields `IncompletePass`; partial
    /// statistics are never returned.
    pub fn compute<L: MatrixLoader>(&self, loader: &mut L) -> Result<StatsResult, EngineError> {
        let acc = self.accumulate(loader)?;
        self.finish(acc)
    }

    /// Accumulate several loaders over the same matrix shape in parallel and
    /// combine them, e.g. one loader per column block.
    ///
    /// Shards must not emit the same cell twice (column ranges must not
    /// overlap). Under `ZeroPolicy::Implicit` a row or column left with more
    /// entries than cells is reported as `CountExceedsSpan`; smaller overlaps,
    /// and any overlap under `Stored`, cannot be told apart from genuine
    /// entries and go undetected. Any failing shard fails the whole
    /// computation. With no loaders the result describes an empty 0x0 matrix.
    pub fn compute_sharded<L>(&self, loaders: Vec<L>) -> Result<StatsResult, EngineError>
    where
        L: MatrixLoader + Send,
    {
        let shards = loaders.len();
        let merged = loaders
            .into_par_iter()
            .map(|mut loader| self.accumulate(&mut loader))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .try_fold(None::<Accumulation>, |acc, next| match acc {
                None => Ok(Some(next)),
                Some(acc) => acc.merge(next).map(Some),
            })?;
        debug!("merged {} shards", shards);
        let acc = merged.unwrap_or_else(|| self.empty_accumulation(0, 0));
        self.finish(acc)
    }

    fn empty_accumulation(&self, nrows: usize, ncols: usize) -> Accumulation {
        Accumulation {
            nrows,
            ncols,
            rows: AxisWelford::new(nrows, self.stats),
            cols: AxisWelford::new(ncols, self.stats),
        }
    }

    fn accumulate<L: MatrixLoader>(&self, loader: &mut L) -> Result<Accumulation, EngineError> {
        loader
            .restart()
            .map_err(|e| EngineError::incomplete(0, 0, e))?;

        let (nrows, ncols) = (loader.rows() as usize, loader.cols() as usize);
        let mut acc = self.empty_accumulation(nrows, ncols);
        let mut chunks = 0usize;
        let mut columns = 0usize;
        let mut last_col = None;

        loop {
            match loader.load() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!(
                        "matrix pass failed after {} chunks ({} columns): {:#}",
                        chunks, columns, e
                    );
                    return Err(EngineError::incomplete(chunks, columns, e));
                }
            }
            let chunk = loader.chunk();
            let col = chunk.col as usize;
            trace!("column {}: {} entries", col, chunk.capacity());
            if col >= ncols {
                return Err(EngineError::IndexOutOfBounds {
                    direction: Direction::COLUMN,
                    index: col,
                    len: ncols,
                    col,
                });
            }
            for (row, value) in chunk.iter() {
                let row = row as usize;
                if row >= nrows {
                    return Err(EngineError::IndexOutOfBounds {
                        direction: Direction::ROW,
                        index: row,
                        len: nrows,
                        col,
                    });
                }
                acc.rows.push(row, value);
                acc.cols.push(col, value);
            }
            chunks += 1;
            if last_col != Some(chunk.col) {
                columns += 1;
                last_col = Some(chunk.col);
            }
        }

        debug!(
            "accumulated {:?} over {}x{} matrix in {} chunks",
            self.stats, nrows, ncols, chunks
        );
        Ok(acc)
    }

    fn finish(&self, acc: Accumulation) -> Result<StatsResult, EngineError> {
        // A row spans every column and a column spans every row.
        if self.zeros == ZeroPolicy::Implicit {
            for (direction, axis, span) in [
                (Direction::ROW, &acc.rows, acc.ncols),
                (Direction::COLUMN, &acc.cols, acc.nrows),
            ] {
                if let Some((index, count)) = axis.over_span(span) {
                    return Err(EngineError::CountExceedsSpan {
                        direction,
                        index,
                        count,
                        span,
                    });
                }
            }
        }
        let row_stats = acc.rows.finish(self.convention, self.zeros, acc.ncols);
        let col_stats = acc.cols.finish(self.convention, self.zeros, acc.nrows);
        Ok(StatsResult::new(row_stats, col_stats, self.stats, self.convention, self.zeros))
    }
}
