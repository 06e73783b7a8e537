use std::sync::Arc;

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::EngineError;
use crate::Direction;

use super::{Stat, StatSet, VarianceConvention, ZeroPolicy};

/// Per-row and per-column statistics from one pass over a matrix.
///
/// `row_stats` has one column per matrix row and `col_stats` one column per
/// matrix column; both hold one row per statistic in `stats`, in
/// `Nonzero, Mean, Variance` order. The arrays are shared, so cloning and
/// transposing never copy data.
///
/// Equality is structural: NaN entries (undefined mean or variance) compare
/// equal to NaN in the same position.
#[derive(Debug, Clone)]
pub struct StatsResult {
    row_stats: Arc<Array2<f64>>,
    col_stats: Arc<Array2<f64>>,
    stats: StatSet,
    convention: VarianceConvention,
    zeros: ZeroPolicy,
}

impl StatsResult {
    pub(crate) fn new(
        row_stats: Array2<f64>,
        col_stats: Array2<f64>,
        stats: StatSet,
        convention: VarianceConvention,
        zeros: ZeroPolicy,
    ) -> Self {
        debug_assert_eq!(row_stats.nrows(), stats.len());
        debug_assert_eq!(col_stats.nrows(), stats.len());
        StatsResult {
            row_stats: Arc::new(row_stats),
            col_stats: Arc::new(col_stats),
            stats,
            convention,
            zeros,
        }
    }

    pub fn stats(&self) -> StatSet {
        self.stats
    }

    pub fn variance_convention(&self) -> VarianceConvention {
        self.convention
    }

    pub fn zero_policy(&self) -> ZeroPolicy {
        self.zeros
    }

    pub fn n_rows(&self) -> usize {
        self.row_stats.ncols()
    }

    pub fn n_cols(&self) -> usize {
        self.col_stats.ncols()
    }

    pub fn row_stats(&self) -> ArrayView2<'_, f64> {
        self.row_stats.view()
    }

    pub fn col_stats(&self) -> ArrayView2<'_, f64> {
        self.col_stats.view()
    }

    /// Values of `stat` along `direction`, or `NotComputed` if it was not requested.
    pub fn get(&self, direction: Direction, stat: Stat) -> Result<ArrayView1<'_, f64>, EngineError> {
        let pos = self.stats.position(stat).ok_or(EngineError::NotComputed(stat))?;
        let arr = match direction {
            Direction::ROW => &self.row_stats,
            Direction::COLUMN => &self.col_stats,
        };
        Ok(arr.row(pos))
    }

    pub fn row_nonzeros(&self) -> Result<ArrayView1<'_, f64>, EngineError> {
        self.get(Direction::ROW, Stat::Nonzero)
    }

    pub fn row_mean(&self) -> Result<ArrayView1<'_, f64>, EngineError> {
        self.get(Direction::ROW, Stat::Mean)
    }

    pub fn row_variance(&self) -> Result<ArrayView1<'_, f64>, EngineError> {
        self.get(Direction::ROW, Stat::Variance)
    }

    pub fn col_nonzeros(&self) -> Result<ArrayView1<'_, f64>, EngineError> {
        self.get(Direction::COLUMN, Stat::Nonzero)
    }

    pub fn col_mean(&self) -> Result<ArrayView1<'_, f64>, EngineError> {
        self.get(Direction::COLUMN, Stat::Mean)
    }

    pub fn col_variance(&self) -> Result<ArrayView1<'_, f64>, EngineError> {
        self.get(Direction::COLUMN, Stat::Variance)
    }

    /// Statistics of the transposed matrix: rows and columns trade places.
    pub fn transpose(&self) -> Self {
        StatsResult {
            row_stats: Arc::clone(&self.col_stats),
            col_stats: Arc::clone(&self.row_stats),
            ..*self
        }
    }
}

fn same_stats(a: &Arc<Array2<f64>>, b: &Arc<Array2<f64>>) -> bool {
    Arc::ptr_eq(a, b)
        || (a.shape() == b.shape()
            && a.iter()
                .zip(b.iter())
                .all(|(x, y)| x == y || (x.is_nan() && y.is_nan())))
}

impl PartialEq for StatsResult {
    fn eq(&self, other: &Self) -> bool {
        self.stats == other.stats
            && self.convention == other.convention
            && self.zeros == other.zeros
            && same_stats(&self.row_stats, &other.row_stats)
            && same_stats(&self.col_stats, &other.col_stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn nonzero_only() -> StatsResult {
        StatsResult::new(
            array![[1.0, 2.0]],
            array![[3.0]],
            StatSet::from(Stat::Nonzero),
            VarianceConvention::Population,
            ZeroPolicy::Stored,
        )
    }

    #[test]
    fn test_missing_stat_is_an_error() {
        let result = nonzero_only();
        assert_eq!(result.row_nonzeros().unwrap().to_vec(), vec![1.0, 2.0]);
        assert_eq!(result.col_nonzeros().unwrap().to_vec(), vec![3.0]);

        let err = result.row_variance().unwrap_err();
        assert!(matches!(err, EngineError::NotComputed(Stat::Variance)));
        assert_eq!(err.to_string(), "Variance not calculated in this StatsResult");
        assert!(matches!(result.col_mean(), Err(EngineError::NotComputed(Stat::Mean))));
    }

    #[test]
    fn test_sparse_stat_set_lookup() {
        let result = StatsResult::new(
            array![[1.0], [0.5]],
            array![[1.0, 0.0], [0.5, f64::NAN]],
            StatSet::from(Stat::Nonzero).with(Stat::Variance),
            VarianceConvention::Sample,
            ZeroPolicy::Stored,
        );
        assert_eq!(result.row_variance().unwrap().to_vec(), vec![0.5]);
        assert!(result.row_mean().is_err());
        assert_eq!(result.get(Direction::COLUMN, Stat::Nonzero).unwrap().to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_transpose_swaps_without_copy() {
        let result = nonzero_only();
        let t = result.transpose();
        assert_eq!((t.n_rows(), t.n_cols()), (1, 2));
        assert_eq!(t.row_nonzeros().unwrap().to_vec(), vec![3.0]);
        assert!(Arc::ptr_eq(&t.row_stats, &result.col_stats));
        assert!(Arc::ptr_eq(&t.col_stats, &result.row_stats));

        assert_eq!(t.transpose(), result);
        assert_ne!(t, result);
    }

    #[test]
    fn test_equality_treats_nan_as_equal() {
        let make = || {
            StatsResult::new(
                array![[0.0, 2.0], [f64::NAN, 1.5]],
                array![[2.0], [1.5]],
                StatSet::up_to(Stat::Mean),
                VarianceConvention::Population,
                ZeroPolicy::Stored,
            )
        };
        // Separate allocations, so equality cannot short-circuit on the pointer.
        assert_eq!(make(), make());
        assert_eq!(make().transpose().transpose(), make());

        let other = StatsResult::new(
            array![[0.0, 2.0], [0.0, 1.5]],
            array![[2.0], [1.5]],
            StatSet::up_to(Stat::Mean),
            VarianceConvention::Population,
            ZeroPolicy::Stored,
        );
        assert_ne!(make(), other);

        let mut sample = make();
        sample.convention = VarianceConvention::Sample;
        assert_ne!(make(), sample);
    }
}
