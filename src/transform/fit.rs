use anyhow::bail;
use ndarray::{Array1, Array2};

use super::ParamProvider;

/// Fitted parameters held in memory.
///
/// `row` is laid out as (parameters x matrix rows) and `col` as
/// (parameters x matrix columns). Lookups outside the fitted range panic.
#[derive(Debug, Clone, PartialEq)]
pub struct FitParams {
    global: Array1<f64>,
    row: Array2<f64>,
    col: Array2<f64>,
}

impl FitParams {
    pub fn new(global: Array1<f64>, row: Array2<f64>, col: Array2<f64>) -> Self {
        FitParams { global, row, col }
    }

    pub fn global(global: Array1<f64>) -> Self {
        Self::new(global, Array2::zeros((0, 0)), Array2::zeros((0, 0)))
    }

    pub fn by_row(row: Array2<f64>) -> Self {
        Self::new(Array1::zeros(0), row, Array2::zeros((0, 0)))
    }

    pub fn by_col(col: Array2<f64>) -> Self {
        Self::new(Array1::zeros(0), Array2::zeros((0, 0)), col)
    }

    /// Check that row/column parameters cover a matrix of the given shape.
    pub fn validate_shape(&self, nrows: u32, ncols: u32) -> anyhow::Result<()> {
        if self.row.nrows() > 0 && self.row.ncols() != nrows as usize {
            bail!(
                "Row parameters cover {} rows, matrix has {}",
                self.row.ncols(),
                nrows
            );
        }
        if self.col.nrows() > 0 && self.col.ncols() != ncols as usize {
            bail!(
                "Column parameters cover {} columns, matrix has {}",
                self.col.ncols(),
                ncols
            );
        }
        Ok(())
    }
}

impl ParamProvider for FitParams {
    fn global_params(&self, index: usize) -> f64 {
        self.global[index]
    }

    fn row_params(&self, index: usize, row: u32) -> f64 {
        self.row[[index, row as usize]]
    }

    fn col_params(&self, index: usize, col: u32) -> f64 {
        self.col[[index, col as usize]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_lookups() {
        let fit = FitParams::new(
            array![1.5, 2.5],
            array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]],
            array![[6.0, 7.0]],
        );
        assert_eq!(fit.global_params(1), 2.5);
        assert_eq!(fit.row_params(1, 2), 5.0);
        assert_eq!(fit.col_params(0, 1), 7.0);
        assert!(fit.validate_shape(3, 2).is_ok());
        assert!(fit.validate_shape(4, 2).is_err());
        assert!(fit.validate_shape(3, 1).is_err());
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_row_panics() {
        let fit = FitParams::by_row(array![[1.0, 2.0]]);
        fit.row_params(0, 2);
    }
}
