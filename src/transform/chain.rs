use log::debug;

use crate::loader::{Chunk, ChunkMut, Fuse, LoaderState, MatrixLoader};

use super::{Binding, Op, ParamProvider, Transform};

/// An ordered stack of transform stages over a source.
///
/// Stages run in the order they were added: the first stage sees the raw
/// source values and every later stage sees the output of the one before.
/// Exhaustion is terminal: after the stack reports the end (or a failure),
/// `load()` keeps returning `Ok(false)` until `restart()`.
///
/// Chains are `Send`, so one chain per column block can be handed to
/// `MatrixStats::compute_sharded`.
pub struct TransformChain<'a> {
    inner: Fuse<Box<dyn MatrixLoader + Send + 'a>>,
    depth: usize,
}

impl<'a> TransformChain<'a> {
    pub fn new(source: impl MatrixLoader + Send + 'a) -> Self {
        let source: Box<dyn MatrixLoader + Send + 'a> = Box::new(source);
        TransformChain {
            inner: Fuse::new(source),
            depth: 0,
        }
    }

    /// Wrap the chain in one more stage.
    ///
    /// Intended for construction; the wrapped chain starts from `NotStarted`
    /// regardless of how far the stack had already been advanced.
    pub fn stage<P>(self, binding: Binding, op: Op, param_index: usize, fit: &'a P) -> Self
    where
        P: ParamProvider + ?Sized,
    {
        debug!(
            "adding {:?}/{:?} stage (param {}) at depth {}",
            binding,
            op,
            param_index,
            self.depth + 1
        );
        let upstream = self.inner.into_inner();
        let stage: Box<dyn MatrixLoader + Send + 'a> =
            Box::new(Transform::new(upstream, fit, binding, op, param_index));
        TransformChain {
            inner: Fuse::new(stage),
            depth: self.depth + 1,
        }
    }

    pub fn min<P: ParamProvider + ?Sized>(self, fit: &'a P, param_index: usize) -> Self {
        self.stage(Binding::Global, Op::Min, param_index, fit)
    }

    pub fn min_by_row<P: ParamProvider + ?Sized>(self, fit: &'a P, param_index: usize) -> Self {
        self.stage(Binding::Row, Op::Min, param_index, fit)
    }

    pub fn min_by_col<P: ParamProvider + ?Sized>(self, fit: &'a P, param_index: usize) -> Self {
        self.stage(Binding::Col, Op::Min, param_index, fit)
    }

    pub fn max<P: ParamProvider + ?Sized>(self, fit: &'a P, param_index: usize) -> Self {
        self.stage(Binding::Global, Op::Max, param_index, fit)
    }

    pub fn scale<P: ParamProvider + ?Sized>(self, fit: &'a P, param_index: usize) -> Self {
        self.stage(Binding::Global, Op::Mul, param_index, fit)
    }

    pub fn scale_by_row<P: ParamProvider + ?Sized>(self, fit: &'a P, param_index: usize) -> Self {
        self.stage(Binding::Row, Op::Mul, param_index, fit)
    }

    pub fn scale_by_col<P: ParamProvider + ?Sized>(self, fit: &'a P, param_index: usize) -> Self {
        self.stage(Binding::Col, Op::Mul, param_index, fit)
    }

    pub fn shift<P: ParamProvider + ?Sized>(self, fit: &'a P, param_index: usize) -> Self {
        self.stage(Binding::Global, Op::Add, param_index, fit)
    }

    /// Number of transform stages above the source.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn state(&self) -> LoaderState {
        self.inner.state()
    }
}

impl MatrixLoader for TransformChain<'_> {
    fn rows(&self) -> u32 {
        self.inner.rows()
    }

    fn cols(&self) -> u32 {
        self.inner.cols()
    }

    fn load(&mut self) -> anyhow::Result<bool> {
        self.inner.load()
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        self.inner.restart()
    }

    fn chunk(&self) -> Chunk<'_> {
        self.inner.chunk()
    }

    fn chunk_mut(&mut self) -> ChunkMut<'_> {
        self.inner.chunk_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::testing::VecLoader;
    use crate::loader::CscLoader;
    use crate::transform::FitParams;
    use nalgebra_sparse::CscMatrix;
    use ndarray::{array, Array1};

    fn drain(chain: &mut TransformChain<'_>) -> Vec<Vec<f64>> {
        let mut out = Vec::new();
        while chain.load().unwrap() {
            out.push(chain.val_data().to_vec());
        }
        out
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let mut chain = TransformChain::new(VecLoader::new(3, 1, vec![(0, vec![0, 2], vec![1.0, 2.0])]));
        assert_eq!(chain.depth(), 0);
        assert_eq!(drain(&mut chain), vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn test_stages_apply_in_wrap_order() {
        let fit = FitParams::global(array![1.0, 10.0]);
        let source = || VecLoader::new(2, 1, vec![(0, vec![0, 1], vec![1.0, 5.0])]);

        // shift first, then clamp
        let mut shift_then_min = TransformChain::new(source()).shift(&fit, 0).min(&fit, 1);
        assert_eq!(drain(&mut shift_then_min), vec![vec![2.0, 6.0]]);

        // clamp first, then shift
        let mut min_then_shift = TransformChain::new(source()).min(&fit, 0).shift(&fit, 1);
        assert_eq!(drain(&mut min_then_shift), vec![vec![11.0, 11.0]]);
    }

    #[test]
    fn test_row_then_col_differs_from_col_then_row() {
        // Max by row then min by col is not order independent.
        let fit = FitParams::new(Array1::zeros(0), array![[3.0, 0.0]], array![[2.0]]);
        let source = || VecLoader::new(2, 1, vec![(0, vec![0, 1], vec![1.0, 1.0])]);

        let mut row_first = TransformChain::new(source())
            .stage(Binding::Row, Op::Max, 0, &fit)
            .min_by_col(&fit, 0);
        let mut col_first = TransformChain::new(source())
            .min_by_col(&fit, 0)
            .stage(Binding::Row, Op::Max, 0, &fit);

        assert_eq!(row_first.depth(), 2);
        assert_eq!(drain(&mut row_first), vec![vec![2.0, 1.0]]);
        assert_eq!(drain(&mut col_first), vec![vec![3.0, 1.0]]);
    }

    #[test]
    fn test_min_stack_over_csc_source() {
        // [1 0 2]
        // [0 0 0]
        // [3 4 0]
        // [0 5 6]
        let matrix = CscMatrix::try_from_csc_data(
            4,
            3,
            vec![0, 2, 4, 6],
            vec![0, 2, 2, 3, 0, 3],
            vec![1.0, 3.0, 4.0, 5.0, 2.0, 6.0],
        )
        .unwrap();
        let fit = FitParams::new(
            array![5.5],
            array![[10.0, 10.0, 2.5, 10.0]],
            array![[10.0, 4.5, 10.0]],
        );
        let mut chain = TransformChain::new(CscLoader::new(&matrix).unwrap())
            .min(&fit, 0)
            .min_by_row(&fit, 0)
            .min_by_col(&fit, 0);

        assert_eq!(
            drain(&mut chain),
            vec![vec![1.0, 2.5], vec![2.5, 4.5], vec![2.0, 5.5]]
        );
        assert_eq!(chain.row_data(), &[] as &[u32]);
    }

    #[test]
    fn test_scale_bindings() {
        let fit = FitParams::new(array![2.0], array![[1.0, 10.0]], array![[100.0, 1000.0]]);
        let source = VecLoader::new(
            2,
            2,
            vec![(0, vec![0, 1], vec![1.0, 1.0]), (1, vec![1], vec![1.0])],
        );
        let mut chain = TransformChain::new(source)
            .scale(&fit, 0)
            .scale_by_row(&fit, 0)
            .scale_by_col(&fit, 0)
            .max(&fit, 0);
        assert_eq!(
            drain(&mut chain),
            vec![vec![200.0, 2000.0], vec![20000.0]]
        );
    }

    #[test]
    fn test_terminal_state_is_idempotent() {
        let fit = FitParams::global(array![1.0]);
        let mut chain = TransformChain::new(VecLoader::new(1, 1, vec![(0, vec![0], vec![3.0])]))
            .min(&fit, 0);
        assert_eq!(chain.state(), LoaderState::NotStarted);
        assert!(chain.load().unwrap());
        assert!(!chain.load().unwrap());
        for _ in 0..3 {
            assert!(!chain.load().unwrap());
        }
        assert_eq!(chain.state(), LoaderState::Exhausted);

        chain.restart().unwrap();
        assert_eq!(drain(&mut chain), vec![vec![1.0]]);
    }

    #[test]
    fn test_failure_then_terminal() {
        let fit = FitParams::global(array![1.0]);
        let source = VecLoader::new(1, 2, vec![(0, vec![0], vec![3.0]), (1, vec![0], vec![3.0])])
            .failing_at(1);
        let mut chain = TransformChain::new(source).min(&fit, 0);
        assert!(chain.load().unwrap());
        assert!(chain.load().is_err());
        assert!(!chain.load().unwrap());
    }
}
