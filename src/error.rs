use thiserror::Error;

use crate::statistics::Stat;
use crate::Direction;

/// Failure modes raised by the engine itself.
///
/// Upstream collaborators (matrix sources, parameter providers) report their
/// own failures through `anyhow`; those only surface here when they break a
/// statistics pass.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not calculated in this StatsResult")]
    NotComputed(Stat),

    #[error("matrix pass stopped after {chunks} chunks ({columns} columns) before the source was exhausted")]
    IncompletePass {
        chunks: usize,
        columns: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("{direction} index {index} out of range for {len} {direction}s (column {col})")]
    IndexOutOfBounds {
        direction: Direction,
        index: usize,
        len: usize,
        col: usize,
    },

    #[error("{direction} {index} has {count} stored entries but spans only {span} cells; shards overlap")]
    CountExceedsSpan {
        direction: Direction,
        index: usize,
        count: u64,
        span: usize,
    },

    #[error("shape mismatch: expected {expected_rows}x{expected_cols}, found {rows}x{cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },
}

impl EngineError {
    pub(crate) fn incomplete(chunks: usize, columns: usize, source: anyhow::Error) -> Self {
        EngineError::IncompletePass {
            chunks,
            columns,
            source: source.into(),
        }
    }
}
