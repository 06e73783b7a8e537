pub mod error;
pub mod loader;
pub mod statistics;
pub mod transform;
mod utils;

pub use error::EngineError;
pub use loader::{Chunk, ChunkMut, CscLoader, Fuse, LoaderState, MatrixLoader};
pub use statistics::{MatrixStats, Stat, StatSet, StatsBuilder, StatsResult, VarianceConvention, ZeroPolicy};
pub use transform::{Binding, FitParams, Op, ParamProvider, Transform, TransformChain};
pub use utils::Direction;
