//! Single-pass per-row and per-column statistics over a loader.

mod accumulator;
mod result;
mod welford;

pub use accumulator::{MatrixStats, StatsBuilder};
pub use result::StatsResult;

use std::fmt;

/// A statistic that can be accumulated for every row and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stat {
    /// Count of stored entries, explicit zeros included.
    Nonzero,
    Mean,
    Variance,
}

impl Stat {
    pub const ALL: [Stat; 3] = [Stat::Nonzero, Stat::Mean, Stat::Variance];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Nonzero => write!(f, "Nonzero"),
            Stat::Mean => write!(f, "Mean"),
            Stat::Variance => write!(f, "Variance"),
        }
    }
}

/// Set of requested statistics, iterated in `Nonzero, Mean, Variance` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StatSet(u8);

impl StatSet {
    pub fn empty() -> Self {
        StatSet(0)
    }

    pub fn all() -> Self {
        Self::up_to(Stat::Variance)
    }

    /// Every statistic up to and including `stat`.
    pub fn up_to(stat: Stat) -> Self {
        Stat::ALL
            .into_iter()
            .filter(|s| *s <= stat)
            .collect()
    }

    pub fn with(mut self, stat: Stat) -> Self {
        self.0 |= stat.bit();
        self
    }

    pub fn contains(&self, stat: Stat) -> bool {
        self.0 & stat.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Stat> + '_ {
        Stat::ALL.into_iter().filter(|s| self.contains(*s))
    }

    /// Row of `stat` in a statistics array holding exactly this set.
    pub fn position(&self, stat: Stat) -> Option<usize> {
        if !self.contains(stat) {
            return None;
        }
        Some(self.iter().take_while(|s| *s != stat).count())
    }
}

impl FromIterator<Stat> for StatSet {
    fn from_iter<I: IntoIterator<Item = Stat>>(iter: I) -> Self {
        iter.into_iter().fold(StatSet::empty(), StatSet::with)
    }
}

impl From<Stat> for StatSet {
    fn from(stat: Stat) -> Self {
        StatSet::empty().with(stat)
    }
}

/// Divisor used when turning the sum of squared deviations into a variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VarianceConvention {
    /// Divide by `n`.
    #[default]
    Population,
    /// Divide by `n - 1`; undefined (NaN) below two observations.
    Sample,
}

/// How entries absent from the sparse structure enter mean and variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroPolicy {
    /// Only stored entries are observations.
    #[default]
    Stored,
    /// Every cell of the row/column is an observation; absent ones are zero.
    Implicit,
}
