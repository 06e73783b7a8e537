use std::fmt;

/// Orientation of a per-axis quantity.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ROW,
    COLUMN,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ROW => write!(f, "row"),
            Direction::COLUMN => write!(f, "column"),
        }
    }
}
