use crate::InsertMode;
use std::error::Error;
use std::fmt;

/// Errors reported by the linear algebra containers.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaError {
    /// A local index exceeded the local size of a container.
    IndexOutOfBounds { index: usize, len: usize },
    /// An entry was written that is not part of the sparsity pattern of a matrix.
    EntryNotInPattern { row: usize, col: usize },
    /// Values were added and inserted into a matrix without an intervening flush.
    MixedInsertModes { current: InsertMode, requested: InsertMode },
    /// The dimensions of a value array did not match the number of indices.
    DimensionMismatch { expected: (usize, usize), actual: (usize, usize) },
    /// An index map was constructed from inconsistent data.
    InvalidIndexMap { reason: String },
    /// A ghost contribution was delivered to a process that does not own the index.
    NotOwned { global: usize },
}

impl fmt::Display for LaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "Local index {} out of bounds for local size {}", index, len)
            }
            Self::EntryNotInPattern { row, col } => {
                write!(f, "Entry ({}, {}) is not in the sparsity pattern", row, col)
            }
            Self::MixedInsertModes { current, requested } => write!(
                f,
                "Cannot use insert mode {:?} while the matrix is in mode {:?}. Flush the matrix first.",
                requested, current
            ),
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "Value array has dimensions {}x{}, expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            Self::InvalidIndexMap { reason } => write!(f, "Invalid index map: {}", reason),
            Self::NotOwned { global } => {
                write!(f, "Global index {} is not owned by this process", global)
            }
        }
    }
}

impl Error for LaError {}
