//! Serial linear algebra containers with the index layout of distributed containers.
//!
//! Vectors and matrices are stored in a *local* numbering: the indices owned by this process
//! come first, followed by ghost indices that are owned by other processes. Composite (block)
//! containers stack several index maps with all owned indices first and all ghost indices
//! trailing, see [`GhostBlockLayout`].
//!
//! Everything in this crate is single-threaded. Communication between processes is not
//! performed here; ghost contributions are instead collected so that a transport layer (or a
//! test) can deliver them to their owners.

mod error;
mod index_map;
mod index_set;
mod matrix;
mod nest;
mod pattern;
mod vector;

pub use error::*;
pub use index_map::*;
pub use index_set::*;
pub use matrix::*;
pub use nest::*;
pub use pattern::*;
pub use vector::*;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

use nalgebra::RealField;

/// Scalar type used by the containers.
///
/// Trait alias for `RealField + Copy`.
pub trait Real: RealField + Copy {}

impl<T> Real for T where T: RealField + Copy {}
