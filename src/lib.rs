//! Block and nested assembly of finite element systems on restricted function spaces.
//!
//! A [`DofMapRestriction`](restriction::DofMapRestriction) selects a subset of the degrees of freedom of
//! a dofmap and renumbers them compactly. Linear and bilinear forms are assembled into containers laid
//! out in the restricted numbering, while element kernels keep writing in the numbering of the full
//! dofmap. The translation between the two happens in the sub-vector and sub-matrix views of the
//! [`view`] module, which the [`assembly::Assembler`] entry points open and close around each kernel call.
//!
//! Systems with several fields are assembled either into a single *block* container, in which all
//! fields share one local numbering, or into a *nest* container holding one independent container per
//! field (or pair of fields).

pub mod assembly;
pub mod bc;
pub mod error;
pub mod restriction;
pub mod space;
pub mod view;

pub extern crate fenris_la as la;
pub extern crate fenris_nested_vec;
pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use fenris_la::Real;
