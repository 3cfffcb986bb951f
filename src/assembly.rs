//! Assembly of forms into plain, block and nest containers.
//!
//! [`Assembler`] is the entry point. Each of its operations accepts optional restrictions. Without a
//! restriction, containers are laid out like the forms' dofmaps. With a restriction, containers are
//! laid out like the restricted dofmaps, and the kernels in [`global`] write through views that drop
//! contributions to inactive dofs.
//!
//! Block containers stack all blocks into a single local numbering with all owned entries first and
//! all ghost entries trailing. Nest containers keep one independent container per block.
use fenris_la::{IndexSetFactory, StandardIndexSetFactory};

pub mod global;
pub mod local;

mod create;
mod lifting;
mod matrix;
mod vector;

/// Assembles forms into containers.
///
/// Every index set the assembler needs is created through its [`IndexSetFactory`] and released before the
/// operation that created it returns, whether the operation succeeds or fails.
#[derive(Debug, Clone, Default)]
pub struct Assembler<F = StandardIndexSetFactory> {
    factory: F,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: IndexSetFactory> Assembler<F> {
    pub fn with_index_set_factory(factory: F) -> Self {
        Self { factory }
    }

    pub fn index_set_factory(&self) -> &F {
        &self.factory
    }
}
