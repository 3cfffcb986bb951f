//! Dofmaps and function spaces.
use crate::error::AssemblyError;
use eyre::eyre;
use fenris_la::IndexMap;
use fenris_nested_vec::NestedVec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Map from cells to the (block) degrees of freedom of a discrete function space.
///
/// Degrees of freedom are local indices of the index map. Each dof carries `index_map_bs` scalar
/// components, so the unrolled local index of component `c` of dof `d` is `d * bs + c`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DofMap {
    index_map: IndexMap,
    index_map_bs: usize,
    cell_dofs: NestedVec<usize>,
}

impl DofMap {
    pub fn new(index_map: IndexMap, index_map_bs: usize, cell_dofs: NestedVec<usize>) -> eyre::Result<Self> {
        let len = index_map.size_with_ghosts();
        for cell in 0..cell_dofs.len() {
            let dofs = cell_dofs
                .get(cell)
                .ok_or_else(|| eyre!("Internal error: cell {} missing from cell dofs", cell))?;
            if let Some(&dof) = dofs.iter().find(|&&dof| dof >= len) {
                return Err(eyre!(AssemblyError::DofOutOfBounds { dof, len }));
            }
        }
        Ok(Self {
            index_map,
            index_map_bs,
            cell_dofs,
        })
    }

    pub fn index_map(&self) -> &IndexMap {
        &self.index_map
    }

    pub fn index_map_bs(&self) -> usize {
        self.index_map_bs
    }

    pub fn num_cells(&self) -> usize {
        self.cell_dofs.len()
    }

    /// The dofs of the given cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell index is out of bounds.
    pub fn cell_dofs(&self, cell: usize) -> &[usize] {
        self.cell_dofs
            .get(cell)
            .expect("Cell index out of bounds")
    }

    pub fn cell_dofs_list(&self) -> &NestedVec<usize> {
        &self.cell_dofs
    }

    /// Number of owned and ghost dofs, unrolled by the block size.
    pub fn unrolled_local_len(&self) -> usize {
        self.index_map.size_with_ghosts() * self.index_map_bs
    }

    /// Number of owned dofs, unrolled by the block size.
    pub fn unrolled_owned_len(&self) -> usize {
        self.index_map.size_local() * self.index_map_bs
    }
}

/// A discrete function space, identified by the address of its handle.
///
/// Two handles refer to the same space exactly when they point to the same allocation, see
/// [`FunctionSpace::same`]. Two spaces with equal dofmaps are still different spaces.
#[derive(Debug)]
pub struct FunctionSpace {
    dofmap: Arc<DofMap>,
}

impl FunctionSpace {
    pub fn new(dofmap: Arc<DofMap>) -> Arc<Self> {
        Arc::new(Self { dofmap })
    }

    pub fn dofmap(&self) -> &Arc<DofMap> {
        &self.dofmap
    }

    /// Whether the two handles refer to the same function space.
    pub fn same(a: &Arc<FunctionSpace>, b: &Arc<FunctionSpace>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

/// Whether the two handles refer to the same dofmap.
pub fn same_dofmap(a: &Arc<DofMap>, b: &Arc<DofMap>) -> bool {
    Arc::ptr_eq(a, b)
}
