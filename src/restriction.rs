//! Restriction of a dofmap to a subset of its degrees of freedom.
use crate::error::AssemblyError;
use crate::space::DofMap;
use eyre::eyre;
use fenris_la::IndexMap;
use fenris_nested_vec::NestedVec;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A dofmap restricted to a set of *active* degrees of freedom.
///
/// Active dofs are renumbered compactly: owned active dofs first, in the order they were given,
/// followed by active ghost dofs, again in the order given. The restricted numbering is described by
/// the restriction's own [`IndexMap`], with the same block size as the unrestricted dofmap.
#[derive(Debug, Clone)]
pub struct DofMapRestriction {
    dofmap: Arc<DofMap>,
    index_map: IndexMap,
    unrestricted_to_restricted: BTreeMap<usize, usize>,
    restricted_to_unrestricted: BTreeMap<usize, usize>,
    cell_dofs: NestedVec<usize>,
}

/// Translates unrolled positions of an unrestricted dofmap into unrolled positions of a restriction.
#[derive(Debug, Clone, Copy)]
pub struct IndexTranslation<'a> {
    map: &'a BTreeMap<usize, usize>,
    block_size: usize,
}

impl<'a> IndexTranslation<'a> {
    /// The restricted position of the given unrestricted position, if its dof is active.
    pub fn translate(&self, position: usize) -> Option<usize> {
        let bs = self.block_size;
        self.map
            .get(&(position / bs))
            .map(|restricted| restricted * bs + position % bs)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl DofMapRestriction {
    /// Restricts a dofmap that lives entirely on a single process.
    ///
    /// Fails if the dofmap is distributed or if any active dof is a ghost, since the global
    /// numbering of the restriction is then not known locally. Use [`with_ghosts`](Self::with_ghosts)
    /// in that case.
    pub fn new(dofmap: Arc<DofMap>, active_dofs: &[usize]) -> eyre::Result<Self> {
        if dofmap.index_map().num_ranks() != 1 {
            return Err(eyre!(AssemblyError::MissingRestrictionPartition));
        }
        let (u2r, r2u, num_owned, num_ghosts) = Self::renumber(&dofmap, active_dofs)?;
        if num_ghosts > 0 {
            return Err(eyre!(AssemblyError::MissingRestrictionPartition));
        }
        Self::from_parts(dofmap, IndexMap::new_serial(num_owned), u2r, r2u)
    }

    /// Restricts a distributed dofmap.
    ///
    /// `restricted_partition` gives the number of active owned dofs on each process in the form of a
    /// partition of the restricted global index range, and `restricted_ghosts` gives the restricted
    /// global indices of the active ghost dofs, in the order in which they appear in `active_dofs`.
    /// Both are typically computed by exchanging the restricted numbering between processes.
    pub fn with_ghosts(
        dofmap: Arc<DofMap>,
        active_dofs: &[usize],
        restricted_partition: Vec<usize>,
        restricted_ghosts: Vec<usize>,
    ) -> eyre::Result<Self> {
        let (u2r, r2u, num_owned, num_ghosts) = Self::renumber(&dofmap, active_dofs)?;
        let rank = dofmap.index_map().rank();
        let invalid = |reason: String| eyre!(AssemblyError::InvalidRestrictionLayout { reason });
        if restricted_partition.len() != dofmap.index_map().num_ranks() + 1 {
            return Err(invalid(format!(
                "partition has {} entries for {} processes",
                restricted_partition.len(),
                dofmap.index_map().num_ranks()
            )));
        }
        if restricted_ghosts.len() != num_ghosts {
            return Err(invalid(format!(
                "{} ghost indices given for {} active ghost dofs",
                restricted_ghosts.len(),
                num_ghosts
            )));
        }
        let index_map = IndexMap::with_ghosts(rank, restricted_partition, restricted_ghosts)?;
        if index_map.size_local() != num_owned {
            return Err(invalid(format!(
                "partition assigns {} dofs to rank {}, but {} active dofs are owned",
                index_map.size_local(),
                rank,
                num_owned
            )));
        }
        Self::from_parts(dofmap, index_map, u2r, r2u)
    }

    #[allow(clippy::type_complexity)]
    fn renumber(
        dofmap: &DofMap,
        active_dofs: &[usize],
    ) -> eyre::Result<(BTreeMap<usize, usize>, BTreeMap<usize, usize>, usize, usize)> {
        let size_local = dofmap.index_map().size_local();
        let len = dofmap.index_map().size_with_ghosts();
        let mut u2r = BTreeMap::new();
        let mut r2u = BTreeMap::new();

        for &dof in active_dofs {
            if dof >= len {
                return Err(eyre!(AssemblyError::DofOutOfBounds { dof, len }));
            }
        }

        // Owned active dofs are numbered before ghost active dofs
        let owned = active_dofs.iter().filter(|&&dof| dof < size_local);
        let ghosts = active_dofs.iter().filter(|&&dof| dof >= size_local);
        for (restricted, &dof) in owned.chain(ghosts).enumerate() {
            if u2r.insert(dof, restricted).is_some() {
                return Err(eyre!(AssemblyError::DuplicateActiveDof { dof }));
            }
            r2u.insert(restricted, dof);
        }

        let num_owned = active_dofs.iter().filter(|&&dof| dof < size_local).count();
        let num_ghosts = u2r.len() - num_owned;
        Ok((u2r, r2u, num_owned, num_ghosts))
    }

    fn from_parts(
        dofmap: Arc<DofMap>,
        index_map: IndexMap,
        unrestricted_to_restricted: BTreeMap<usize, usize>,
        restricted_to_unrestricted: BTreeMap<usize, usize>,
    ) -> eyre::Result<Self> {
        let mut cell_dofs = NestedVec::new();
        for dofs in dofmap.cell_dofs_list().iter() {
            let mut cell = cell_dofs.begin_array();
            for dof in dofs {
                if let Some(&restricted) = unrestricted_to_restricted.get(dof) {
                    cell.push_single(restricted);
                }
            }
        }
        debug!(
            "Restricted dofmap with {} owned and {} ghost dofs to {} owned and {} ghost dofs",
            dofmap.index_map().size_local(),
            dofmap.index_map().num_ghosts(),
            index_map.size_local(),
            index_map.num_ghosts()
        );
        Ok(Self {
            dofmap,
            index_map,
            unrestricted_to_restricted,
            restricted_to_unrestricted,
            cell_dofs,
        })
    }

    /// The unrestricted dofmap.
    pub fn dofmap(&self) -> &Arc<DofMap> {
        &self.dofmap
    }

    pub fn index_map(&self) -> &IndexMap {
        &self.index_map
    }

    pub fn index_map_bs(&self) -> usize {
        self.dofmap.index_map_bs()
    }

    /// Map from active unrestricted dofs to restricted dofs.
    pub fn unrestricted_to_restricted(&self) -> &BTreeMap<usize, usize> {
        &self.unrestricted_to_restricted
    }

    /// Map from restricted dofs to unrestricted dofs.
    pub fn restricted_to_unrestricted(&self) -> &BTreeMap<usize, usize> {
        &self.restricted_to_unrestricted
    }

    /// Restricted dofs of each cell, in the order they appear in the unrestricted cell.
    pub fn cell_dofs_list(&self) -> &NestedVec<usize> {
        &self.cell_dofs
    }

    /// Restricted dofs of the given cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell index is out of bounds.
    pub fn cell_dofs(&self, cell: usize) -> &[usize] {
        self.cell_dofs.get(cell).expect("Cell index out of bounds")
    }

    pub fn translation(&self) -> IndexTranslation<'_> {
        IndexTranslation {
            map: &self.unrestricted_to_restricted,
            block_size: self.index_map_bs(),
        }
    }
}
