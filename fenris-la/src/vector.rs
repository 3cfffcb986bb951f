use crate::{IndexMap, LaError, Real};
use log::debug;
use nalgebra::DVector;

/// A value destined for an index owned by another process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostContribution<T> {
    pub owner: usize,
    /// Unrolled global index, i.e. `global block index * block size + component`.
    pub global: usize,
    pub value: T,
}

/// A ghosted vector.
///
/// The local array holds the owned entries followed by the ghost entries, with each index of the
/// index map expanded to `block_size` consecutive entries.
#[derive(Debug, Clone)]
pub struct Vector<T: Real> {
    index_map: IndexMap,
    block_size: usize,
    local: DVector<T>,
    outgoing: Vec<GhostContribution<T>>,
}

impl<T: Real> Vector<T> {
    /// A zero vector with the layout of the given index map.
    pub fn new(index_map: IndexMap, block_size: usize) -> Self {
        let len = index_map.size_with_ghosts() * block_size;
        Self {
            index_map,
            block_size,
            local: DVector::zeros(len),
            outgoing: Vec::new(),
        }
    }

    pub fn from_local(index_map: IndexMap, block_size: usize, local: DVector<T>) -> Result<Self, LaError> {
        let expected = index_map.size_with_ghosts() * block_size;
        if local.len() != expected {
            return Err(LaError::DimensionMismatch {
                expected: (expected, 1),
                actual: (local.len(), 1),
            });
        }
        Ok(Self {
            index_map,
            block_size,
            local,
            outgoing: Vec::new(),
        })
    }

    pub fn index_map(&self) -> &IndexMap {
        &self.index_map
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of owned entries.
    pub fn owned_len(&self) -> usize {
        self.index_map.size_local() * self.block_size
    }

    /// Number of owned and ghost entries.
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    /// Owned entries followed by ghost entries.
    pub fn local(&self) -> &[T] {
        self.local.as_slice()
    }

    pub fn local_mut(&mut self) -> &mut [T] {
        self.local.as_mut_slice()
    }

    pub fn owned(&self) -> &[T] {
        let n = self.owned_len();
        &self.local.as_slice()[..n]
    }

    pub fn owned_mut(&mut self) -> &mut [T] {
        let n = self.owned_len();
        &mut self.local.as_mut_slice()[..n]
    }

    pub fn ghosts(&self) -> &[T] {
        let n = self.owned_len();
        &self.local.as_slice()[n..]
    }

    pub fn as_dvector(&self) -> &DVector<T> {
        &self.local
    }

    /// Sets all owned and ghost entries to the given value.
    pub fn fill(&mut self, value: T) {
        self.local.fill(value);
    }

    /// Moves the ghost entries into the outgoing buffer, addressed to their owners.
    ///
    /// The ghost entries are zeroed afterwards. The collected contributions are retrieved with
    /// [`take_ghost_contributions`](Self::take_ghost_contributions) and must be added by the owners
    /// with [`receive_contributions`](Self::receive_contributions).
    pub fn accumulate_ghosts(&mut self) {
        let bs = self.block_size;
        let n_owned = self.owned_len();
        let owners = self.index_map.ghost_owners();
        for (k, (&ghost, &owner)) in self.index_map.ghosts().iter().zip(&owners).enumerate() {
            for c in 0..bs {
                let value = &mut self.local[n_owned + k * bs + c];
                if *value != T::zero() {
                    self.outgoing.push(GhostContribution {
                        owner,
                        global: ghost * bs + c,
                        value: *value,
                    });
                }
                *value = T::zero();
            }
        }
        if !self.outgoing.is_empty() {
            debug!("Accumulated {} ghost contributions", self.outgoing.len());
        }
    }

    pub fn take_ghost_contributions(&mut self) -> Vec<GhostContribution<T>> {
        std::mem::take(&mut self.outgoing)
    }

    /// Adds contributions sent by other processes to the owned entries.
    pub fn receive_contributions(&mut self, contributions: &[GhostContribution<T>]) -> Result<(), LaError> {
        let bs = self.block_size;
        let range = self.index_map.local_range();
        for contribution in contributions {
            let block = contribution.global / bs;
            if !range.contains(&block) {
                return Err(LaError::NotOwned {
                    global: contribution.global,
                });
            }
            let local = (block - range.start) * bs + contribution.global % bs;
            self.local[local] += contribution.value;
        }
        Ok(())
    }
}
