use crate::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An ordered list of local positions into a (composite) container.
///
/// Index sets are handles to resources obtained from an [`IndexSetFactory`] and are released when
/// dropped.
#[derive(Debug)]
pub struct IndexSet {
    indices: Vec<usize>,
    _release: Option<ReleaseGuard>,
}

#[derive(Debug)]
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl IndexSet {
    pub fn new(indices: Vec<usize>) -> Self {
        Self {
            indices,
            _release: None,
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<usize> {
        self.indices.get(position).copied()
    }
}

/// Placement of ghost indices when several index maps are stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GhostBlockLayout {
    /// Owned indices of all blocks first, followed by the ghosts of all blocks.
    Trailing,
    /// Each block's owned indices directly followed by its ghosts.
    Intertwined,
}

/// Computes, for each block, the positions of its (unrolled) indices in the stacked local layout.
///
/// With `ghosted == false` only the owned indices of each block are listed, but their positions
/// are still those of the full (ghosted) layout.
pub fn stacked_positions(maps: &[(&IndexMap, usize)], ghosted: bool, layout: GhostBlockLayout) -> Vec<Vec<usize>> {
    let total_owned: usize = maps.iter().map(|(map, bs)| map.size_local() * bs).sum();
    let mut owned_offset = 0;
    let mut ghost_offset = total_owned;
    let mut positions = Vec::with_capacity(maps.len());
    for (map, bs) in maps {
        let owned = map.size_local() * bs;
        let ghosts = map.num_ghosts() * bs;
        let mut block_positions: Vec<usize> = (owned_offset..owned_offset + owned).collect();
        match layout {
            GhostBlockLayout::Trailing => {
                if ghosted {
                    block_positions.extend(ghost_offset..ghost_offset + ghosts);
                }
                owned_offset += owned;
                ghost_offset += ghosts;
            }
            GhostBlockLayout::Intertwined => {
                if ghosted {
                    block_positions.extend(owned_offset + owned..owned_offset + owned + ghosts);
                }
                owned_offset += owned + ghosts;
            }
        }
        positions.push(block_positions);
    }
    positions
}

/// Source of index sets.
///
/// The factory is a seam for resource accounting: every index set created through it is a resource
/// that must be released (dropped) before the operation that requested it returns.
pub trait IndexSetFactory {
    /// Creates one index set per `(index map, block size)` pair.
    ///
    /// The index sets describe the positions of each block in the local layout of the stacked
    /// container, see [`stacked_positions`].
    fn create_index_sets(
        &self,
        maps: &[(&IndexMap, usize)],
        ghosted: bool,
        layout: GhostBlockLayout,
    ) -> Vec<IndexSet>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardIndexSetFactory;

impl IndexSetFactory for StandardIndexSetFactory {
    fn create_index_sets(
        &self,
        maps: &[(&IndexMap, usize)],
        ghosted: bool,
        layout: GhostBlockLayout,
    ) -> Vec<IndexSet> {
        stacked_positions(maps, ghosted, layout)
            .into_iter()
            .map(IndexSet::new)
            .collect()
    }
}

/// Index set factory that keeps track of how many of its index sets are alive.
///
/// Clones share their counters.
#[derive(Debug, Clone, Default)]
pub struct CountingIndexSetFactory {
    live: Arc<AtomicUsize>,
    created: Arc<AtomicUsize>,
}

impl CountingIndexSetFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of index sets created by this factory that have not yet been dropped.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Total number of index sets created by this factory.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl IndexSetFactory for CountingIndexSetFactory {
    fn create_index_sets(
        &self,
        maps: &[(&IndexMap, usize)],
        ghosted: bool,
        layout: GhostBlockLayout,
    ) -> Vec<IndexSet> {
        let sets: Vec<_> = stacked_positions(maps, ghosted, layout)
            .into_iter()
            .map(|indices| {
                self.live.fetch_add(1, Ordering::SeqCst);
                self.created.fetch_add(1, Ordering::SeqCst);
                IndexSet {
                    indices,
                    _release: Some(ReleaseGuard(Arc::clone(&self.live))),
                }
            })
            .collect();
        trace!("Created {} index sets ({} live)", sets.len(), self.live());
        sets
    }
}
