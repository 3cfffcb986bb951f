use crate::LaError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Distribution of a global index range over a number of processes.
///
/// Each process owns a contiguous range of global indices, given by `partition[rank]..partition[rank + 1]`.
/// In addition, a process may hold *ghost* indices, which are owned by other processes. The local
/// numbering places the owned indices first (in global order) followed by the ghosts in the order
/// they were given.
///
/// Since the complete partition is stored, the owner of any global index can be determined locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMap {
    rank: usize,
    partition: Vec<usize>,
    ghosts: Vec<usize>,
}

impl IndexMap {
    /// An index map for a single process that owns all `size` indices.
    pub fn new_serial(size: usize) -> Self {
        Self {
            rank: 0,
            partition: vec![0, size],
            ghosts: Vec::new(),
        }
    }

    /// Creates an index map for process `rank`.
    ///
    /// The partition must be non-decreasing, start at zero and contain one more entry than the number of
    /// processes. Ghosts must be distinct global indices owned by other processes.
    pub fn with_ghosts(rank: usize, partition: Vec<usize>, ghosts: Vec<usize>) -> Result<Self, LaError> {
        let invalid = |reason: String| Err(LaError::InvalidIndexMap { reason });
        if partition.len() < 2 || rank + 1 >= partition.len() {
            return invalid(format!(
                "rank {} is not covered by a partition with {} entries",
                rank,
                partition.len()
            ));
        }
        if partition[0] != 0 || partition.windows(2).any(|w| w[0] > w[1]) {
            return invalid("partition must start at zero and be non-decreasing".to_string());
        }
        let map = Self {
            rank,
            partition,
            ghosts,
        };
        let global_size = map.global_size();
        for (k, &ghost) in map.ghosts.iter().enumerate() {
            if ghost >= global_size {
                return invalid(format!("ghost {} exceeds global size {}", ghost, global_size));
            }
            if map.local_range().contains(&ghost) {
                return invalid(format!("ghost {} is owned by rank {}", ghost, rank));
            }
            if map.ghosts[..k].contains(&ghost) {
                return invalid(format!("ghost {} appears more than once", ghost));
            }
        }
        Ok(map)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_ranks(&self) -> usize {
        self.partition.len() - 1
    }

    pub fn partition(&self) -> &[usize] {
        &self.partition
    }

    /// The range of global indices owned by this process.
    pub fn local_range(&self) -> Range<usize> {
        self.partition[self.rank]..self.partition[self.rank + 1]
    }

    /// The number of owned indices.
    pub fn size_local(&self) -> usize {
        self.local_range().len()
    }

    pub fn num_ghosts(&self) -> usize {
        self.ghosts.len()
    }

    /// The number of owned and ghost indices.
    pub fn size_with_ghosts(&self) -> usize {
        self.size_local() + self.num_ghosts()
    }

    pub fn global_size(&self) -> usize {
        *self.partition.last().unwrap_or(&0)
    }

    /// Global indices of the ghosts, in local order.
    pub fn ghosts(&self) -> &[usize] {
        &self.ghosts
    }

    /// Rank owning the given global index.
    pub fn owner(&self, global: usize) -> Option<usize> {
        if global >= self.global_size() {
            return None;
        }
        // Last rank whose range starts at or before the index. Empty ranges share their start with
        // the next rank, so partition_point picks the rank that actually owns the index.
        let rank = self.partition.partition_point(|&start| start <= global) - 1;
        Some(rank)
    }

    /// Ranks owning the ghosts, in local order.
    pub fn ghost_owners(&self) -> Vec<usize> {
        self.ghosts
            .iter()
            .map(|&g| self.owner(g).expect("Internal error: ghosts are validated on construction"))
            .collect()
    }

    pub fn local_to_global(&self, local: usize) -> Option<usize> {
        let size_local = self.size_local();
        if local < size_local {
            Some(self.local_range().start + local)
        } else {
            self.ghosts.get(local - size_local).copied()
        }
    }

    pub fn global_to_local(&self, global: usize) -> Option<usize> {
        let range = self.local_range();
        if range.contains(&global) {
            Some(global - range.start)
        } else {
            self.ghosts
                .iter()
                .position(|&g| g == global)
                .map(|k| self.size_local() + k)
        }
    }
}

/// Stacks a list of `(index map, block size)` pairs into a single index map with block size 1.
///
/// On each process, the owned indices of all blocks are numbered consecutively, block by block,
/// and the ghosts of all blocks follow, again block by block. The global numbering is process-major:
/// all indices owned by process 0 (over all blocks) come first, then those owned by process 1, etc.
pub fn stack_index_maps(maps: &[(&IndexMap, usize)]) -> Result<IndexMap, LaError> {
    let invalid = |reason: String| Err(LaError::InvalidIndexMap { reason });
    let (first, _) = match maps.first() {
        Some(first) => first,
        None => return Ok(IndexMap::new_serial(0)),
    };
    let rank = first.rank();
    let num_ranks = first.num_ranks();
    if maps
        .iter()
        .any(|(map, _)| map.rank() != rank || map.num_ranks() != num_ranks)
    {
        return invalid("stacked index maps must share rank and number of processes".to_string());
    }

    let partition: Vec<usize> = (0..=num_ranks)
        .map(|q| maps.iter().map(|(map, bs)| map.partition()[q] * bs).sum())
        .collect();

    let mut ghosts = Vec::new();
    for (block, (map, bs)) in maps.iter().enumerate() {
        for &ghost in map.ghosts() {
            let owner = map
                .owner(ghost)
                .expect("Internal error: ghosts are validated on construction");
            // Offset of the owner's segment, then of this block within the segment
            let block_offset: usize = maps[..block]
                .iter()
                .map(|(other, other_bs)| (other.partition()[owner + 1] - other.partition()[owner]) * other_bs)
                .sum();
            let within_block = (ghost - map.partition()[owner]) * bs;
            let base = partition[owner] + block_offset + within_block;
            ghosts.extend((0..*bs).map(|c| base + c));
        }
    }

    IndexMap::with_ghosts(rank, partition, ghosts)
}
