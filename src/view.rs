//! Views that present a container through the numbering of a (possibly restricted) dofmap.
//!
//! Element kernels produce values in the numbering of the unrestricted dofmap. A view translates
//! between that numbering and the local numbering of a container, which may be laid out according to
//! a [`DofMapRestriction`] and may stack several blocks.
//!
//! Each view owns (or borrows from an enclosing block view) the index sets describing its layout.
//! Index sets are obtained from an [`IndexSetFactory`] and released when the view is dropped, whether
//! the enclosed work succeeded or not. Vector views write their content back to the container when
//! dropped.
use crate::error::AssemblyError;
use crate::restriction::DofMapRestriction;
use crate::space::{same_dofmap, DofMap};
use eyre::eyre;
use fenris_la::{GhostBlockLayout, IndexMap, IndexSet, IndexSetFactory};
use std::ops::Deref;
use std::sync::Arc;

mod matrix;
mod vector;

pub use matrix::*;
pub use vector::*;

/// Layout of one block along one axis of a container.
///
/// Maps each position of the view content, which is numbered like the unrolled unrestricted dofmap,
/// to a local position of the container, or to nothing if the dof is not part of the restriction.
#[derive(Debug)]
pub struct ViewAxis {
    unrestricted: IndexSet,
    restricted: Option<IndexSet>,
    locations: Vec<Option<usize>>,
}

impl ViewAxis {
    /// An axis whose content positions are given directly by an index set.
    pub fn unrestricted(index_set: IndexSet) -> Self {
        let locations = index_set.indices().iter().copied().map(Some).collect();
        Self {
            unrestricted: index_set,
            restricted: None,
            locations,
        }
    }

    /// An axis whose content is sized by the unrestricted index set and located through the restriction.
    ///
    /// Content position `p` is located at `restricted[translation(p)]`, provided the dof of `p` is active
    /// and the restricted index set covers the translated position.
    pub fn restricted(unrestricted: IndexSet, restricted: IndexSet, restriction: &DofMapRestriction) -> Self {
        let translation = restriction.translation();
        let locations = (0..unrestricted.len())
            .map(|p| translation.translate(p).and_then(|r| restricted.get(r)))
            .collect();
        Self {
            unrestricted,
            restricted: Some(restricted),
            locations,
        }
    }

    /// Number of content positions.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted.is_some()
    }

    pub fn unrestricted_index_set(&self) -> &IndexSet {
        &self.unrestricted
    }

    pub fn restricted_index_set(&self) -> Option<&IndexSet> {
        self.restricted.as_ref()
    }

    pub fn location(&self, position: usize) -> Option<usize> {
        self.locations.get(position).copied().flatten()
    }

    pub fn locations(&self) -> &[Option<usize>] {
        &self.locations
    }

    /// Number of container positions required to hold every location.
    fn required_len(&self) -> usize {
        self.locations
            .iter()
            .flatten()
            .max()
            .map(|&max| max + 1)
            .unwrap_or(0)
    }
}

/// Builds one axis per block.
///
/// Index sets for the unrestricted blocks are created from the dofmaps. With restrictions, index sets
/// for the restricted blocks are created as well, and each restriction must restrict the dofmap of its
/// block.
pub(crate) fn build_axes(
    dofmaps: &[&Arc<DofMap>],
    restrictions: Option<&[&DofMapRestriction]>,
    ghosted: bool,
    factory: &dyn IndexSetFactory,
) -> eyre::Result<Vec<ViewAxis>> {
    if let Some(restrictions) = restrictions {
        if restrictions.len() != dofmaps.len() {
            return Err(eyre!(AssemblyError::BlockCountMismatch {
                what: "restrictions",
                expected: dofmaps.len(),
                actual: restrictions.len(),
            }));
        }
        for (block, (dofmap, restriction)) in dofmaps.iter().zip(restrictions).enumerate() {
            if !same_dofmap(dofmap, restriction.dofmap()) {
                return Err(eyre!(AssemblyError::RestrictionDofMapMismatch { block }));
            }
        }
    }

    let unrestricted_maps: Vec<(&IndexMap, usize)> = dofmaps
        .iter()
        .map(|dofmap| (dofmap.index_map(), dofmap.index_map_bs()))
        .collect();
    let unrestricted = factory.create_index_sets(&unrestricted_maps, ghosted, GhostBlockLayout::Trailing);

    match restrictions {
        None => Ok(unrestricted.into_iter().map(ViewAxis::unrestricted).collect()),
        Some(restrictions) => {
            let restricted_maps: Vec<(&IndexMap, usize)> = restrictions
                .iter()
                .map(|restriction| (restriction.index_map(), restriction.index_map_bs()))
                .collect();
            let restricted = factory.create_index_sets(&restricted_maps, ghosted, GhostBlockLayout::Trailing);
            Ok(unrestricted
                .into_iter()
                .zip(restricted)
                .zip(restrictions)
                .map(|((u, r), restriction)| ViewAxis::restricted(u, r, restriction))
                .collect())
        }
    }
}

/// Checks that a container with `len` local positions can hold every location of the axes.
pub(crate) fn check_container_len(axes: &[ViewAxis], len: usize) -> eyre::Result<()> {
    let required = axes.iter().map(ViewAxis::required_len).max().unwrap_or(0);
    if required > len {
        return Err(eyre!(AssemblyError::ContainerMismatch {
            expected: required,
            actual: len,
        }));
    }
    Ok(())
}

/// An axis owned by a standalone view or borrowed from an enclosing block view.
#[derive(Debug)]
pub(crate) enum Held<'a, T> {
    Owned(T),
    Borrowed(&'a T),
}

impl<'a, T> Deref for Held<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Held::Owned(value) => value,
            Held::Borrowed(value) => value,
        }
    }
}

/// Takes the single axis built for a plain (non-block) view.
pub(crate) fn single_axis(mut axes: Vec<ViewAxis>) -> eyre::Result<ViewAxis> {
    axes.pop()
        .ok_or_else(|| eyre!("Internal error: expected exactly one axis"))
}
