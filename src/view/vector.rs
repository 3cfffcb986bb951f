use crate::error::AssemblyError;
use crate::restriction::DofMapRestriction;
use crate::space::{same_dofmap, DofMap};
use crate::view::{build_axes, check_container_len, single_axis, Held, ViewAxis};
use crate::Real;
use eyre::eyre;
use fenris_la::{IndexSetFactory, Vector};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

fn gather<T: Real>(local: &[T], axis: &ViewAxis) -> Vec<T> {
    axis.locations()
        .iter()
        .map(|location| location.map(|l| local[l]).unwrap_or_else(T::zero))
        .collect()
}

fn single_restriction(restriction: Option<&DofMapRestriction>) -> Option<[&DofMapRestriction; 1]> {
    restriction.map(|r| [r])
}

/// A writable view of a vector in the numbering of a dofmap.
///
/// The content has one entry per unrolled dof of the (unrestricted) dofmap. Entries whose dof is not
/// part of the restriction read as zero and are discarded on restore. The content is written back to the
/// vector when the view is dropped.
#[derive(Debug)]
pub struct SubVectorView<'a, T: Real> {
    vector: &'a mut Vector<T>,
    axis: Held<'a, ViewAxis>,
    content: Vec<T>,
}

impl<'a, T: Real> SubVectorView<'a, T> {
    /// Opens a view of `vector` through `dofmap`, optionally restricted.
    ///
    /// Without `ghosted`, only the owned dofs are part of the view.
    pub fn new(
        vector: &'a mut Vector<T>,
        dofmap: &Arc<DofMap>,
        restriction: Option<&DofMapRestriction>,
        ghosted: bool,
        factory: &dyn IndexSetFactory,
    ) -> eyre::Result<Self> {
        let restrictions = single_restriction(restriction);
        let axes = build_axes(&[dofmap], restrictions.as_ref().map(|r| &r[..]), ghosted, factory)?;
        check_container_len(&axes, vector.local_len())?;
        let axis = single_axis(axes)?;
        Ok(Self::with_axis(vector, Held::Owned(axis)))
    }

    fn with_axis(vector: &'a mut Vector<T>, axis: Held<'a, ViewAxis>) -> Self {
        let content = gather(vector.local(), &axis);
        Self { vector, axis, content }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut [T] {
        &mut self.content
    }

    pub fn is_restricted(&self) -> bool {
        self.axis.is_restricted()
    }
}

impl<'a, T: Real> Deref for SubVectorView<'a, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.content
    }
}

impl<'a, T: Real> DerefMut for SubVectorView<'a, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.content
    }
}

impl<'a, T: Real> Drop for SubVectorView<'a, T> {
    fn drop(&mut self) {
        let local = self.vector.local_mut();
        for (value, location) in self.content.iter().zip(self.axis.locations()) {
            if let Some(l) = location {
                local[*l] = *value;
            }
        }
    }
}

/// A read-only view of a vector in the numbering of a dofmap.
///
/// Same layout as [`SubVectorView`], but nothing is written back.
#[derive(Debug)]
pub struct SubVectorReadView<'a, T: Real> {
    axis: Held<'a, ViewAxis>,
    content: Vec<T>,
    vector: PhantomData<&'a Vector<T>>,
}

impl<'a, T: Real> SubVectorReadView<'a, T> {
    pub fn new(
        vector: &'a Vector<T>,
        dofmap: &Arc<DofMap>,
        restriction: Option<&DofMapRestriction>,
        ghosted: bool,
        factory: &dyn IndexSetFactory,
    ) -> eyre::Result<Self> {
        let restrictions = single_restriction(restriction);
        let axes = build_axes(&[dofmap], restrictions.as_ref().map(|r| &r[..]), ghosted, factory)?;
        check_container_len(&axes, vector.local_len())?;
        let axis = single_axis(axes)?;
        Ok(Self::with_axis(vector, Held::Owned(axis)))
    }

    fn with_axis(vector: &'a Vector<T>, axis: Held<'a, ViewAxis>) -> Self {
        let content = gather(vector.local(), &axis);
        Self {
            axis,
            content,
            vector: PhantomData,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn is_restricted(&self) -> bool {
        self.axis.is_restricted()
    }
}

impl<'a, T: Real> Deref for SubVectorReadView<'a, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.content
    }
}

/// Writable views of the blocks of a block vector.
///
/// The index sets of all blocks are created once, on construction, and released when this is dropped.
#[derive(Debug)]
pub struct BlockSubVectors<'a, T: Real> {
    vector: &'a mut Vector<T>,
    axes: Vec<ViewAxis>,
}

impl<'a, T: Real> BlockSubVectors<'a, T> {
    pub fn new(
        vector: &'a mut Vector<T>,
        dofmaps: &[&Arc<DofMap>],
        restrictions: Option<&[&DofMapRestriction]>,
        ghosted: bool,
        factory: &dyn IndexSetFactory,
    ) -> eyre::Result<Self> {
        let axes = build_axes(dofmaps, restrictions, ghosted, factory)?;
        check_container_len(&axes, vector.local_len())?;
        Ok(Self { vector, axes })
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// View of block `index`, restored into the block vector when dropped.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not smaller than the number of blocks.
    pub fn view(&mut self, index: usize) -> SubVectorView<'_, T> {
        let axis = &self.axes[index];
        SubVectorView::with_axis(&mut *self.vector, Held::Borrowed(axis))
    }

    /// Calls `f` with the content of each block in order, restoring each block before moving on.
    pub fn try_for_each<F>(&mut self, mut f: F) -> eyre::Result<()>
    where
        F: FnMut(usize, &mut [T]) -> eyre::Result<()>,
    {
        for index in 0..self.len() {
            let mut view = self.view(index);
            f(index, &mut *view)?;
        }
        Ok(())
    }
}

/// Read-only views of the blocks of a block vector.
#[derive(Debug)]
pub struct BlockSubVectorsRead<'a, T: Real> {
    vector: &'a Vector<T>,
    axes: Vec<ViewAxis>,
}

impl<'a, T: Real> BlockSubVectorsRead<'a, T> {
    pub fn new(
        vector: &'a Vector<T>,
        dofmaps: &[&Arc<DofMap>],
        restrictions: Option<&[&DofMapRestriction]>,
        ghosted: bool,
        factory: &dyn IndexSetFactory,
    ) -> eyre::Result<Self> {
        let axes = build_axes(dofmaps, restrictions, ghosted, factory)?;
        check_container_len(&axes, vector.local_len())?;
        Ok(Self { vector, axes })
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `index` is not smaller than the number of blocks.
    pub fn view(&self, index: usize) -> SubVectorReadView<'_, T> {
        SubVectorReadView::with_axis(self.vector, Held::Borrowed(&self.axes[index]))
    }

    /// Views of all blocks, in order.
    pub fn views(&self) -> Vec<SubVectorReadView<'_, T>> {
        (0..self.len()).map(|index| self.view(index)).collect()
    }
}

/// A block of a nest vector: either the local array of the sub-vector or a restricted view of it.
#[derive(Debug)]
pub enum NestSubVector<'a, T: Real> {
    Local(&'a mut [T]),
    Restricted(SubVectorView<'a, T>),
}

impl<'a, T: Real> Deref for NestSubVector<'a, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match self {
            Self::Local(local) => local,
            Self::Restricted(view) => view,
        }
    }
}

impl<'a, T: Real> DerefMut for NestSubVector<'a, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        match self {
            Self::Local(local) => local,
            Self::Restricted(view) => view,
        }
    }
}

/// Read-only counterpart of [`NestSubVector`].
#[derive(Debug)]
pub enum NestSubVectorRead<'a, T: Real> {
    Local(&'a [T]),
    Restricted(SubVectorReadView<'a, T>),
}

impl<'a, T: Real> Deref for NestSubVectorRead<'a, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match self {
            Self::Local(local) => local,
            Self::Restricted(view) => view,
        }
    }
}

fn validate_nest_restrictions(
    num_blocks: usize,
    dofmaps: &[&Arc<DofMap>],
    restrictions: &[&DofMapRestriction],
) -> eyre::Result<()> {
    for (what, actual) in [("dofmaps", dofmaps.len()), ("restrictions", restrictions.len())] {
        if actual != num_blocks {
            return Err(eyre!(AssemblyError::BlockCountMismatch {
                what,
                expected: num_blocks,
                actual,
            }));
        }
    }
    for (block, (dofmap, restriction)) in dofmaps.iter().zip(restrictions).enumerate() {
        if !same_dofmap(dofmap, restriction.dofmap()) {
            return Err(eyre!(AssemblyError::RestrictionDofMapMismatch { block }));
        }
    }
    Ok(())
}

/// Writable views of the sub-vectors of a nest vector.
///
/// Unlike [`BlockSubVectors`], index sets are created per block when a view is opened, since the
/// sub-vectors are independent containers.
pub struct NestSubVectors<'a, T: Real> {
    blocks: &'a mut [Vector<T>],
    restrictions: Option<(Vec<&'a Arc<DofMap>>, Vec<&'a DofMapRestriction>)>,
    ghosted: bool,
    factory: &'a dyn IndexSetFactory,
}

impl<'a, T: Real> NestSubVectors<'a, T> {
    /// Views that expose the local arrays of the sub-vectors directly.
    pub fn new(blocks: &'a mut [Vector<T>], ghosted: bool, factory: &'a dyn IndexSetFactory) -> Self {
        Self {
            blocks,
            restrictions: None,
            ghosted,
            factory,
        }
    }

    /// Views that expose each sub-vector through the unrestricted numbering of a restricted dofmap.
    pub fn restricted(
        blocks: &'a mut [Vector<T>],
        dofmaps: &[&'a Arc<DofMap>],
        restrictions: &[&'a DofMapRestriction],
        ghosted: bool,
        factory: &'a dyn IndexSetFactory,
    ) -> eyre::Result<Self> {
        validate_nest_restrictions(blocks.len(), dofmaps, restrictions)?;
        Ok(Self {
            blocks,
            restrictions: Some((dofmaps.to_vec(), restrictions.to_vec())),
            ghosted,
            factory,
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `index` is not smaller than the number of sub-vectors.
    pub fn view(&mut self, index: usize) -> eyre::Result<NestSubVector<'_, T>> {
        let block = &mut self.blocks[index];
        match &self.restrictions {
            None if self.ghosted => Ok(NestSubVector::Local(block.local_mut())),
            None => Ok(NestSubVector::Local(block.owned_mut())),
            Some((dofmaps, restrictions)) => {
                let view =
                    SubVectorView::new(block, dofmaps[index], Some(restrictions[index]), self.ghosted, self.factory)?;
                Ok(NestSubVector::Restricted(view))
            }
        }
    }

    /// Calls `f` with the content of each sub-vector in order, restoring each block before moving on.
    pub fn try_for_each<F>(&mut self, mut f: F) -> eyre::Result<()>
    where
        F: FnMut(usize, &mut [T]) -> eyre::Result<()>,
    {
        for index in 0..self.len() {
            let mut view = self.view(index)?;
            f(index, &mut *view)?;
        }
        Ok(())
    }
}

/// Read-only views of the sub-vectors of a nest vector.
pub struct NestSubVectorsRead<'a, T: Real> {
    blocks: Vec<&'a Vector<T>>,
    restrictions: Option<(Vec<&'a Arc<DofMap>>, Vec<&'a DofMapRestriction>)>,
    ghosted: bool,
    factory: &'a dyn IndexSetFactory,
}

impl<'a, T: Real> NestSubVectorsRead<'a, T> {
    pub fn new(blocks: Vec<&'a Vector<T>>, ghosted: bool, factory: &'a dyn IndexSetFactory) -> Self {
        Self {
            blocks,
            restrictions: None,
            ghosted,
            factory,
        }
    }

    pub fn restricted(
        blocks: Vec<&'a Vector<T>>,
        dofmaps: &[&'a Arc<DofMap>],
        restrictions: &[&'a DofMapRestriction],
        ghosted: bool,
        factory: &'a dyn IndexSetFactory,
    ) -> eyre::Result<Self> {
        validate_nest_restrictions(blocks.len(), dofmaps, restrictions)?;
        Ok(Self {
            blocks,
            restrictions: Some((dofmaps.to_vec(), restrictions.to_vec())),
            ghosted,
            factory,
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `index` is not smaller than the number of sub-vectors.
    pub fn view(&self, index: usize) -> eyre::Result<NestSubVectorRead<'a, T>> {
        let block = self.blocks[index];
        match &self.restrictions {
            None if self.ghosted => Ok(NestSubVectorRead::Local(block.local())),
            None => Ok(NestSubVectorRead::Local(block.owned())),
            Some((dofmaps, restrictions)) => {
                let view =
                    SubVectorReadView::new(block, dofmaps[index], Some(restrictions[index]), self.ghosted, self.factory)?;
                Ok(NestSubVectorRead::Restricted(view))
            }
        }
    }

    /// Views of all sub-vectors, in order.
    pub fn views(&self) -> eyre::Result<Vec<NestSubVectorRead<'a, T>>> {
        (0..self.len()).map(|index| self.view(index)).collect()
    }
}
