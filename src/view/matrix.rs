use crate::error::AssemblyError;
use crate::restriction::DofMapRestriction;
use crate::space::{same_dofmap, DofMap};
use crate::view::{build_axes, check_container_len, single_axis, Held, ViewAxis};
use crate::Real;
use eyre::eyre;
use fenris_la::nalgebra::DMatrixView;
use fenris_la::{IndexSetFactory, InsertMode, LaError, Matrix, MatrixInsert, NestMatrix};
use itertools::Itertools;
use std::sync::Arc;

/// A view of a matrix in the numbering of a pair of dofmaps.
///
/// Values are written with row and column indices in the unrolled numbering of the unrestricted
/// dofmaps. Entries whose row or column dof is not part of the respective restriction are dropped.
#[derive(Debug)]
pub struct SubMatrixView<'a, T: Real> {
    matrix: &'a mut Matrix<T>,
    rows: Held<'a, ViewAxis>,
    cols: Held<'a, ViewAxis>,
    block_sizes: [usize; 2],
}

impl<'a, T: Real> SubMatrixView<'a, T> {
    /// Opens a view of `matrix` through the row and column dofmaps, optionally restricted.
    ///
    /// Ghost rows and columns are always part of the view. The block sizes of the view are those of the
    /// dofmaps.
    pub fn new(
        matrix: &'a mut Matrix<T>,
        dofmaps: [&Arc<DofMap>; 2],
        restriction: Option<[&DofMapRestriction; 2]>,
        factory: &dyn IndexSetFactory,
    ) -> eyre::Result<Self> {
        let row_restriction = restriction.map(|[r, _]| [r]);
        let col_restriction = restriction.map(|[_, c]| [c]);
        let rows = build_axes(&[dofmaps[0]], row_restriction.as_ref().map(|r| &r[..]), true, factory)?;
        let cols = build_axes(&[dofmaps[1]], col_restriction.as_ref().map(|c| &c[..]), true, factory)?;
        check_container_len(&rows, matrix.nrows())?;
        check_container_len(&cols, matrix.ncols())?;
        let block_sizes = [dofmaps[0].index_map_bs(), dofmaps[1].index_map_bs()];
        Ok(Self {
            matrix,
            rows: Held::Owned(single_axis(rows)?),
            cols: Held::Owned(single_axis(cols)?),
            block_sizes,
        })
    }

    pub fn is_restricted(&self) -> bool {
        self.rows.is_restricted() || self.cols.is_restricted()
    }
}

/// Locates view positions, keeping the index of each located position in the input.
fn locate(axis: &ViewAxis, positions: &[usize]) -> Result<(Vec<usize>, Vec<usize>), LaError> {
    let mut kept = Vec::with_capacity(positions.len());
    let mut locations = Vec::with_capacity(positions.len());
    for (k, &p) in positions.iter().enumerate() {
        if p >= axis.len() {
            return Err(LaError::IndexOutOfBounds {
                index: p,
                len: axis.len(),
            });
        }
        if let Some(l) = axis.location(p) {
            kept.push(k);
            locations.push(l);
        }
    }
    Ok((kept, locations))
}

impl<'a, T: Real> MatrixInsert<T> for SubMatrixView<'a, T> {
    fn block_sizes(&self) -> [usize; 2] {
        self.block_sizes
    }

    fn set_values(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        values: DMatrixView<T>,
        mode: InsertMode,
    ) -> Result<(), LaError> {
        if values.shape() != (rows.len(), cols.len()) {
            return Err(LaError::DimensionMismatch {
                expected: (rows.len(), cols.len()),
                actual: values.shape(),
            });
        }
        let (kept_rows, row_locations) = locate(&self.rows, rows)?;
        let (kept_cols, col_locations) = locate(&self.cols, cols)?;
        if row_locations.is_empty() || col_locations.is_empty() {
            return Ok(());
        }
        let selected = values.select_rows(&kept_rows).select_columns(&kept_cols);
        self.matrix
            .set_values(&row_locations, &col_locations, selected.as_view(), mode)
    }
}

/// Views of the blocks of a block matrix.
///
/// The index sets of all block rows and all block columns are created once, on construction, and released
/// when this is dropped. The block views have unit block sizes.
#[derive(Debug)]
pub struct BlockSubMatrices<'a, T: Real> {
    matrix: &'a mut Matrix<T>,
    rows: Vec<ViewAxis>,
    cols: Vec<ViewAxis>,
}

impl<'a, T: Real> BlockSubMatrices<'a, T> {
    pub fn new(
        matrix: &'a mut Matrix<T>,
        dofmaps: [&[&Arc<DofMap>]; 2],
        restrictions: Option<[&[&DofMapRestriction]; 2]>,
        factory: &dyn IndexSetFactory,
    ) -> eyre::Result<Self> {
        let rows = build_axes(dofmaps[0], restrictions.map(|[r, _]| r), true, factory)?;
        let cols = build_axes(dofmaps[1], restrictions.map(|[_, c]| c), true, factory)?;
        check_container_len(&rows, matrix.nrows())?;
        check_container_len(&cols, matrix.ncols())?;
        Ok(Self { matrix, rows, cols })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    pub fn view(&mut self, i: usize, j: usize) -> SubMatrixView<'_, T> {
        SubMatrixView {
            matrix: &mut *self.matrix,
            rows: Held::Borrowed(&self.rows[i]),
            cols: Held::Borrowed(&self.cols[j]),
            block_sizes: [1, 1],
        }
    }

    /// Calls `f` with the view of every block, in row-major order.
    pub fn try_for_each<F>(&mut self, mut f: F) -> eyre::Result<()>
    where
        F: FnMut(usize, usize, &mut dyn MatrixInsert<T>) -> eyre::Result<()>,
    {
        let (nrows, ncols) = self.shape();
        for (i, j) in (0..nrows).cartesian_product(0..ncols) {
            let mut view = self.view(i, j);
            f(i, j, &mut view)?;
        }
        Ok(())
    }
}

/// A cell of a nest matrix: either the sub-matrix itself or a restricted view of it.
#[derive(Debug)]
pub enum NestSubMatrix<'a, T: Real> {
    Local(&'a mut Matrix<T>),
    Restricted(SubMatrixView<'a, T>),
}

impl<'a, T: Real> MatrixInsert<T> for NestSubMatrix<'a, T> {
    fn block_sizes(&self) -> [usize; 2] {
        match self {
            Self::Local(matrix) => matrix.block_sizes(),
            Self::Restricted(view) => view.block_sizes(),
        }
    }

    fn set_values(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        values: DMatrixView<T>,
        mode: InsertMode,
    ) -> Result<(), LaError> {
        match self {
            Self::Local(matrix) => matrix.set_values(rows, cols, values, mode),
            Self::Restricted(view) => view.set_values(rows, cols, values, mode),
        }
    }
}

/// Views of the cells of a nest matrix.
pub struct NestSubMatrices<'a, T: Real> {
    matrix: &'a mut NestMatrix<T>,
    #[allow(clippy::type_complexity)]
    restrictions: Option<([Vec<&'a Arc<DofMap>>; 2], [Vec<&'a DofMapRestriction>; 2])>,
    factory: &'a dyn IndexSetFactory,
}

impl<'a, T: Real> NestSubMatrices<'a, T> {
    /// Views that expose the sub-matrices directly.
    pub fn new(matrix: &'a mut NestMatrix<T>, factory: &'a dyn IndexSetFactory) -> Self {
        Self {
            matrix,
            restrictions: None,
            factory,
        }
    }

    /// Views that expose each sub-matrix through the unrestricted numbering of restricted dofmaps.
    pub fn restricted(
        matrix: &'a mut NestMatrix<T>,
        dofmaps: [&[&'a Arc<DofMap>]; 2],
        restrictions: [&[&'a DofMapRestriction]; 2],
        factory: &'a dyn IndexSetFactory,
    ) -> eyre::Result<Self> {
        let (nrows, ncols) = matrix.shape();
        for (axis, n) in [(0, nrows), (1, ncols)] {
            for (what, actual) in [("dofmaps", dofmaps[axis].len()), ("restrictions", restrictions[axis].len())] {
                if actual != n {
                    return Err(eyre!(AssemblyError::BlockCountMismatch {
                        what,
                        expected: n,
                        actual,
                    }));
                }
            }
            for (block, (dofmap, restriction)) in dofmaps[axis].iter().zip(restrictions[axis]).enumerate() {
                if !same_dofmap(dofmap, restriction.dofmap()) {
                    return Err(eyre!(AssemblyError::RestrictionDofMapMismatch { block }));
                }
            }
        }
        Ok(Self {
            matrix,
            restrictions: Some((
                [dofmaps[0].to_vec(), dofmaps[1].to_vec()],
                [restrictions[0].to_vec(), restrictions[1].to_vec()],
            )),
            factory,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }

    /// The cell `(i, j)`, or `None` if the cell has no sub-matrix.
    pub fn view(&mut self, i: usize, j: usize) -> eyre::Result<Option<NestSubMatrix<'_, T>>> {
        let sub_matrix = match self.matrix.sub_matrix_mut(i, j) {
            Some(sub_matrix) => sub_matrix,
            None => return Ok(None),
        };
        match &self.restrictions {
            None => Ok(Some(NestSubMatrix::Local(sub_matrix))),
            Some((dofmaps, restrictions)) => {
                let view = SubMatrixView::new(
                    sub_matrix,
                    [dofmaps[0][i], dofmaps[1][j]],
                    Some([restrictions[0][i], restrictions[1][j]]),
                    self.factory,
                )?;
                Ok(Some(NestSubMatrix::Restricted(view)))
            }
        }
    }

    /// Calls `f` with every cell, in row-major order.
    pub fn try_for_each<F>(&mut self, mut f: F) -> eyre::Result<()>
    where
        F: FnMut(usize, usize, Option<&mut dyn MatrixInsert<T>>) -> eyre::Result<()>,
    {
        let (nrows, ncols) = self.shape();
        for (i, j) in (0..nrows).cartesian_product(0..ncols) {
            match self.view(i, j)? {
                Some(mut cell) => f(i, j, Some(&mut cell as &mut dyn MatrixInsert<T>))?,
                None => f(i, j, None)?,
            }
        }
        Ok(())
    }
}
