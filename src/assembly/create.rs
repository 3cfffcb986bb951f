use crate::assembly::local::{BilinearForm, BlockBilinearForm, BlockLinearForm, LinearForm};
use crate::assembly::Assembler;
use crate::error::AssemblyError;
use crate::restriction::DofMapRestriction;
use crate::space::{same_dofmap, DofMap, FunctionSpace};
use crate::Real;
use eyre::eyre;
use fenris_la::{
    stack_index_maps, unroll, GhostBlockLayout, IndexMap, IndexSetFactory, Matrix, NestMatrix, NestVector,
    SparsityPatternBuilder, Vector,
};
use fenris_nested_vec::NestedVec;
use itertools::Itertools;
use log::debug;
use std::sync::Arc;

/// Numbering of one block along one axis: either the dofmap itself or its restriction.
struct AxisLayout<'a> {
    index_map: &'a IndexMap,
    bs: usize,
    cell_dofs: &'a NestedVec<usize>,
}

impl<'a> AxisLayout<'a> {
    fn new(dofmap: &'a Arc<DofMap>, restriction: Option<&'a DofMapRestriction>, block: usize) -> eyre::Result<Self> {
        match restriction {
            None => Ok(Self {
                index_map: dofmap.index_map(),
                bs: dofmap.index_map_bs(),
                cell_dofs: dofmap.cell_dofs_list(),
            }),
            Some(restriction) if same_dofmap(dofmap, restriction.dofmap()) => Ok(Self {
                index_map: restriction.index_map(),
                bs: restriction.index_map_bs(),
                cell_dofs: restriction.cell_dofs_list(),
            }),
            Some(_) => Err(eyre!(AssemblyError::RestrictionDofMapMismatch { block })),
        }
    }

    fn for_spaces(
        spaces: &'a [Arc<FunctionSpace>],
        restrictions: Option<&[&'a DofMapRestriction]>,
    ) -> eyre::Result<Vec<Self>> {
        check_block_count("restrictions", spaces.len(), restrictions.map(<[_]>::len))?;
        spaces
            .iter()
            .enumerate()
            .map(|(i, space)| Self::new(space.dofmap(), restrictions.map(|r| r[i]), i))
            .collect()
    }

    fn unrolled_len(&self) -> usize {
        self.index_map.size_with_ghosts() * self.bs
    }

    fn unrolled_cell_dofs(&self, cell: usize) -> Vec<usize> {
        let dofs = self
            .cell_dofs
            .get(cell)
            .expect("Internal error: cell counts are checked before iterating");
        unroll(dofs, self.bs)
    }

    fn num_cells(&self) -> usize {
        self.cell_dofs.len()
    }
}

pub(crate) fn check_block_count(what: &'static str, expected: usize, actual: Option<usize>) -> eyre::Result<()> {
    match actual {
        Some(actual) if actual != expected => Err(eyre!(AssemblyError::BlockCountMismatch {
            what,
            expected,
            actual
        })),
        _ => Ok(()),
    }
}

fn check_cells(rows: &AxisLayout, cols: &AxisLayout) -> eyre::Result<usize> {
    if rows.num_cells() != cols.num_cells() {
        return Err(eyre!(AssemblyError::CellCountMismatch {
            expected: rows.num_cells(),
            actual: cols.num_cells(),
        }));
    }
    Ok(rows.num_cells())
}

fn plain_matrix<T: Real>(
    form: &dyn BilinearForm<T>,
    rows: &AxisLayout,
    cols: &AxisLayout,
) -> eyre::Result<Matrix<T>> {
    let num_cells = check_cells(rows, cols)?;
    let mut builder = SparsityPatternBuilder::new(rows.unrolled_len(), cols.unrolled_len());
    if !form.integral_types().is_empty() {
        for cell in 0..num_cells {
            builder.insert_block(&rows.unrolled_cell_dofs(cell), &cols.unrolled_cell_dofs(cell));
        }
    }
    let pattern = builder.build();
    debug!(
        "Created {}x{} matrix with {} stored entries",
        rows.unrolled_len(),
        cols.unrolled_len(),
        pattern.nnz()
    );
    let matrix = Matrix::from_pattern(rows.index_map.clone(), cols.index_map.clone(), [rows.bs, cols.bs], pattern)?;
    Ok(matrix)
}

impl<F: IndexSetFactory> Assembler<F> {
    /// A zero vector laid out like the test space of the form, or like its restriction.
    pub fn create_vector<T: Real>(
        &self,
        form: &dyn LinearForm<T>,
        restriction: Option<&DofMapRestriction>,
    ) -> eyre::Result<Vector<T>> {
        let layout = AxisLayout::new(form.test_space().dofmap(), restriction, 0)?;
        Ok(Vector::new(layout.index_map.clone(), layout.bs))
    }

    /// A zero block vector stacking the (restricted) test spaces of the forms.
    pub fn create_vector_block<T: Real>(
        &self,
        forms: &BlockLinearForm<T>,
        restrictions: Option<&[&DofMapRestriction]>,
    ) -> eyre::Result<Vector<T>> {
        let spaces = forms.function_spaces();
        let layouts = AxisLayout::for_spaces(&spaces, restrictions)?;
        let maps: Vec<_> = layouts.iter().map(|l| (l.index_map, l.bs)).collect();
        Ok(Vector::new(stack_index_maps(&maps)?, 1))
    }

    /// A zero nest vector with one sub-vector per (restricted) test space of the forms.
    pub fn create_vector_nest<T: Real>(
        &self,
        forms: &BlockLinearForm<T>,
        restrictions: Option<&[&DofMapRestriction]>,
    ) -> eyre::Result<NestVector<T>> {
        let spaces = forms.function_spaces();
        let layouts = AxisLayout::for_spaces(&spaces, restrictions)?;
        let blocks = layouts
            .iter()
            .map(|l| Vector::new(l.index_map.clone(), l.bs))
            .collect();
        Ok(NestVector::new(blocks))
    }

    /// A zero matrix with the sparsity pattern of the form.
    ///
    /// `restriction` holds the row and the column restriction.
    pub fn create_matrix<T: Real>(
        &self,
        form: &dyn BilinearForm<T>,
        restriction: Option<[&DofMapRestriction; 2]>,
    ) -> eyre::Result<Matrix<T>> {
        let rows = AxisLayout::new(form.test_space().dofmap(), restriction.map(|[r, _]| r), 0)?;
        let cols = AxisLayout::new(form.trial_space().dofmap(), restriction.map(|[_, c]| c), 0)?;
        plain_matrix(form, &rows, &cols)
    }

    /// A zero block matrix with the combined sparsity pattern of all present blocks.
    ///
    /// `restrictions` holds the restrictions of the block rows and of the block columns.
    pub fn create_matrix_block<T: Real>(
        &self,
        form: &BlockBilinearForm<T>,
        restrictions: Option<[&[&DofMapRestriction]; 2]>,
    ) -> eyre::Result<Matrix<T>> {
        let rows = AxisLayout::for_spaces(form.row_spaces(), restrictions.map(|[r, _]| r))?;
        let cols = AxisLayout::for_spaces(form.col_spaces(), restrictions.map(|[_, c]| c))?;
        let row_maps: Vec<_> = rows.iter().map(|l| (l.index_map, l.bs)).collect();
        let col_maps: Vec<_> = cols.iter().map(|l| (l.index_map, l.bs)).collect();
        let row_map = stack_index_maps(&row_maps)?;
        let col_map = stack_index_maps(&col_maps)?;

        let row_sets = self
            .factory
            .create_index_sets(&row_maps, true, GhostBlockLayout::Trailing);
        let col_sets = self
            .factory
            .create_index_sets(&col_maps, true, GhostBlockLayout::Trailing);

        let mut builder = SparsityPatternBuilder::new(row_map.size_with_ghosts(), col_map.size_with_ghosts());
        let (nrows, ncols) = form.shape();
        for (i, j) in (0..nrows).cartesian_product(0..ncols) {
            let present = form
                .get(i, j)
                .map(|a_ij| !a_ij.integral_types().is_empty())
                .unwrap_or(false);
            if !present {
                continue;
            }
            let num_cells = check_cells(&rows[i], &cols[j])?;
            let (row_positions, col_positions) = (row_sets[i].indices(), col_sets[j].indices());
            for cell in 0..num_cells {
                let block_rows: Vec<usize> = rows[i]
                    .unrolled_cell_dofs(cell)
                    .into_iter()
                    .map(|p| row_positions[p])
                    .collect();
                let block_cols: Vec<usize> = cols[j]
                    .unrolled_cell_dofs(cell)
                    .into_iter()
                    .map(|p| col_positions[p])
                    .collect();
                builder.insert_block(&block_rows, &block_cols);
            }
        }
        let pattern = builder.build();
        debug!(
            "Created {}x{} block matrix with {} stored entries",
            row_map.size_with_ghosts(),
            col_map.size_with_ghosts(),
            pattern.nnz()
        );
        Ok(Matrix::from_pattern(row_map, col_map, [1, 1], pattern)?)
    }

    /// A nest matrix with a zero sub-matrix for each present block and no sub-matrix for absent blocks.
    pub fn create_matrix_nest<T: Real>(
        &self,
        form: &BlockBilinearForm<T>,
        restrictions: Option<[&[&DofMapRestriction]; 2]>,
    ) -> eyre::Result<NestMatrix<T>> {
        let rows = AxisLayout::for_spaces(form.row_spaces(), restrictions.map(|[r, _]| r))?;
        let cols = AxisLayout::for_spaces(form.col_spaces(), restrictions.map(|[_, c]| c))?;
        let (nrows, ncols) = form.shape();
        let mut blocks = Vec::with_capacity(nrows);
        for i in 0..nrows {
            let mut block_row = Vec::with_capacity(ncols);
            for j in 0..ncols {
                let block = form
                    .get(i, j)
                    .map(|a_ij| plain_matrix(a_ij, &rows[i], &cols[j]))
                    .transpose()?;
                block_row.push(block);
            }
            blocks.push(block_row);
        }
        Ok(NestMatrix::new(blocks)?)
    }
}
