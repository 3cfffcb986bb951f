//! Forms and their cell kernels.
use crate::error::AssemblyError;
use crate::space::FunctionSpace;
use eyre::eyre;
use nalgebra::{DMatrixViewMut, DVectorViewMut, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kinds of integrals a form may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegralType {
    Cell,
    ExteriorFacet,
}

/// A form that evaluates to a scalar.
pub trait ScalarForm<T: Scalar> {
    fn num_cells(&self) -> usize;

    fn assemble_cell_scalar(&self, cell: usize) -> eyre::Result<T>;
}

/// A form that is linear in its test function.
///
/// The cell kernel writes the element vector of a cell. The element vector has one entry for each
/// component of each dof of the cell, in the order given by the dofmap of the test space, so its length is
/// `bs * cell_dofs(cell).len()`. The output is zeroed before the kernel is called.
pub trait LinearForm<T: Scalar> {
    fn test_space(&self) -> &Arc<FunctionSpace>;

    fn integral_types(&self) -> Vec<IntegralType> {
        vec![IntegralType::Cell]
    }

    fn assemble_cell_vector_into(&self, cell: usize, output: DVectorViewMut<T>) -> eyre::Result<()>;
}

/// A form that is linear in both its test and its trial function.
///
/// The element matrix of a cell has one row for each unrolled test dof and one column for each unrolled
/// trial dof of the cell. The output is zeroed before the kernel is called.
pub trait BilinearForm<T: Scalar> {
    fn test_space(&self) -> &Arc<FunctionSpace>;

    fn trial_space(&self) -> &Arc<FunctionSpace>;

    fn integral_types(&self) -> Vec<IntegralType> {
        vec![IntegralType::Cell]
    }

    fn assemble_cell_matrix_into(&self, cell: usize, output: DMatrixViewMut<T>) -> eyre::Result<()>;
}

/// A list of linear forms, one per block.
pub struct BlockLinearForm<'a, T: Scalar> {
    forms: Vec<&'a dyn LinearForm<T>>,
}

impl<'a, T: Scalar> fmt::Debug for BlockLinearForm<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockLinearForm")
            .field("len", &self.forms.len())
            .finish()
    }
}

impl<'a, T: Scalar> BlockLinearForm<'a, T> {
    pub fn new(forms: Vec<&'a dyn LinearForm<T>>) -> Self {
        Self { forms }
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    pub fn get(&self, i: usize) -> &'a dyn LinearForm<T> {
        self.forms[i]
    }

    pub fn forms(&self) -> &[&'a dyn LinearForm<T>] {
        &self.forms
    }

    /// Test spaces of the blocks.
    pub fn function_spaces(&self) -> Vec<Arc<FunctionSpace>> {
        self.forms.iter().map(|form| Arc::clone(form.test_space())).collect()
    }
}

/// A rectangular grid of bilinear forms where absent blocks are structurally zero.
///
/// All forms in block row `i` share the test space `row_spaces()[i]`, and all forms in block
/// column `j` share the trial space `col_spaces()[j]`.
pub struct BlockBilinearForm<'a, T: Scalar> {
    forms: Vec<Vec<Option<&'a dyn BilinearForm<T>>>>,
    row_spaces: Vec<Arc<FunctionSpace>>,
    col_spaces: Vec<Arc<FunctionSpace>>,
}

impl<'a, T: Scalar> fmt::Debug for BlockBilinearForm<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present: Vec<Vec<bool>> = self
            .forms
            .iter()
            .map(|row| row.iter().map(Option::is_some).collect())
            .collect();
        f.debug_struct("BlockBilinearForm")
            .field("present", &present)
            .finish()
    }
}

impl<'a, T: Scalar> BlockBilinearForm<'a, T> {
    /// Creates a block form from rows of optional forms.
    ///
    /// Fails if the rows have different lengths, if a block row or column has no form, or if the
    /// forms of a block row (column) do not share their test (trial) space.
    pub fn new(forms: Vec<Vec<Option<&'a dyn BilinearForm<T>>>>) -> eyre::Result<Self> {
        let nrows = forms.len();
        let ncols = forms.first().map(Vec::len).unwrap_or(0);
        if let Some(row) = forms.iter().find(|row| row.len() != ncols) {
            return Err(eyre!(AssemblyError::BlockCountMismatch {
                what: "block form row",
                expected: ncols,
                actual: row.len(),
            }));
        }

        let mut row_spaces = Vec::with_capacity(nrows);
        for (i, row) in forms.iter().enumerate() {
            let space = row
                .iter()
                .flatten()
                .map(|form| form.test_space())
                .next()
                .ok_or_else(|| eyre!(AssemblyError::EmptyBlockRow { row: i }))?;
            row_spaces.push(Arc::clone(space));
        }

        let mut col_spaces = Vec::with_capacity(ncols);
        for j in 0..ncols {
            let space = forms
                .iter()
                .filter_map(|row| row[j])
                .map(|form| form.trial_space())
                .next()
                .ok_or_else(|| eyre!(AssemblyError::EmptyBlockColumn { col: j }))?;
            col_spaces.push(Arc::clone(space));
        }

        for (i, row) in forms.iter().enumerate() {
            for (j, form) in row.iter().enumerate() {
                if let Some(form) = form {
                    let consistent = FunctionSpace::same(form.test_space(), &row_spaces[i])
                        && FunctionSpace::same(form.trial_space(), &col_spaces[j]);
                    if !consistent {
                        return Err(eyre!(AssemblyError::InconsistentBlockForm { row: i, col: j }));
                    }
                }
            }
        }

        Ok(Self {
            forms,
            row_spaces,
            col_spaces,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.row_spaces.len(), self.col_spaces.len())
    }

    /// The form of block `(i, j)`, or `None` for an absent block.
    ///
    /// # Panics
    ///
    /// Panics if `(i, j)` lies outside [`shape`](Self::shape).
    pub fn get(&self, i: usize, j: usize) -> Option<&'a dyn BilinearForm<T>> {
        self.forms[i][j]
    }

    pub fn row_spaces(&self) -> &[Arc<FunctionSpace>] {
        &self.row_spaces
    }

    pub fn col_spaces(&self) -> &[Arc<FunctionSpace>] {
        &self.col_spaces
    }
}
