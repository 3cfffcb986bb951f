//! Assembly kernels.
//!
//! The kernels write into plain slices and [`MatrixInsert`] handles indexed by the unrolled dofs of the
//! forms' dofmaps. They know nothing about restrictions or block layouts: the entry points in
//! [`Assembler`](crate::assembly::Assembler) hand them views that take care of the translation.
use crate::assembly::local::{BilinearForm, LinearForm, ScalarForm};
use crate::bc::{prescribed_values, DirichletBC};
use crate::error::AssemblyError;
use crate::space::FunctionSpace;
use crate::Real;
use eyre::eyre;
use fenris_la::{unroll, InsertMode, MatrixInsert};
use log::trace;
use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorViewMut};
use std::sync::Arc;

pub fn assemble_scalar<T: Real>(form: &dyn ScalarForm<T>) -> eyre::Result<T> {
    let mut total = T::zero();
    for cell in 0..form.num_cells() {
        total += form.assemble_cell_scalar(cell)?;
    }
    Ok(total)
}

fn add_element_vector<T: Real>(b: &mut [T], dofs: &[usize], bs: usize, element_vector: &DVector<T>) -> eyre::Result<()> {
    let len = b.len();
    for (k, &dof) in dofs.iter().enumerate() {
        for c in 0..bs {
            let index = dof * bs + c;
            let entry = b
                .get_mut(index)
                .ok_or_else(|| eyre!(AssemblyError::DofOutOfBounds { dof: index, len }))?;
            *entry += element_vector[k * bs + c];
        }
    }
    Ok(())
}

/// Adds the cell contributions of a linear form to `b`, indexed by the unrolled dofs of its test space.
pub fn assemble_vector_into<T: Real>(b: &mut [T], form: &dyn LinearForm<T>) -> eyre::Result<()> {
    let dofmap = form.test_space().dofmap();
    let bs = dofmap.index_map_bs();
    let mut element_vector = DVector::zeros(0);
    for cell in 0..dofmap.num_cells() {
        let dofs = dofmap.cell_dofs(cell);
        element_vector.resize_vertically_mut(bs * dofs.len(), T::zero());
        element_vector.fill(T::zero());
        form.assemble_cell_vector_into(cell, DVectorViewMut::from(&mut element_vector))?;
        add_element_vector(b, dofs, bs, &element_vector)?;
    }
    trace!("Assembled vector over {} cells", dofmap.num_cells());
    Ok(())
}

fn check_cell_counts<T: Real>(form: &dyn BilinearForm<T>) -> eyre::Result<usize> {
    let expected = form.test_space().dofmap().num_cells();
    let actual = form.trial_space().dofmap().num_cells();
    if expected != actual {
        return Err(eyre!(AssemblyError::CellCountMismatch { expected, actual }));
    }
    Ok(expected)
}

fn compute_element_matrix<T: Real>(
    form: &dyn BilinearForm<T>,
    cell: usize,
    element_matrix: &mut DMatrix<T>,
) -> eyre::Result<()> {
    let test = form.test_space().dofmap();
    let trial = form.trial_space().dofmap();
    let nrows = test.index_map_bs() * test.cell_dofs(cell).len();
    let ncols = trial.index_map_bs() * trial.cell_dofs(cell).len();
    element_matrix.resize_mut(nrows, ncols, T::zero());
    element_matrix.fill(T::zero());
    form.assemble_cell_matrix_into(cell, DMatrixViewMut::from(&mut *element_matrix))
}

/// Markers for the unrolled dofs of `space` constrained by any of the conditions posed on it.
fn bc_markers<T: Real>(space: &Arc<FunctionSpace>, bcs: &[&DirichletBC<T>]) -> Vec<bool> {
    let mut markers = vec![false; space.dofmap().unrolled_local_len()];
    for bc in bcs.iter().filter(|bc| bc.is_on(space)) {
        for &dof in bc.dofs() {
            markers[dof] = true;
        }
    }
    markers
}

fn assemble_matrix_impl<T: Real>(
    a: &mut dyn MatrixInsert<T>,
    form: &dyn BilinearForm<T>,
    bcs: &[&DirichletBC<T>],
    blocked: bool,
) -> eyre::Result<()> {
    let num_cells = check_cell_counts(form)?;
    let test = form.test_space().dofmap();
    let trial = form.trial_space().dofmap();
    let (bs0, bs1) = (test.index_map_bs(), trial.index_map_bs());
    if blocked && a.block_sizes() != [bs0, bs1] {
        return Err(eyre!(AssemblyError::BlockSizeMismatch {
            expected: [bs0, bs1],
            actual: a.block_sizes(),
        }));
    }

    let row_markers = bc_markers(form.test_space(), bcs);
    let col_markers = bc_markers(form.trial_space(), bcs);

    let mut element_matrix = DMatrix::zeros(0, 0);
    for cell in 0..num_cells {
        let dofs0 = test.cell_dofs(cell);
        let dofs1 = trial.cell_dofs(cell);
        compute_element_matrix(form, cell, &mut element_matrix)?;

        // Constrained rows and columns only receive their diagonal entries later
        for (k, index) in unroll(dofs0, bs0).into_iter().enumerate() {
            if row_markers[index] {
                element_matrix.row_mut(k).fill(T::zero());
            }
        }
        for (k, index) in unroll(dofs1, bs1).into_iter().enumerate() {
            if col_markers[index] {
                element_matrix.column_mut(k).fill(T::zero());
            }
        }

        if blocked {
            a.set_values_blocked(dofs0, dofs1, element_matrix.as_view(), InsertMode::Add)?;
        } else {
            let rows = unroll(dofs0, bs0);
            let cols = unroll(dofs1, bs1);
            a.set_values(&rows, &cols, element_matrix.as_view(), InsertMode::Add)?;
        }
    }
    trace!("Assembled matrix over {} cells", num_cells);
    Ok(())
}

/// Adds the cell contributions of a bilinear form to `a`, inserting with block indices.
///
/// Rows (columns) of dofs constrained by conditions posed on the test (trial) space are zeroed in each
/// element matrix. The block sizes of `a` must match the block sizes of the form's dofmaps.
pub fn assemble_matrix_into<T: Real>(
    a: &mut dyn MatrixInsert<T>,
    form: &dyn BilinearForm<T>,
    bcs: &[&DirichletBC<T>],
) -> eyre::Result<()> {
    assemble_matrix_impl(a, form, bcs, true)
}

/// Same as [`assemble_matrix_into`], but inserts with unrolled scalar indices.
pub fn assemble_matrix_unrolled_into<T: Real>(
    a: &mut dyn MatrixInsert<T>,
    form: &dyn BilinearForm<T>,
    bcs: &[&DirichletBC<T>],
) -> eyre::Result<()> {
    assemble_matrix_impl(a, form, bcs, false)
}

/// Modifies `b` to account for prescribed values of the trial functions of the given forms.
///
/// For every form `a_j` with conditions `bcs[j]`, computes `b <- b - scale * A_j (g_j - x0_j)`, where `g_j`
/// holds the prescribed values on the constrained dofs and zero elsewhere. `x0` is either empty (taken
/// as zero) or holds one array per form, indexed by the unrolled dofs of the form's trial space.
pub fn apply_lifting_into<T: Real>(
    b: &mut [T],
    forms: &[&dyn BilinearForm<T>],
    bcs: &[Vec<&DirichletBC<T>>],
    x0: &[&[T]],
    scale: T,
) -> eyre::Result<()> {
    if bcs.len() != forms.len() {
        return Err(eyre!(AssemblyError::BlockCountMismatch {
            what: "lifting boundary conditions",
            expected: forms.len(),
            actual: bcs.len(),
        }));
    }
    if !x0.is_empty() && x0.len() != forms.len() {
        return Err(eyre!(AssemblyError::BlockCountMismatch {
            what: "lifting initial guesses",
            expected: forms.len(),
            actual: x0.len(),
        }));
    }

    let mut element_matrix = DMatrix::zeros(0, 0);
    let mut element_vector = DVector::zeros(0);
    for (j, (form, bcs_j)) in forms.iter().zip(bcs).enumerate() {
        let trial_bcs: Vec<_> = bcs_j
            .iter()
            .copied()
            .filter(|bc| bc.is_on(form.trial_space()))
            .collect();
        let values = prescribed_values(&trial_bcs);
        if values.is_empty() {
            continue;
        }
        let x0_j = x0.get(j).copied();

        let num_cells = check_cell_counts(*form)?;
        let test = form.test_space().dofmap();
        let trial = form.trial_space().dofmap();
        let (bs0, bs1) = (test.index_map_bs(), trial.index_map_bs());
        for cell in 0..num_cells {
            let cols = unroll(trial.cell_dofs(cell), bs1);
            if !cols.iter().any(|col| values.contains_key(col)) {
                continue;
            }
            compute_element_matrix(*form, cell, &mut element_matrix)?;
            element_vector.resize_vertically_mut(element_matrix.nrows(), T::zero());
            element_vector.fill(T::zero());
            for (k, col) in cols.iter().enumerate() {
                if let Some(&g) = values.get(col) {
                    let x = match x0_j {
                        Some(x0_j) => *x0_j.get(*col).ok_or_else(|| {
                            eyre!(AssemblyError::DofOutOfBounds {
                                dof: *col,
                                len: x0_j.len()
                            })
                        })?,
                        None => T::zero(),
                    };
                    element_vector.axpy(-scale * (g - x), &element_matrix.column(k), T::one());
                }
            }
            add_element_vector(b, test.cell_dofs(cell), bs0, &element_vector)?;
        }
    }
    Ok(())
}

/// Sets `b[dof] = scale * (g - x0[dof])` for every owned dof constrained by the given conditions.
pub fn set_bc_into<T: Real>(b: &mut [T], bcs: &[&DirichletBC<T>], x0: Option<&[T]>, scale: T) -> eyre::Result<()> {
    let len = b.len();
    for bc in bcs {
        for (dof, g) in bc.owned_dofs_and_values() {
            let x = match x0 {
                Some(x0) => *x0.get(dof).ok_or_else(|| {
                    eyre!(AssemblyError::DofOutOfBounds {
                        dof,
                        len: x0.len()
                    })
                })?,
                None => T::zero(),
            };
            let entry = b
                .get_mut(dof)
                .ok_or_else(|| eyre!(AssemblyError::DofOutOfBounds { dof, len }))?;
            *entry = scale * (g - x);
        }
    }
    Ok(())
}

/// Inserts `diagonal` on the diagonal entries of the owned dofs constrained by conditions on `space`.
///
/// Only meaningful when `space` is both the test and the trial space of the matrix.
pub fn insert_diagonal_into<T: Real>(
    a: &mut dyn MatrixInsert<T>,
    space: &Arc<FunctionSpace>,
    bcs: &[&DirichletBC<T>],
    diagonal: T,
) -> eyre::Result<()> {
    let value = DMatrix::from_element(1, 1, diagonal);
    for bc in bcs.iter().filter(|bc| bc.is_on(space)) {
        for (dof, _) in bc.owned_dofs_and_values() {
            a.set_values(&[dof], &[dof], value.as_view(), InsertMode::Insert)?;
        }
    }
    Ok(())
}
