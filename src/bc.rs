//! Dirichlet boundary conditions.
use crate::assembly::local::BlockBilinearForm;
use crate::error::AssemblyError;
use crate::space::FunctionSpace;
use crate::Real;
use eyre::eyre;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Prescribed values for a set of degrees of freedom of a function space.
///
/// Dofs are unrolled local indices of the space's dofmap, i.e. `dof * bs + component`. Both owned and
/// ghost dofs may be listed, but only owned dofs are ever written by [`set_bc`](crate::assembly::Assembler::set_bc).
#[derive(Debug, Clone)]
pub struct DirichletBC<T> {
    space: Arc<FunctionSpace>,
    dofs: Vec<usize>,
    values: Vec<T>,
}

impl<T: Real> DirichletBC<T> {
    pub fn new(space: Arc<FunctionSpace>, dofs: Vec<usize>, values: Vec<T>) -> eyre::Result<Self> {
        if dofs.len() != values.len() {
            return Err(eyre!(AssemblyError::BlockCountMismatch {
                what: "boundary values",
                expected: dofs.len(),
                actual: values.len(),
            }));
        }
        let len = space.dofmap().unrolled_local_len();
        if let Some(&dof) = dofs.iter().find(|&&dof| dof >= len) {
            return Err(eyre!(AssemblyError::DofOutOfBounds { dof, len }));
        }
        Ok(Self { space, dofs, values })
    }

    /// A boundary condition prescribing the same value on all given dofs.
    pub fn constant(space: Arc<FunctionSpace>, dofs: Vec<usize>, value: T) -> eyre::Result<Self> {
        let values = vec![value; dofs.len()];
        Self::new(space, dofs, values)
    }

    pub fn function_space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Whether the condition is posed on the given space.
    pub fn is_on(&self, space: &Arc<FunctionSpace>) -> bool {
        FunctionSpace::same(&self.space, space)
    }

    /// Constrained owned dofs together with their values.
    pub fn owned_dofs_and_values(&self) -> impl '_ + Iterator<Item = (usize, T)> {
        let owned_len = self.space.dofmap().unrolled_owned_len();
        self.dofs
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .filter(move |(dof, _)| *dof < owned_len)
    }
}

/// Prescribed values of all dofs constrained by the given conditions, keyed by unrolled dof.
///
/// When several conditions constrain the same dof, the last one wins.
pub(crate) fn prescribed_values<T: Real>(bcs: &[&DirichletBC<T>]) -> FxHashMap<usize, T> {
    let mut values = FxHashMap::default();
    for bc in bcs {
        values.extend(bc.dofs.iter().copied().zip(bc.values.iter().copied()));
    }
    values
}

/// Boundary conditions for each block row, selected by test space.
///
/// Entry `i` holds the conditions posed on `spaces[i]`.
pub fn bcs_rows<'a, T: Real>(
    spaces: &[Arc<FunctionSpace>],
    bcs: &[&'a DirichletBC<T>],
) -> Vec<Vec<&'a DirichletBC<T>>> {
    spaces
        .iter()
        .map(|space| bcs.iter().copied().filter(|bc| bc.is_on(space)).collect())
        .collect()
}

/// Boundary conditions for each block of a block bilinear form, selected by trial space.
///
/// Entry `[i][j]` holds the conditions posed on the trial space of block `(i, j)`, or is empty if the
/// block is absent.
pub fn bcs_cols<'a, T: Real>(
    form: &BlockBilinearForm<'_, T>,
    bcs: &[&'a DirichletBC<T>],
) -> Vec<Vec<Vec<&'a DirichletBC<T>>>> {
    let (nrows, ncols) = form.shape();
    (0..nrows)
        .map(|i| {
            (0..ncols)
                .map(|j| match form.get(i, j) {
                    Some(a_ij) => bcs
                        .iter()
                        .copied()
                        .filter(|bc| bc.is_on(a_ij.trial_space()))
                        .collect(),
                    None => Vec::new(),
                })
                .collect()
        })
        .collect()
}
