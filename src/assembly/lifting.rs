use crate::assembly::create::check_block_count;
use crate::assembly::global::{apply_lifting_into, set_bc_into};
use crate::assembly::local::{BilinearForm, BlockBilinearForm};
use crate::assembly::vector::dofmaps_of;
use crate::assembly::Assembler;
use crate::bc::{bcs_cols, DirichletBC};
use crate::error::AssemblyError;
use crate::restriction::DofMapRestriction;
use crate::space::{same_dofmap, DofMap};
use crate::view::{NestSubVectorRead, NestSubVectors, NestSubVectorsRead, SubVectorReadView, SubVectorView};
use crate::Real;
use eyre::eyre;
use fenris_la::{IndexSetFactory, NestVector, Vector};
use std::sync::Arc;

fn check_restriction(dofmap: &Arc<DofMap>, restriction: Option<&DofMapRestriction>, block: usize) -> eyre::Result<()> {
    match restriction {
        Some(restriction) if !same_dofmap(dofmap, restriction.dofmap()) => {
            Err(eyre!(AssemblyError::RestrictionDofMapMismatch { block }))
        }
        _ => Ok(()),
    }
}

impl<F: IndexSetFactory> Assembler<F> {
    /// Ghosted read views of a list of vectors laid out like the given dofmaps (or their restrictions).
    fn read_views<'a, T: Real>(
        &'a self,
        vectors: Vec<&'a Vector<T>>,
        dofmaps: &[&'a Arc<DofMap>],
        restrictions: Option<&[&'a DofMapRestriction]>,
    ) -> eyre::Result<Vec<NestSubVectorRead<'a, T>>> {
        check_block_count("initial guesses", dofmaps.len(), Some(vectors.len()))?;
        let views = match restrictions {
            None => NestSubVectorsRead::new(vectors, true, &self.factory),
            Some(restrictions) => NestSubVectorsRead::restricted(vectors, dofmaps, restrictions, true, &self.factory)?,
        };
        views.views()
    }

    /// Modifies `b` to account for the prescribed values of the trial functions of the forms `a`.
    ///
    /// Computes `b <- b - scale * sum_j A_j (g_j - x0_j)`, where `bcs[j]` holds the conditions lifted
    /// through `a[j]`. The forms must share the test space `b` is laid out like, possibly restricted
    /// by `restriction`. Each `x0[j]` is laid out like the trial space of `a[j]`, possibly restricted
    /// by `restrictions_x0[j]`.
    ///
    /// Contributions to ghost entries are left in `b`; accumulating them is up to the caller.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_lifting<T: Real>(
        &self,
        b: &mut Vector<T>,
        a: &[&dyn BilinearForm<T>],
        bcs: &[Vec<&DirichletBC<T>>],
        x0: Option<&[&Vector<T>]>,
        scale: T,
        restriction: Option<&DofMapRestriction>,
        restrictions_x0: Option<&[&DofMapRestriction]>,
    ) -> eyre::Result<()> {
        check_block_count("lifting boundary conditions", a.len(), Some(bcs.len()))?;
        for (j, a_j) in a.iter().enumerate() {
            check_restriction(a_j.test_space().dofmap(), restriction, j)?;
        }

        let trial_dofmaps: Vec<_> = a.iter().map(|a_j| a_j.trial_space().dofmap()).collect();
        let x0_views = x0
            .map(|x0| self.read_views(x0.to_vec(), &trial_dofmaps, restrictions_x0))
            .transpose()?
            .unwrap_or_default();
        let x0_arrays: Vec<&[T]> = x0_views.iter().map(|view| &**view).collect();

        match (restriction, a.first()) {
            (None, _) | (_, None) => apply_lifting_into(b.local_mut(), a, bcs, &x0_arrays, scale),
            (Some(restriction), Some(a_0)) => {
                let dofmap = a_0.test_space().dofmap();
                let mut view = SubVectorView::new(b, dofmap, Some(restriction), true, &self.factory)?;
                apply_lifting_into(view.content_mut(), a, bcs, &x0_arrays, scale)
            }
        }
    }

    /// Applies lifting to each sub-vector of a nest vector.
    ///
    /// Block row `i` of `b` is lifted with every present block `a[i][j]` and the conditions posed on its
    /// trial space. `x0` has one sub-vector per block column. Ghost contributions are left to the caller.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_lifting_nest<T: Real>(
        &self,
        b: &mut NestVector<T>,
        a: &BlockBilinearForm<T>,
        bcs: &[&DirichletBC<T>],
        x0: Option<&NestVector<T>>,
        scale: T,
        restrictions: Option<&[&DofMapRestriction]>,
        restrictions_x0: Option<&[&DofMapRestriction]>,
    ) -> eyre::Result<()> {
        let (nrows, ncols) = a.shape();
        check_block_count("nest vector blocks", nrows, Some(b.len()))?;

        let row_dofmaps = dofmaps_of(a.row_spaces());
        let col_dofmaps = dofmaps_of(a.col_spaces());
        let bcs1 = bcs_cols(a, bcs);
        let x0_views = x0
            .map(|x0| self.read_views(x0.blocks().iter().collect(), &col_dofmaps, restrictions_x0))
            .transpose()?;

        let mut views = match restrictions {
            None => NestSubVectors::new(b.blocks_mut(), true, &self.factory),
            Some(restrictions) => {
                NestSubVectors::restricted(b.blocks_mut(), &row_dofmaps, restrictions, true, &self.factory)?
            }
        };
        views.try_for_each(|i, b_i| {
            for j in 0..ncols {
                if let Some(a_ij) = a.get(i, j) {
                    let x0_j: Vec<&[T]> = x0_views.iter().map(|views| &*views[j]).collect();
                    apply_lifting_into(b_i, &[a_ij], &[bcs1[i][j].clone()], &x0_j, scale)?;
                }
            }
            Ok(())
        })
    }

    /// Sets `b[dof] = scale * (g - x0[dof])` on every owned dof constrained by `bcs`.
    ///
    /// `b` and `x0` are laid out like the space the conditions are posed on, possibly restricted by
    /// `restriction`. Ghost entries are never touched.
    pub fn set_bc<T: Real>(
        &self,
        b: &mut Vector<T>,
        bcs: &[&DirichletBC<T>],
        x0: Option<&Vector<T>>,
        scale: T,
        restriction: Option<&DofMapRestriction>,
    ) -> eyre::Result<()> {
        match restriction {
            None => {
                let x0 = x0.map(|x0| x0.owned());
                set_bc_into(b.owned_mut(), bcs, x0, scale)
            }
            Some(restriction) => {
                let dofmap = restriction.dofmap();
                for bc in bcs {
                    check_restriction(bc.function_space().dofmap(), Some(restriction), 0)?;
                }
                let x0 = x0
                    .map(|x0| SubVectorReadView::new(x0, dofmap, Some(restriction), false, &self.factory))
                    .transpose()?;
                let mut view = SubVectorView::new(b, dofmap, Some(restriction), false, &self.factory)?;
                set_bc_into(view.content_mut(), bcs, x0.as_ref().map(|x0| x0.content()), scale)
            }
        }
    }

    /// Applies [`set_bc`](Self::set_bc) to each sub-vector of a nest vector.
    ///
    /// `bcs[i]` holds the conditions for sub-vector `i`. Without restrictions the sub-vectors are laid
    /// out like the spaces of the conditions; with restrictions, like `restrictions[i]`.
    pub fn set_bc_nest<T: Real>(
        &self,
        b: &mut NestVector<T>,
        bcs: &[Vec<&DirichletBC<T>>],
        x0: Option<&NestVector<T>>,
        scale: T,
        restrictions: Option<&[&DofMapRestriction]>,
    ) -> eyre::Result<()> {
        check_block_count("boundary condition lists", b.len(), Some(bcs.len()))?;
        if let Some(x0) = x0 {
            check_block_count("initial guesses", b.len(), Some(x0.len()))?;
        }

        match restrictions {
            None => {
                for (i, b_i) in b.blocks_mut().iter_mut().enumerate() {
                    let x0_i = x0.map(|x0| x0.block(i).owned());
                    set_bc_into(b_i.owned_mut(), &bcs[i], x0_i, scale)?;
                }
                Ok(())
            }
            Some(restrictions) => {
                check_block_count("restrictions", b.len(), Some(restrictions.len()))?;
                for (i, (bcs_i, &restriction)) in bcs.iter().zip(restrictions).enumerate() {
                    for bc in bcs_i {
                        check_restriction(bc.function_space().dofmap(), Some(restriction), i)?;
                    }
                }
                let dofmaps: Vec<_> = restrictions.iter().map(|r| r.dofmap()).collect();
                let x0_views = x0
                    .map(|x0| {
                        NestSubVectorsRead::restricted(
                            x0.blocks().iter().collect(),
                            &dofmaps,
                            restrictions,
                            false,
                            &self.factory,
                        )?
                        .views()
                    })
                    .transpose()?;
                let mut views =
                    NestSubVectors::restricted(b.blocks_mut(), &dofmaps, restrictions, false, &self.factory)?;
                views.try_for_each(|i, b_i| {
                    let x0_i = x0_views.as_ref().map(|views| &*views[i]);
                    set_bc_into(b_i, &bcs[i], x0_i, scale)
                })
            }
        }
    }
}
