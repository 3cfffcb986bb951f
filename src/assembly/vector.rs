use crate::assembly::create::check_block_count;
use crate::assembly::global::{apply_lifting_into, assemble_scalar, assemble_vector_into, set_bc_into};
use crate::assembly::local::{BlockBilinearForm, BlockLinearForm, LinearForm, ScalarForm};
use crate::assembly::Assembler;
use crate::bc::{bcs_cols, bcs_rows, DirichletBC};
use crate::error::AssemblyError;
use crate::restriction::DofMapRestriction;
use crate::space::{DofMap, FunctionSpace};
use crate::view::{BlockSubVectors, BlockSubVectorsRead, NestSubVectors, SubVectorView};
use crate::Real;
use eyre::eyre;
use fenris_la::{IndexSetFactory, NestVector, Vector};
use log::debug;
use std::sync::Arc;

pub(crate) fn dofmaps_of(spaces: &[Arc<FunctionSpace>]) -> Vec<&Arc<DofMap>> {
    spaces.iter().map(|space| space.dofmap()).collect()
}

impl<F: IndexSetFactory> Assembler<F> {
    /// Sums the cell contributions of a scalar form.
    pub fn assemble_scalar<T: Real>(&self, form: &dyn ScalarForm<T>) -> eyre::Result<T> {
        assemble_scalar(form)
    }

    /// Assembles a linear form into a new vector.
    ///
    /// Ghost contributions are left in the ghost entries of the returned vector.
    pub fn assemble_vector_new<T: Real>(
        &self,
        form: &dyn LinearForm<T>,
        restriction: Option<&DofMapRestriction>,
    ) -> eyre::Result<Vector<T>> {
        let mut b = self.create_vector(form, restriction)?;
        self.assemble_vector_into(&mut b, form, restriction)?;
        Ok(b)
    }

    /// Adds the contributions of a linear form to an existing vector.
    ///
    /// Without a restriction the vector must be laid out like the form's test space, with a restriction
    /// like the restriction.
    pub fn assemble_vector_into<T: Real>(
        &self,
        b: &mut Vector<T>,
        form: &dyn LinearForm<T>,
        restriction: Option<&DofMapRestriction>,
    ) -> eyre::Result<()> {
        match restriction {
            None => assemble_vector_into(b.local_mut(), form),
            Some(restriction) => {
                let mut view = SubVectorView::new(b, form.test_space().dofmap(), Some(restriction), true, &self.factory)?;
                assemble_vector_into(view.content_mut(), form)
            }
        }
    }

    /// Assembles a list of linear forms into a new nest vector.
    pub fn assemble_vector_nest_new<T: Real>(
        &self,
        forms: &BlockLinearForm<T>,
        restrictions: Option<&[&DofMapRestriction]>,
    ) -> eyre::Result<NestVector<T>> {
        let mut b = self.create_vector_nest(forms, restrictions)?;
        self.assemble_vector_nest_into(&mut b, forms, restrictions)?;
        Ok(b)
    }

    /// Adds the contributions of a list of linear forms to the sub-vectors of a nest vector.
    pub fn assemble_vector_nest_into<T: Real>(
        &self,
        b: &mut NestVector<T>,
        forms: &BlockLinearForm<T>,
        restrictions: Option<&[&DofMapRestriction]>,
    ) -> eyre::Result<()> {
        check_block_count("nest vector blocks", forms.len(), Some(b.len()))?;
        let spaces = forms.function_spaces();
        let dofmaps = dofmaps_of(&spaces);
        let mut views = match restrictions {
            None => NestSubVectors::new(b.blocks_mut(), true, &self.factory),
            Some(restrictions) => {
                NestSubVectors::restricted(b.blocks_mut(), &dofmaps, restrictions, true, &self.factory)?
            }
        };
        views.try_for_each(|i, b_i| assemble_vector_into(b_i, forms.get(i)))
    }

    /// Assembles a list of linear forms into a new block vector, with lifting and boundary values applied.
    ///
    /// See [`assemble_vector_block_into`](Self::assemble_vector_block_into).
    #[allow(clippy::too_many_arguments)]
    pub fn assemble_vector_block_new<T: Real>(
        &self,
        forms: &BlockLinearForm<T>,
        a: &BlockBilinearForm<T>,
        bcs: &[&DirichletBC<T>],
        x0: Option<&Vector<T>>,
        scale: T,
        restrictions: Option<&[&DofMapRestriction]>,
        restrictions_x0: Option<&[&DofMapRestriction]>,
    ) -> eyre::Result<Vector<T>> {
        let mut b = self.create_vector_block(forms, restrictions)?;
        self.assemble_vector_block_into(&mut b, forms, a, bcs, x0, scale, restrictions, restrictions_x0)?;
        Ok(b)
    }

    /// Adds the contributions of a list of linear forms to a block vector and applies boundary conditions.
    ///
    /// For each block row `i`, the form `forms[i]` is assembled and lifted with every present block
    /// `a[i][j]` and the conditions posed on its trial space. Ghost contributions are then accumulated,
    /// and finally the values `scale * (g - x0)` are set on the owned constrained dofs of each block row.
    /// `x0` is a block vector laid out like the block columns of `a`, restricted by `restrictions_x0`.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble_vector_block_into<T: Real>(
        &self,
        b: &mut Vector<T>,
        forms: &BlockLinearForm<T>,
        a: &BlockBilinearForm<T>,
        bcs: &[&DirichletBC<T>],
        x0: Option<&Vector<T>>,
        scale: T,
        restrictions: Option<&[&DofMapRestriction]>,
        restrictions_x0: Option<&[&DofMapRestriction]>,
    ) -> eyre::Result<()> {
        let (nrows, ncols) = a.shape();
        check_block_count("linear forms", nrows, Some(forms.len()))?;
        for i in 0..nrows {
            if !FunctionSpace::same(forms.get(i).test_space(), &a.row_spaces()[i]) {
                return Err(eyre!(AssemblyError::InconsistentBlockForm { row: i, col: 0 }));
            }
        }

        if x0.is_some() {
            // Constrained rows of block i read x0 from block column i
            check_block_count("initial guess blocks", nrows, Some(ncols))?;
        }

        let row_dofmaps = dofmaps_of(a.row_spaces());
        let col_dofmaps = dofmaps_of(a.col_spaces());
        let bcs1 = bcs_cols(a, bcs);
        let x0_blocks = x0
            .map(|x0| BlockSubVectorsRead::new(x0, &col_dofmaps, restrictions_x0, true, &self.factory))
            .transpose()?;
        let x0_views = x0_blocks.as_ref().map(|x0| x0.views());

        {
            let mut b_blocks = BlockSubVectors::new(b, &row_dofmaps, restrictions, true, &self.factory)?;
            for i in 0..nrows {
                let mut b_i = b_blocks.view(i);
                assemble_vector_into(b_i.content_mut(), forms.get(i))?;
                for j in 0..ncols {
                    if let Some(a_ij) = a.get(i, j) {
                        let x0_j: Vec<&[T]> = x0_views.iter().map(|views| &*views[j]).collect();
                        apply_lifting_into(b_i.content_mut(), &[a_ij], &[bcs1[i][j].clone()], &x0_j, scale)?;
                    }
                }
            }
        }

        b.accumulate_ghosts();

        let bcs0 = bcs_rows(a.row_spaces(), bcs);
        let mut b_blocks = BlockSubVectors::new(b, &row_dofmaps, restrictions, true, &self.factory)?;
        b_blocks.try_for_each(|i, b_i| {
            let x0_i = x0_views.as_ref().map(|views| &*views[i]);
            set_bc_into(b_i, &bcs0[i], x0_i, scale)
        })?;
        debug!("Assembled block vector with {} blocks", nrows);
        Ok(())
    }
}
