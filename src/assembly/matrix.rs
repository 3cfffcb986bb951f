use crate::assembly::global::{assemble_matrix_into, assemble_matrix_unrolled_into, insert_diagonal_into};
use crate::assembly::local::{BilinearForm, BlockBilinearForm};
use crate::assembly::vector::dofmaps_of;
use crate::assembly::Assembler;
use crate::bc::DirichletBC;
use crate::restriction::DofMapRestriction;
use crate::space::{DofMap, FunctionSpace};
use crate::view::{BlockSubMatrices, NestSubMatrices, SubMatrixView};
use crate::Real;
use fenris_la::{IndexSetFactory, Matrix, NestMatrix};
use log::debug;
use std::sync::Arc;

impl<F: IndexSetFactory> Assembler<F> {
    fn nest_views<'a, T: Real>(
        &'a self,
        a: &'a mut NestMatrix<T>,
        dofmaps: [&[&'a Arc<DofMap>]; 2],
        restrictions: Option<[&[&'a DofMapRestriction]; 2]>,
    ) -> eyre::Result<NestSubMatrices<'a, T>> {
        match restrictions {
            None => Ok(NestSubMatrices::new(a, &self.factory)),
            Some(restrictions) => NestSubMatrices::restricted(a, dofmaps, restrictions, &self.factory),
        }
    }

    /// Assembles a bilinear form into a new matrix.
    ///
    /// See [`assemble_matrix_into`](Self::assemble_matrix_into).
    pub fn assemble_matrix_new<T: Real>(
        &self,
        form: &dyn BilinearForm<T>,
        bcs: &[&DirichletBC<T>],
        diagonal: T,
        restriction: Option<[&DofMapRestriction; 2]>,
    ) -> eyre::Result<Matrix<T>> {
        let mut a = self.create_matrix(form, restriction)?;
        self.assemble_matrix_into(&mut a, form, bcs, diagonal, restriction)?;
        Ok(a)
    }

    /// Adds the contributions of a bilinear form to a matrix.
    ///
    /// Rows and columns of constrained dofs are left out of the element contributions. If the test and the
    /// trial space are the same space, `diagonal` is then inserted on the diagonal entry of every owned
    /// constrained dof. The matrix is flushed before the diagonal is inserted.
    pub fn assemble_matrix_into<T: Real>(
        &self,
        a: &mut Matrix<T>,
        form: &dyn BilinearForm<T>,
        bcs: &[&DirichletBC<T>],
        diagonal: T,
        restriction: Option<[&DofMapRestriction; 2]>,
    ) -> eyre::Result<()> {
        let dofmaps = [form.test_space().dofmap(), form.trial_space().dofmap()];
        let same_space = FunctionSpace::same(form.test_space(), form.trial_space());
        match restriction {
            None => {
                assemble_matrix_into(a, form, bcs)?;
                if same_space {
                    a.flush();
                    insert_diagonal_into(a, form.test_space(), bcs, diagonal)?;
                }
            }
            Some(restriction) => {
                {
                    let mut view = SubMatrixView::new(a, dofmaps, Some(restriction), &self.factory)?;
                    assemble_matrix_into(&mut view, form, bcs)?;
                }
                if same_space {
                    a.flush();
                    let mut view = SubMatrixView::new(a, dofmaps, Some(restriction), &self.factory)?;
                    insert_diagonal_into(&mut view, form.test_space(), bcs, diagonal)?;
                }
            }
        }
        Ok(())
    }

    /// Assembles a block bilinear form into a new block matrix.
    pub fn assemble_matrix_block_new<T: Real>(
        &self,
        form: &BlockBilinearForm<T>,
        bcs: &[&DirichletBC<T>],
        diagonal: T,
        restrictions: Option<[&[&DofMapRestriction]; 2]>,
    ) -> eyre::Result<Matrix<T>> {
        let mut a = self.create_matrix_block(form, restrictions)?;
        self.assemble_matrix_block_into(&mut a, form, bcs, diagonal, restrictions)?;
        Ok(a)
    }

    /// Adds the contributions of a block bilinear form to a block matrix.
    ///
    /// Absent blocks contribute nothing. Diagonal entries for constrained dofs are inserted into the
    /// present blocks whose row and column space are the same space, after all blocks have been
    /// assembled and the matrix has been flushed.
    pub fn assemble_matrix_block_into<T: Real>(
        &self,
        a: &mut Matrix<T>,
        form: &BlockBilinearForm<T>,
        bcs: &[&DirichletBC<T>],
        diagonal: T,
        restrictions: Option<[&[&DofMapRestriction]; 2]>,
    ) -> eyre::Result<()> {
        let dofmaps = [dofmaps_of(form.row_spaces()), dofmaps_of(form.col_spaces())];
        let dofmaps = [&dofmaps[0][..], &dofmaps[1][..]];
        {
            let mut blocks = BlockSubMatrices::new(a, dofmaps, restrictions, &self.factory)?;
            blocks.try_for_each(|i, j, a_ij| match form.get(i, j) {
                Some(form_ij) => assemble_matrix_unrolled_into(a_ij, form_ij, bcs),
                None => Ok(()),
            })?;
        }

        a.flush();

        let mut blocks = BlockSubMatrices::new(a, dofmaps, restrictions, &self.factory)?;
        blocks.try_for_each(|i, j, a_ij| {
            let row_space = &form.row_spaces()[i];
            if form.get(i, j).is_some() && FunctionSpace::same(row_space, &form.col_spaces()[j]) {
                insert_diagonal_into(a_ij, row_space, bcs, diagonal)?;
            }
            Ok(())
        })?;
        debug!("Assembled {:?} block matrix", form.shape());
        Ok(())
    }

    /// Assembles a block bilinear form into a new nest matrix.
    pub fn assemble_matrix_nest_new<T: Real>(
        &self,
        form: &BlockBilinearForm<T>,
        bcs: &[&DirichletBC<T>],
        diagonal: T,
        restrictions: Option<[&[&DofMapRestriction]; 2]>,
    ) -> eyre::Result<NestMatrix<T>> {
        let mut a = self.create_matrix_nest(form, restrictions)?;
        self.assemble_matrix_nest_into(&mut a, form, bcs, diagonal, restrictions)?;
        Ok(a)
    }

    /// Adds the contributions of a block bilinear form to the sub-matrices of a nest matrix.
    ///
    /// Same semantics as [`assemble_matrix_block_into`](Self::assemble_matrix_block_into). Cells without
    /// a sub-matrix are skipped.
    pub fn assemble_matrix_nest_into<T: Real>(
        &self,
        a: &mut NestMatrix<T>,
        form: &BlockBilinearForm<T>,
        bcs: &[&DirichletBC<T>],
        diagonal: T,
        restrictions: Option<[&[&DofMapRestriction]; 2]>,
    ) -> eyre::Result<()> {
        let dofmaps = [dofmaps_of(form.row_spaces()), dofmaps_of(form.col_spaces())];
        let dofmaps = [&dofmaps[0][..], &dofmaps[1][..]];
        self.nest_views(a, dofmaps, restrictions)?.try_for_each(|i, j, a_ij| match (a_ij, form.get(i, j)) {
            (Some(a_ij), Some(form_ij)) => assemble_matrix_into(a_ij, form_ij, bcs),
            _ => Ok(()),
        })?;

        a.flush();

        self.nest_views(a, dofmaps, restrictions)?.try_for_each(|i, j, a_ij| {
            let row_space = &form.row_spaces()[i];
            if let (Some(a_ij), Some(_)) = (a_ij, form.get(i, j)) {
                if FunctionSpace::same(row_space, &form.col_spaces()[j]) {
                    insert_diagonal_into(a_ij, row_space, bcs, diagonal)?;
                }
            }
            Ok(())
        })?;
        debug!("Assembled {:?} nest matrix", form.shape());
        Ok(())
    }
}
