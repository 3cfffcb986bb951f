use crate::unit_tests::fixtures::{p0_space, p1_dofmap, p1_space, PatternForm};
use fenris_restrict::assembly::local::{BilinearForm, IntegralType};
use fenris_restrict::assembly::Assembler;
use fenris_restrict::bc::DirichletBC;
use fenris_restrict::la::nalgebra::{DMatrix, DMatrixViewMut};
use fenris_restrict::la::{InsertMode, Matrix, MatrixInsert};
use fenris_restrict::restriction::DofMapRestriction;
use fenris_restrict::space::FunctionSpace;
use matrixcompare::assert_matrix_eq;
use std::sync::Arc;

#[test]
fn assemble_matrix_without_conditions() {
    let space = p1_space(3);
    let form = PatternForm::stiffness(&space);
    let a = Assembler::new()
        .assemble_matrix_new(&form, &[], 1.0, None)
        .unwrap();

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(4, 4, &[
        1.0, -1.0, 0.0, 0.0,
        -1.0, 2.0, -1.0, 0.0,
        0.0, -1.0, 2.0, -1.0,
        0.0, 0.0, -1.0, 1.0,
    ]);
    assert_matrix_eq!(a.to_dense(), expected);
    assert_eq!(a.nnz(), 10);
}

#[test]
fn assemble_matrix_inserts_diagonal_for_constrained_dofs() {
    let space = p1_space(3);
    let form = PatternForm::stiffness(&space);
    let bc = DirichletBC::constant(space.clone(), vec![3], 5.0).unwrap();
    let a = Assembler::new()
        .assemble_matrix_new(&form, &[&bc], 1.0, None)
        .unwrap();

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(4, 4, &[
        1.0, -1.0, 0.0, 0.0,
        -1.0, 2.0, -1.0, 0.0,
        0.0, -1.0, 2.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ]);
    assert_matrix_eq!(a.to_dense(), expected);
    assert_eq!(a.insert_mode(), Some(InsertMode::Insert));
}

#[test]
fn rectangular_matrix_gets_no_diagonal() {
    let v = p1_space(2);
    let q = p0_space(2);
    let form = PatternForm::constant(&q, &v, 0.5);
    let bc = DirichletBC::constant(v.clone(), vec![0], 1.0).unwrap();
    let a = Assembler::new()
        .assemble_matrix_new(&form, &[&bc], 7.0, None)
        .unwrap();

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 3, &[
        0.0, 0.5, 0.0,
        0.0, 0.5, 0.5,
    ]);
    assert_matrix_eq!(a.to_dense(), expected);
}

#[test]
fn different_spaces_with_equal_dofmaps_get_no_diagonal() {
    let dofmap = p1_dofmap(2, 1);
    let test = FunctionSpace::new(dofmap.clone());
    let trial = FunctionSpace::new(dofmap);
    let form = PatternForm::constant(&test, &trial, 1.0);
    let bc = DirichletBC::constant(test.clone(), vec![0], 1.0).unwrap();
    let a = Assembler::new()
        .assemble_matrix_new(&form, &[&bc], 9.0, None)
        .unwrap();

    // Row 0 is zeroed because the condition is posed on the test space, but no diagonal is inserted
    assert_eq!(a.get(0, 0), Some(0.0));
    assert_eq!(a.get(1, 1), Some(2.0));
}

#[test]
fn restricted_matrix_assembly() {
    let space = p1_space(3);
    let form = PatternForm::stiffness(&space);
    let restriction = DofMapRestriction::new(space.dofmap().clone(), &[1, 2, 3]).unwrap();
    let bc_inactive = DirichletBC::constant(space.clone(), vec![0], 1.0).unwrap();
    let bc_active = DirichletBC::constant(space.clone(), vec![3], 1.0).unwrap();
    let assembler = Assembler::new();

    let a = assembler
        .assemble_matrix_new(&form, &[], 1.0, Some([&restriction, &restriction]))
        .unwrap();
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        2.0, -1.0, 0.0,
        -1.0, 2.0, -1.0,
        0.0, -1.0, 1.0,
    ]);
    assert_matrix_eq!(a.to_dense(), expected);
    assert_eq!(a.nnz(), 7);

    let a = assembler
        .assemble_matrix_new(&form, &[&bc_inactive, &bc_active], 1.0, Some([&restriction, &restriction]))
        .unwrap();
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        2.0, -1.0, 0.0,
        -1.0, 2.0, 0.0,
        0.0, 0.0, 1.0,
    ]);
    assert_matrix_eq!(a.to_dense(), expected);
}

#[test]
fn matrix_with_block_size_uses_blocked_insertion() {
    let space = FunctionSpace::new(p1_dofmap(1, 2));
    let form = PatternForm::constant(&space, &space, 1.0);
    let a = Assembler::new()
        .assemble_matrix_new(&form, &[], 1.0, None)
        .unwrap();
    assert_eq!(a.block_sizes(), [2, 2]);
    assert_matrix_eq!(a.to_dense(), DMatrix::repeat(4, 4, 1.0));
}

/// A form without integrals.
struct NoIntegrals {
    space: Arc<FunctionSpace>,
}

impl BilinearForm<f64> for NoIntegrals {
    fn test_space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    fn trial_space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    fn integral_types(&self) -> Vec<IntegralType> {
        Vec::new()
    }

    fn assemble_cell_matrix_into(&self, _cell: usize, _output: DMatrixViewMut<f64>) -> eyre::Result<()> {
        Ok(())
    }
}

#[test]
fn form_without_integrals_has_empty_pattern() {
    let form = NoIntegrals { space: p1_space(2) };
    let a: Matrix<f64> = Assembler::new().create_matrix(&form, None).unwrap();
    assert_eq!((a.nrows(), a.ncols()), (3, 3));
    assert_eq!(a.nnz(), 0);
}
