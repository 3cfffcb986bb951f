//! A two-field system on a mesh of three intervals.
//!
//! The first field is P1 (four dofs), the second P0 (three dofs). The block (0, 1) is absent.
use crate::unit_tests::fixtures::{distributed_p1_dofmap, p0_space, p1_space, ConstantLoad, PatternForm};
use fenris_restrict::assembly::local::{BilinearForm, BlockBilinearForm, BlockLinearForm, LinearForm};
use fenris_restrict::assembly::Assembler;
use fenris_restrict::bc::{bcs_rows, DirichletBC};
use fenris_restrict::la::nalgebra::{DMatrix, DVector};
use fenris_restrict::la::{GhostContribution, IndexMap, Vector};
use fenris_restrict::restriction::DofMapRestriction;
use fenris_restrict::space::FunctionSpace;
use matrixcompare::assert_matrix_eq;
use proptest::prelude::*;
use std::sync::Arc;
use util::assert_approx_slice_eq;

struct System {
    v: Arc<FunctionSpace>,
    q: Arc<FunctionSpace>,
    a00: PatternForm,
    a10: PatternForm,
    a11: PatternForm,
    l0: ConstantLoad,
    l1: ConstantLoad,
}

impl System {
    fn new() -> Self {
        let v = p1_space(3);
        let q = p0_space(3);
        Self {
            a00: PatternForm::stiffness(&v),
            a10: PatternForm::constant(&q, &v, 0.5),
            a11: PatternForm::constant(&q, &q, 3.0),
            l0: ConstantLoad {
                space: v.clone(),
                value: 1.0,
            },
            l1: ConstantLoad {
                space: q.clone(),
                value: 2.0,
            },
            v,
            q,
        }
    }

    fn bilinear(&self) -> BlockBilinearForm<'_, f64> {
        let a00: &dyn BilinearForm<f64> = &self.a00;
        let a10: &dyn BilinearForm<f64> = &self.a10;
        let a11: &dyn BilinearForm<f64> = &self.a11;
        BlockBilinearForm::new(vec![vec![Some(a00), None], vec![Some(a10), Some(a11)]]).unwrap()
    }

    fn linear(&self) -> BlockLinearForm<'_, f64> {
        let l0: &dyn LinearForm<f64> = &self.l0;
        let l1: &dyn LinearForm<f64> = &self.l1;
        BlockLinearForm::new(vec![l0, l1])
    }

    fn bcs(&self, g: f64, h: f64) -> [DirichletBC<f64>; 2] {
        [
            DirichletBC::constant(self.v.clone(), vec![0], g).unwrap(),
            DirichletBC::constant(self.q.clone(), vec![2], h).unwrap(),
        ]
    }
}

#[test]
fn block_matrix_skips_absent_block_and_inserts_diagonal_on_square_blocks() {
    let system = System::new();
    let form = system.bilinear();
    let [bc_v, bc_q] = system.bcs(2.0, 4.0);
    let a = Assembler::new()
        .assemble_matrix_block_new(&form, &[&bc_v, &bc_q], 1.0, None)
        .unwrap();

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(7, 7, &[
        1.0, 0.0, 0.0, 0.0,     0.0, 0.0, 0.0,
        0.0, 2.0, -1.0, 0.0,    0.0, 0.0, 0.0,
        0.0, -1.0, 2.0, -1.0,   0.0, 0.0, 0.0,
        0.0, 0.0, -1.0, 1.0,    0.0, 0.0, 0.0,
        0.0, 0.5, 0.0, 0.0,     3.0, 0.0, 0.0,
        0.0, 0.5, 0.5, 0.0,     0.0, 3.0, 0.0,
        0.0, 0.0, 0.0, 0.0,     0.0, 0.0, 1.0,
    ]);
    assert_matrix_eq!(a.to_dense(), expected);

    // The absent block has no stored entries at all
    for i in 0..4 {
        for j in 4..7 {
            assert_eq!(a.get(i, j), None);
        }
    }
}

#[test]
fn nest_matrix_matches_block_matrix() {
    let system = System::new();
    let form = system.bilinear();
    let [bc_v, bc_q] = system.bcs(2.0, 4.0);
    let assembler = Assembler::new();
    let block = assembler
        .assemble_matrix_block_new(&form, &[&bc_v, &bc_q], 1.0, None)
        .unwrap();
    let nest = assembler
        .assemble_matrix_nest_new(&form, &[&bc_v, &bc_q], 1.0, None)
        .unwrap();

    assert_eq!(nest.shape(), (2, 2));
    assert!(nest.sub_matrix(0, 1).is_none());
    assert_matrix_eq!(nest.to_dense(), block.to_dense());
}

#[test]
fn restricted_block_and_nest_matrices() {
    let system = System::new();
    let form = system.bilinear();
    let [_, bc_q] = system.bcs(2.0, 4.0);
    let restriction_v = DofMapRestriction::new(system.v.dofmap().clone(), &[1, 2, 3]).unwrap();
    let restriction_q = DofMapRestriction::new(system.q.dofmap().clone(), &[0, 1, 2]).unwrap();
    let restrictions = [&restriction_v, &restriction_q];
    let assembler = Assembler::new();

    let block = assembler
        .assemble_matrix_block_new(&form, &[&bc_q], 1.0, Some([&restrictions[..], &restrictions[..]]))
        .unwrap();
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(6, 6, &[
        2.0, -1.0, 0.0,    0.0, 0.0, 0.0,
        -1.0, 2.0, -1.0,   0.0, 0.0, 0.0,
        0.0, -1.0, 1.0,    0.0, 0.0, 0.0,
        0.5, 0.0, 0.0,     3.0, 0.0, 0.0,
        0.5, 0.5, 0.0,     0.0, 3.0, 0.0,
        0.0, 0.0, 0.0,     0.0, 0.0, 1.0,
    ]);
    assert_matrix_eq!(block.to_dense(), expected);

    let nest = assembler
        .assemble_matrix_nest_new(&form, &[&bc_q], 1.0, Some([&restrictions[..], &restrictions[..]]))
        .unwrap();
    assert_matrix_eq!(nest.to_dense(), expected);
}

#[test]
fn block_vector_is_lifted_and_constrained() {
    let system = System::new();
    let (forms, a) = (system.linear(), system.bilinear());
    let [bc_v, bc_q] = system.bcs(2.0, 4.0);
    let bcs = [&bc_v, &bc_q];
    let assembler = Assembler::new();

    let b = assembler
        .assemble_vector_block_new(&forms, &a, &bcs, None, 1.0, None, None)
        .unwrap();
    assert_eq!(b.local(), &[2.0, 4.0, 2.0, 1.0, 1.0, 2.0, 4.0]);

    let x0 = Vector::from_local(
        IndexMap::new_serial(7),
        1,
        DVector::from_vec(vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
    )
    .unwrap();
    let b = assembler
        .assemble_vector_block_new(&forms, &a, &bcs, Some(&x0), 2.0, None, None)
        .unwrap();
    assert_eq!(b.local(), &[2.0, 4.0, 2.0, 1.0, 1.0, 2.0, 6.0]);
}

#[test]
fn nest_vector_with_lifting_matches_block_vector() {
    let system = System::new();
    let (forms, a) = (system.linear(), system.bilinear());
    let [bc_v, bc_q] = system.bcs(2.0, 4.0);
    let bcs = [&bc_v, &bc_q];
    let assembler = Assembler::new();

    let mut b = assembler.assemble_vector_nest_new(&forms, None).unwrap();
    assembler
        .apply_lifting_nest(&mut b, &a, &bcs, None, 1.0, None, None)
        .unwrap();
    assert_eq!(b.block(0).local(), &[-1.0, 4.0, 2.0, 1.0]);
    assert_eq!(b.block(1).local(), &[1.0, 2.0, -10.0]);

    b.accumulate_ghosts();
    assembler
        .set_bc_nest(&mut b, &bcs_rows(a.row_spaces(), &bcs), None, 1.0, None)
        .unwrap();

    let block = assembler
        .assemble_vector_block_new(&forms, &a, &bcs, None, 1.0, None, None)
        .unwrap();
    let concatenated = b.owned_concatenated();
    assert_approx_slice_eq!(concatenated.as_slice(), block.owned(), abstol = 1e-14);
}

#[test]
fn restricted_block_and_nest_vectors_agree() {
    let system = System::new();
    let (forms, a) = (system.linear(), system.bilinear());
    let [bc_v, bc_q] = system.bcs(2.0, 4.0);
    let bcs = [&bc_v, &bc_q];
    let restriction_v = DofMapRestriction::new(system.v.dofmap().clone(), &[0, 1, 2]).unwrap();
    let restriction_q = DofMapRestriction::new(system.q.dofmap().clone(), &[2, 1]).unwrap();
    let restrictions = [&restriction_v, &restriction_q];
    let assembler = Assembler::new();

    let block = assembler
        .assemble_vector_block_new(&forms, &a, &bcs, None, 1.0, Some(&restrictions), Some(&restrictions))
        .unwrap();
    // Block 0: [2, 4, 2], block 1 in restricted order (dof 2, dof 1): [4, 2]
    assert_eq!(block.local(), &[2.0, 4.0, 2.0, 4.0, 2.0]);

    let mut nest = assembler
        .assemble_vector_nest_new(&forms, Some(&restrictions))
        .unwrap();
    assembler
        .apply_lifting_nest(&mut nest, &a, &bcs, None, 1.0, Some(&restrictions), Some(&restrictions))
        .unwrap();
    assembler
        .set_bc_nest(&mut nest, &bcs_rows(a.row_spaces(), &bcs), None, 1.0, Some(&restrictions))
        .unwrap();
    assert_eq!(nest.owned_concatenated().as_slice(), block.owned());
}

#[test]
fn block_vector_reads_x0_through_its_own_restrictions() {
    let v = p1_space(2);
    let a00 = PatternForm::stiffness(&v);
    let load = ConstantLoad {
        space: v.clone(),
        value: 1.0,
    };
    let a = BlockBilinearForm::new(vec![vec![Some(&a00 as &dyn BilinearForm<f64>)]]).unwrap();
    let forms = BlockLinearForm::new(vec![&load as &dyn LinearForm<f64>]);
    let bc = DirichletBC::constant(v.clone(), vec![0], 2.0).unwrap();
    let restriction_b = DofMapRestriction::new(v.dofmap().clone(), &[1, 2]).unwrap();
    let restriction_x0 = DofMapRestriction::new(v.dofmap().clone(), &[0, 1]).unwrap();

    // x0 = 1 on dof 0 and 5 on dof 1
    let x0 = Vector::from_local(IndexMap::new_serial(2), 1, DVector::from_vec(vec![1.0, 5.0])).unwrap();
    let b = Assembler::new()
        .assemble_vector_block_new(
            &forms,
            &a,
            &[&bc],
            Some(&x0),
            1.0,
            Some(&[&restriction_b]),
            Some(&[&restriction_x0]),
        )
        .unwrap();
    // Load [1, 2, 1] on dofs 0, 1, 2 lifted with g - x0 = 1 on dof 0; dof 0 itself is inactive in b
    assert_eq!(b.local(), &[3.0, 1.0]);
}

#[test]
fn ghosted_restriction_stacks_blocks_process_major() {
    // This process owns dofs 0 and 1; dof 2 is a ghost owned by process 1
    let v = FunctionSpace::new(distributed_p1_dofmap(2));
    let restriction =
        DofMapRestriction::with_ghosts(v.dofmap().clone(), &[2, 1], vec![0, 1, 3], vec![1]).unwrap();
    let load = ConstantLoad {
        space: v.clone(),
        value: 1.0,
    };
    let assembler = Assembler::new();

    let b = assembler.assemble_vector_new(&load, Some(&restriction)).unwrap();
    assert_eq!(b.local(), &[2.0, 1.0]);

    let a00 = PatternForm::stiffness(&v);
    let a = BlockBilinearForm::new(vec![
        vec![Some(&a00 as &dyn BilinearForm<f64>), None],
        vec![None, Some(&a00 as &dyn BilinearForm<f64>)],
    ])
    .unwrap();
    let forms = BlockLinearForm::new(vec![&load as &dyn LinearForm<f64>, &load]);
    let restrictions = [&restriction, &restriction];
    let mut b = assembler
        .assemble_vector_block_new(&forms, &a, &[], None, 1.0, Some(&restrictions), None)
        .unwrap();
    assert_eq!(b.owned(), &[2.0, 2.0]);

    // Process 1 owns globals 2..4 of block 0 and 4..6 of block 1
    let contributions = b.take_ghost_contributions();
    assert_eq!(
        contributions,
        vec![
            GhostContribution {
                owner: 1,
                global: 2,
                value: 1.0
            },
            GhostContribution {
                owner: 1,
                global: 4,
                value: 1.0
            }
        ]
    );
}

proptest! {
    #[test]
    fn constrained_entries_hold_prescribed_values_after_block_assembly(
        g in -10.0..10.0f64,
        h in -10.0..10.0f64,
        scale in 0.1..5.0f64
    ) {
        let system = System::new();
        let (forms, a) = (system.linear(), system.bilinear());
        let [bc_v, bc_q] = system.bcs(g, h);
        let b = Assembler::new()
            .assemble_vector_block_new(&forms, &a, &[&bc_v, &bc_q], None, scale, None, None)
            .unwrap();
        prop_assert_eq!(b.local()[0], scale * g);
        prop_assert_eq!(b.local()[6], scale * h);
    }
}
