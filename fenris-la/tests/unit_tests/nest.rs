use fenris_la::nalgebra::DMatrix;
use fenris_la::{IndexMap, InsertMode, Matrix, MatrixInsert, NestMatrix, SparsityPatternBuilder};
use matrixcompare::assert_matrix_eq;

fn dense_pattern_matrix(nrows: usize, ncols: usize, value: f64) -> Matrix<f64> {
    let mut builder = SparsityPatternBuilder::new(nrows, ncols);
    let rows: Vec<_> = (0..nrows).collect();
    let cols: Vec<_> = (0..ncols).collect();
    builder.insert_block(&rows, &cols);
    let mut matrix = Matrix::from_pattern(
        IndexMap::new_serial(nrows),
        IndexMap::new_serial(ncols),
        [1, 1],
        builder.build(),
    )
    .unwrap();
    let values = DMatrix::from_element(nrows, ncols, value);
    matrix
        .set_values(&rows, &cols, values.as_view(), InsertMode::Add)
        .unwrap();
    matrix
}

#[test]
fn nest_matrix_with_absent_cells_to_dense() {
    let nest = NestMatrix::new(vec![
        vec![Some(dense_pattern_matrix(2, 2, 1.0)), None],
        vec![Some(dense_pattern_matrix(1, 2, 2.0)), Some(dense_pattern_matrix(1, 1, 3.0))],
    ])
    .unwrap();
    assert_eq!(nest.shape(), (2, 2));
    assert!(nest.sub_matrix(0, 1).is_none());

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        1.0, 1.0, 0.0,
        1.0, 1.0, 0.0,
        2.0, 2.0, 3.0,
    ]);
    assert_matrix_eq!(nest.to_dense(), expected);
}

#[test]
#[should_panic]
fn nest_sub_matrix_outside_shape_panics() {
    let nest = NestMatrix::new(vec![vec![Some(dense_pattern_matrix(2, 2, 1.0))]]).unwrap();
    nest.sub_matrix(0, 1);
}

#[test]
fn nest_matrix_rejects_inconsistent_block_sizes() {
    let result = NestMatrix::new(vec![vec![
        Some(dense_pattern_matrix(2, 2, 1.0)),
        Some(dense_pattern_matrix(3, 1, 1.0)),
    ]]);
    assert!(result.is_err());

    let ragged = NestMatrix::<f64>::new(vec![vec![None, None], vec![None]]);
    assert!(ragged.is_err());
}

#[test]
fn nest_flush_resets_all_insert_modes() {
    let mut nest = NestMatrix::new(vec![vec![
        Some(dense_pattern_matrix(1, 1, 1.0)),
        Some(dense_pattern_matrix(1, 1, 1.0)),
    ]])
    .unwrap();
    assert_eq!(nest.sub_matrix(0, 1).unwrap().insert_mode(), Some(InsertMode::Add));
    nest.flush();
    assert_eq!(nest.sub_matrix(0, 0).unwrap().insert_mode(), None);
    assert_eq!(nest.sub_matrix(0, 1).unwrap().insert_mode(), None);
}
