use fenris_la::nalgebra::{DMatrix, DVector};
use fenris_la::{IndexMap, InsertMode, LaError, Matrix, MatrixInsert, SparsityPatternBuilder};
use matrixcompare::assert_matrix_eq;

fn tridiagonal(n: usize, bs: usize) -> Matrix<f64> {
    let mut builder = SparsityPatternBuilder::new(n * bs, n * bs);
    for i in 0..n {
        let blocks: Vec<usize> = (i.saturating_sub(1)..(i + 2).min(n)).collect();
        let rows = fenris_la::unroll(&[i], bs);
        let cols = fenris_la::unroll(&blocks, bs);
        builder.insert_block(&rows, &cols);
    }
    let map = IndexMap::new_serial(n);
    Matrix::from_pattern(map.clone(), map, [bs, bs], builder.build()).unwrap()
}

#[test]
fn pattern_builder_handles_empty_rows() {
    let mut builder = SparsityPatternBuilder::new(4, 3);
    builder.insert_block(&[1], &[2, 0]);
    builder.insert_block(&[1], &[0]);
    let pattern = builder.build();
    assert_eq!(pattern.major_offsets(), &[0, 0, 2, 2, 2]);
    assert_eq!(pattern.minor_indices(), &[0, 2]);
}

#[test]
fn add_and_insert_values() {
    let mut a = tridiagonal(3, 1);
    let values = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]);
    a.set_values(&[0, 1], &[0, 1], values.as_view(), InsertMode::Add).unwrap();
    a.set_values(&[1, 2], &[1, 2], values.as_view(), InsertMode::Add).unwrap();
    assert_eq!(a.insert_mode(), Some(InsertMode::Add));

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        1.0, -1.0, 0.0,
        -1.0, 2.0, -1.0,
        0.0, -1.0, 1.0,
    ]);
    assert_matrix_eq!(a.to_dense(), expected);

    a.flush();
    a.set_values(&[1], &[1], DMatrix::from_element(1, 1, 5.0).as_view(), InsertMode::Insert)
        .unwrap();
    assert_eq!(a.get(1, 1), Some(5.0));
    assert_eq!(a.get(0, 2), None);
}

#[test]
fn mixing_insert_modes_without_flush_fails() {
    let mut a = tridiagonal(2, 1);
    let one = DMatrix::from_element(1, 1, 1.0);
    a.set_values(&[0], &[0], one.as_view(), InsertMode::Add).unwrap();
    let result = a.set_values(&[0], &[0], one.as_view(), InsertMode::Insert);
    assert_eq!(
        result,
        Err(LaError::MixedInsertModes {
            current: InsertMode::Add,
            requested: InsertMode::Insert
        })
    );
    a.flush();
    assert!(a.set_values(&[0], &[0], one.as_view(), InsertMode::Insert).is_ok());
}

#[test]
fn writing_outside_pattern_fails() {
    let mut a = tridiagonal(3, 1);
    let one = DMatrix::from_element(1, 1, 1.0);
    assert_eq!(
        a.set_values(&[0], &[2], one.as_view(), InsertMode::Add),
        Err(LaError::EntryNotInPattern { row: 0, col: 2 })
    );
    assert_eq!(
        a.set_values(&[3], &[0], one.as_view(), InsertMode::Add),
        Err(LaError::IndexOutOfBounds { index: 3, len: 3 })
    );
}

#[test]
fn value_dimensions_must_match_indices() {
    let mut a = tridiagonal(3, 1);
    let values = DMatrix::zeros(2, 3);
    assert!(matches!(
        a.set_values(&[0, 1], &[0, 1], values.as_view(), InsertMode::Add),
        Err(LaError::DimensionMismatch { .. })
    ));
}

#[test]
fn blocked_insertion_expands_indices() {
    let mut a = tridiagonal(2, 2);
    let values = DMatrix::from_fn(2, 4, |i, j| (10 * i + j) as f64);
    a.set_values_blocked(&[1], &[0, 1], values.as_view(), InsertMode::Add)
        .unwrap();
    let dense = a.to_dense();
    assert_matrix_eq!(dense.rows(2, 2), values);
    assert_matrix_eq!(dense.rows(0, 2), DMatrix::<f64>::zeros(2, 4));
}

#[test]
fn zero_entries_keeps_pattern() {
    let mut a = tridiagonal(3, 1);
    let values = DMatrix::from_element(3, 1, 2.0);
    a.set_values(&[0, 1, 2], &[1], values.as_view(), InsertMode::Insert)
        .unwrap();
    let nnz = a.nnz();
    a.zero_entries();
    assert_eq!(a.nnz(), nnz);
    assert_eq!(a.insert_mode(), None);
    assert_matrix_eq!(a.to_dense() * DVector::from_element(3, 1.0), DVector::<f64>::zeros(3));
}

#[test]
fn pattern_dimensions_must_match_index_maps() {
    let builder = SparsityPatternBuilder::new(3, 3);
    let map = IndexMap::new_serial(3);
    assert!(Matrix::<f64>::from_pattern(map.clone(), map, [2, 1], builder.build()).is_err());
}
