use crate::{IndexMap, LaError, Real};
use nalgebra::{DMatrix, DMatrixView, Scalar};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

/// How values written to a matrix are combined with existing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsertMode {
    Add,
    Insert,
}

/// Insertion of dense blocks of values into a matrix-like object.
///
/// Indices are *local* indices of the object. The blocked variant takes block indices that are
/// expanded with [`block_sizes`](Self::block_sizes) before insertion.
pub trait MatrixInsert<T: Scalar> {
    /// Block sizes of the rows and the columns.
    fn block_sizes(&self) -> [usize; 2];

    fn set_values(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        values: DMatrixView<T>,
        mode: InsertMode,
    ) -> Result<(), LaError>;

    fn set_values_blocked(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        values: DMatrixView<T>,
        mode: InsertMode,
    ) -> Result<(), LaError> {
        let [bs0, bs1] = self.block_sizes();
        let rows = unroll(rows, bs0);
        let cols = unroll(cols, bs1);
        self.set_values(&rows, &cols, values, mode)
    }
}

/// Expands block indices into scalar indices.
pub fn unroll(block_indices: &[usize], block_size: usize) -> Vec<usize> {
    block_indices
        .iter()
        .flat_map(|&i| (0..block_size).map(move |c| i * block_size + c))
        .collect()
}

/// A sparse matrix distributed by rows.
///
/// The matrix stores the locally owned and ghost rows in local numbering. Column indices are local
/// indices of the column index map.
///
/// Values are written either with [`InsertMode::Add`] or [`InsertMode::Insert`]. Switching between the
/// two requires a [`flush`](Self::flush) in between.
#[derive(Debug, Clone)]
pub struct Matrix<T: Real> {
    row_map: IndexMap,
    col_map: IndexMap,
    block_sizes: [usize; 2],
    csr: CsrMatrix<T>,
    mode: Option<InsertMode>,
}

impl<T: Real> Matrix<T> {
    /// A zero matrix with the given pattern.
    ///
    /// The pattern is over unrolled local indices and must have dimensions matching the index maps
    /// and block sizes.
    pub fn from_pattern(
        row_map: IndexMap,
        col_map: IndexMap,
        block_sizes: [usize; 2],
        pattern: SparsityPattern,
    ) -> Result<Self, LaError> {
        let expected = (
            row_map.size_with_ghosts() * block_sizes[0],
            col_map.size_with_ghosts() * block_sizes[1],
        );
        let actual = (pattern.major_dim(), pattern.minor_dim());
        if expected != actual {
            return Err(LaError::DimensionMismatch { expected, actual });
        }
        let values = vec![T::zero(); pattern.nnz()];
        let csr = CsrMatrix::try_from_pattern_and_values(pattern, values)
            .expect("Internal error: number of values matches pattern");
        Ok(Self {
            row_map,
            col_map,
            block_sizes,
            csr,
            mode: None,
        })
    }

    pub fn row_map(&self) -> &IndexMap {
        &self.row_map
    }

    pub fn col_map(&self) -> &IndexMap {
        &self.col_map
    }

    pub fn nrows(&self) -> usize {
        self.csr.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.csr.ncols()
    }

    pub fn nnz(&self) -> usize {
        self.csr.nnz()
    }

    pub fn csr(&self) -> &CsrMatrix<T> {
        &self.csr
    }

    pub fn pattern(&self) -> &SparsityPattern {
        self.csr.pattern()
    }

    /// The insert mode used since the last flush, if any values were written.
    pub fn insert_mode(&self) -> Option<InsertMode> {
        self.mode
    }

    /// Completes pending insertions, allowing the insert mode to change.
    pub fn flush(&mut self) {
        self.mode = None;
    }

    /// Sets all stored values to zero, keeping the pattern.
    pub fn zero_entries(&mut self) {
        self.csr.values_mut().fill(T::zero());
        self.mode = None;
    }

    /// Returns the value at the given local position, or `None` if the position is outside the pattern.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.nrows() || col >= self.ncols() {
            return None;
        }
        let row = self.csr.row(row);
        let cols = row.col_indices();
        cols.binary_search(&col)
            .ok()
            .map(|idx| row.values()[idx])
    }

    pub fn to_dense(&self) -> DMatrix<T> {
        let mut dense = DMatrix::zeros(self.nrows(), self.ncols());
        for (i, j, v) in self.csr.triplet_iter() {
            dense[(i, j)] = *v;
        }
        dense
    }

    fn check_mode(&mut self, mode: InsertMode) -> Result<(), LaError> {
        match self.mode {
            Some(current) if current != mode => Err(LaError::MixedInsertModes {
                current,
                requested: mode,
            }),
            _ => {
                self.mode = Some(mode);
                Ok(())
            }
        }
    }
}

impl<T: Real> MatrixInsert<T> for Matrix<T> {
    fn block_sizes(&self) -> [usize; 2] {
        self.block_sizes
    }

    fn set_values(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        values: DMatrixView<T>,
        mode: InsertMode,
    ) -> Result<(), LaError> {
        if values.shape() != (rows.len(), cols.len()) {
            return Err(LaError::DimensionMismatch {
                expected: (rows.len(), cols.len()),
                actual: values.shape(),
            });
        }
        self.check_mode(mode)?;

        let (nrows, ncols) = (self.nrows(), self.ncols());
        for (a, &i) in rows.iter().enumerate() {
            if i >= nrows {
                return Err(LaError::IndexOutOfBounds { index: i, len: nrows });
            }
            let mut csr_row = self.csr.row_mut(i);
            let (col_indices, row_values) = csr_row.cols_and_values_mut();
            for (b, &j) in cols.iter().enumerate() {
                if j >= ncols {
                    return Err(LaError::IndexOutOfBounds { index: j, len: ncols });
                }
                let idx = col_indices
                    .binary_search(&j)
                    .map_err(|_| LaError::EntryNotInPattern { row: i, col: j })?;
                let v = values[(a, b)];
                match mode {
                    InsertMode::Add => row_values[idx] += v,
                    InsertMode::Insert => row_values[idx] = v,
                }
            }
        }
        Ok(())
    }
}
