use crate::{LaError, Matrix, Real, Vector};
use nalgebra::{DMatrix, DVector};

/// A vector composed of independent sub-vectors.
#[derive(Debug, Clone)]
pub struct NestVector<T: Real> {
    blocks: Vec<Vector<T>>,
}

impl<T: Real> NestVector<T> {
    pub fn new(blocks: Vec<Vector<T>>) -> Self {
        Self { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds. The same holds for [`block_mut`](Self::block_mut).
    pub fn block(&self, index: usize) -> &Vector<T> {
        &self.blocks[index]
    }

    pub fn block_mut(&mut self, index: usize) -> &mut Vector<T> {
        &mut self.blocks[index]
    }

    pub fn blocks(&self) -> &[Vector<T>] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Vector<T>] {
        &mut self.blocks
    }

    pub fn into_blocks(self) -> Vec<Vector<T>> {
        self.blocks
    }

    pub fn accumulate_ghosts(&mut self) {
        for block in &mut self.blocks {
            block.accumulate_ghosts();
        }
    }

    /// Owned entries of all sub-vectors, concatenated.
    pub fn owned_concatenated(&self) -> DVector<T> {
        let values: Vec<T> = self
            .blocks
            .iter()
            .flat_map(|b| b.owned().iter().copied())
            .collect();
        DVector::from_vec(values)
    }
}

/// A matrix composed of a rectangular grid of independent sub-matrices.
///
/// Cells without a sub-matrix are structurally zero.
#[derive(Debug, Clone)]
pub struct NestMatrix<T: Real> {
    blocks: Vec<Vec<Option<Matrix<T>>>>,
    shape: (usize, usize),
}

impl<T: Real> NestMatrix<T> {
    /// Creates a nested matrix from rows of optional sub-matrices.
    ///
    /// All rows must have the same length, and sub-matrices in the same block row (column) must have the
    /// same number of rows (columns).
    pub fn new(blocks: Vec<Vec<Option<Matrix<T>>>>) -> Result<Self, LaError> {
        let nrows = blocks.len();
        let ncols = blocks.first().map(|row| row.len()).unwrap_or(0);
        if let Some(row) = blocks.iter().find(|row| row.len() != ncols) {
            return Err(LaError::DimensionMismatch {
                expected: (nrows, ncols),
                actual: (nrows, row.len()),
            });
        }
        let matrix = Self {
            blocks,
            shape: (nrows, ncols),
        };
        for i in 0..nrows {
            for j in 0..ncols {
                if let Some(block) = matrix.sub_matrix(i, j) {
                    let expected = (matrix.block_row_size(i), matrix.block_col_size(j));
                    let actual = (block.nrows(), block.ncols());
                    if expected != (Some(actual.0), Some(actual.1)) {
                        return Err(LaError::DimensionMismatch {
                            expected: (expected.0.unwrap_or(0), expected.1.unwrap_or(0)),
                            actual,
                        });
                    }
                }
            }
        }
        Ok(matrix)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// The sub-matrix of block `(i, j)`, or `None` for an absent block.
    ///
    /// # Panics
    ///
    /// Panics if `(i, j)` lies outside [`shape`](Self::shape). The same holds for
    /// [`sub_matrix_mut`](Self::sub_matrix_mut).
    pub fn sub_matrix(&self, i: usize, j: usize) -> Option<&Matrix<T>> {
        self.blocks[i][j].as_ref()
    }

    pub fn sub_matrix_mut(&mut self, i: usize, j: usize) -> Option<&mut Matrix<T>> {
        self.blocks[i][j].as_mut()
    }

    /// Flushes all sub-matrices.
    pub fn flush(&mut self) {
        for block in self.blocks.iter_mut().flatten().flatten() {
            block.flush();
        }
    }

    /// Number of local rows of block row `i`, if the row has at least one sub-matrix.
    pub fn block_row_size(&self, i: usize) -> Option<usize> {
        self.blocks[i].iter().flatten().map(|m| m.nrows()).next()
    }

    /// Number of local columns of block column `j`, if the column has at least one sub-matrix.
    pub fn block_col_size(&self, j: usize) -> Option<usize> {
        self.blocks
            .iter()
            .filter_map(|row| row[j].as_ref())
            .map(|m| m.ncols())
            .next()
    }

    /// Dense matrix of the whole grid with block rows and columns laid out consecutively.
    ///
    /// Block rows or columns without any sub-matrix have zero size.
    pub fn to_dense(&self) -> DMatrix<T> {
        let (nrows, ncols) = self.shape;
        let row_sizes: Vec<usize> = (0..nrows)
            .map(|i| self.block_row_size(i).unwrap_or(0))
            .collect();
        let col_sizes: Vec<usize> = (0..ncols)
            .map(|j| self.block_col_size(j).unwrap_or(0))
            .collect();
        let mut dense = DMatrix::zeros(row_sizes.iter().sum(), col_sizes.iter().sum());
        let mut row_offset = 0;
        for i in 0..nrows {
            let mut col_offset = 0;
            for j in 0..ncols {
                if let Some(block) = self.sub_matrix(i, j) {
                    dense
                        .view_mut((row_offset, col_offset), (row_sizes[i], col_sizes[j]))
                        .copy_from(&block.to_dense());
                }
                col_offset += col_sizes[j];
            }
            row_offset += row_sizes[i];
        }
        dense
    }
}
