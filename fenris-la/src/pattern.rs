use nalgebra_sparse::pattern::SparsityPattern;
use std::collections::BTreeSet;

/// Incremental construction of a sparsity pattern from dense blocks of coupled indices.
#[derive(Debug, Clone)]
pub struct SparsityPatternBuilder {
    nrows: usize,
    ncols: usize,
    // A BTreeSet stores each entry exactly once and yields the entries in row-major order,
    // which is what the CSR offsets require
    entries: BTreeSet<(usize, usize)>,
}

impl SparsityPatternBuilder {
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            entries: BTreeSet::new(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Couples every index in `rows` with every index in `cols`.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    pub fn insert_block(&mut self, rows: &[usize], cols: &[usize]) {
        for &i in rows {
            assert!(i < self.nrows, "Row index {} out of bounds", i);
            for &j in cols {
                assert!(j < self.ncols, "Column index {} out of bounds", j);
                self.entries.insert((i, j));
            }
        }
    }

    pub fn build(self) -> SparsityPattern {
        let mut offsets = Vec::with_capacity(self.nrows + 1);
        let mut column_indices = Vec::with_capacity(self.entries.len());

        offsets.push(0);
        for (i, j) in self.entries {
            // A while loop handles consecutive empty rows
            while i + 1 > offsets.len() {
                offsets.push(column_indices.len());
            }
            column_indices.push(j);
        }

        // Fill out the remaining offsets if the last rows are empty
        while offsets.len() < (self.nrows + 1) {
            offsets.push(column_indices.len());
        }

        SparsityPattern::try_from_offsets_and_indices(self.nrows, self.ncols, offsets, column_indices)
            .expect("Internal error: offsets and indices are sorted and in bounds by construction")
    }
}
