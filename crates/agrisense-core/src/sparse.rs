//! Compressed-sparse-column incidence matrices.
//!
//! Incidence matrices are `|V| x |E|` and overwhelmingly sparse: a
//! hyperedge touches a handful of vertices. Ingest assembles `(row, col)`
//! triplets on the host and compresses them into CSC with 32-bit row
//! indices and 32-bit float values, the canonical form handed across the
//! external boundary.
//!
//! The products the engine needs are narrow: `Bᵀ·B'` for cross-layer edge
//! overlap counting and `Bᵀ·F` for per-edge feature aggregation, both
//! producing small dense outputs.

use ndarray::{Array2, ArrayView2};

/// Sparse `|V| x |E|` matrix in compressed-sparse-column form.
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix {
    nrows: usize,
    /// Column start offsets, length `ncols + 1`.
    colptr: Vec<usize>,
    /// Row indices, sorted and unique within each column.
    rowval: Vec<u32>,
    nzval: Vec<f32>,
}

impl CscMatrix {
    /// An empty matrix with `nrows` rows and no columns.
    pub fn with_rows(nrows: usize) -> Self {
        Self {
            nrows,
            colptr: vec![0],
            rowval: Vec::new(),
            nzval: Vec::new(),
        }
    }

    /// Compresses `(row, col, val)` triplets into CSC form.
    ///
    /// Rows are sorted within each column and duplicate `(row, col)` pairs
    /// collapse to a single entry keeping the first value. Triplets with
    /// out-of-range coordinates are skipped.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(u32, u32, f32)]) -> Self {
        let mut per_col: Vec<Vec<(u32, f32)>> = vec![Vec::new(); ncols];
        for &(row, col, val) in triplets {
            if (row as usize) < nrows && (col as usize) < ncols {
                per_col[col as usize].push((row, val));
            }
        }

        let mut colptr = Vec::with_capacity(ncols + 1);
        let mut rowval = Vec::with_capacity(triplets.len());
        let mut nzval = Vec::with_capacity(triplets.len());
        colptr.push(0);
        for entries in &mut per_col {
            entries.sort_by_key(|&(row, _)| row);
            entries.dedup_by_key(|&mut (row, _)| row);
            for &(row, val) in entries.iter() {
                rowval.push(row);
                nzval.push(val);
            }
            colptr.push(rowval.len());
        }

        Self {
            nrows,
            colptr,
            rowval,
            nzval,
        }
    }

    /// Number of rows (vertices).
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns (hyperedges).
    pub fn ncols(&self) -> usize {
        self.colptr.len() - 1
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.rowval.len()
    }

    /// Iterator over `(row, value)` pairs of column `j`.
    pub fn col(&self, j: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let range = self.colptr[j]..self.colptr[j + 1];
        self.rowval[range.clone()]
            .iter()
            .zip(&self.nzval[range])
            .map(|(&row, &val)| (row as usize, val))
    }

    /// Row indices of column `j`.
    pub fn col_row_indices(&self, j: usize) -> &[u32] {
        &self.rowval[self.colptr[j]..self.colptr[j + 1]]
    }

    /// `true` when `(row, col)` holds a stored entry.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.col_row_indices(col)
            .binary_search(&(row as u32))
            .is_ok()
    }

    /// Indices of the columns whose hyperedge contains `row`.
    pub fn cols_containing_row(&self, row: usize) -> Vec<usize> {
        (0..self.ncols())
            .filter(|&j| self.contains(row, j))
            .collect()
    }

    /// Per-column value sums, the hyperedge degrees for 0/1 incidence.
    pub fn col_degrees(&self) -> Vec<f32> {
        (0..self.ncols())
            .map(|j| self.col(j).map(|(_, v)| v).sum())
            .collect()
    }

    /// Dense `self.ncols() x other.ncols()` product `selfᵀ · other`.
    ///
    /// For 0/1 incidence this counts, per edge pair, the size of the shared
    /// vertex set. Both operands must share the row dimension.
    pub fn transpose_mul(&self, other: &CscMatrix) -> Array2<f32> {
        debug_assert_eq!(self.nrows, other.nrows);
        let mut out = Array2::zeros((self.ncols(), other.ncols()));
        let mut scatter = vec![0.0f32; self.nrows];

        for j in 0..other.ncols() {
            for (row, val) in other.col(j) {
                scatter[row] = val;
            }
            for i in 0..self.ncols() {
                let mut acc = 0.0f32;
                for (row, val) in self.col(i) {
                    acc += val * scatter[row];
                }
                out[[i, j]] = acc;
            }
            for (row, _) in other.col(j) {
                scatter[row] = 0.0;
            }
        }
        out
    }

    /// Dense `self.ncols() x d` product `selfᵀ · dense`.
    pub fn transpose_mul_dense(&self, dense: &ArrayView2<f32>) -> Array2<f32> {
        debug_assert_eq!(self.nrows, dense.nrows());
        let d = dense.ncols();
        let mut out = Array2::zeros((self.ncols(), d));
        for j in 0..self.ncols() {
            for (row, val) in self.col(j) {
                for k in 0..d {
                    out[[j, k]] += val * dense[[row, k]];
                }
            }
        }
        out
    }

    /// Appends one column. `rows` need not be sorted; duplicates collapse.
    pub fn push_col(&mut self, rows: &[u32], val: f32) {
        let mut sorted: Vec<u32> = rows
            .iter()
            .copied()
            .filter(|&r| (r as usize) < self.nrows)
            .collect();
        sorted.sort_unstable();
        sorted.dedup();
        for row in sorted {
            self.rowval.push(row);
            self.nzval.push(val);
        }
        self.colptr.push(self.rowval.len());
    }

    /// Removes column `j`, shifting later columns left.
    pub fn remove_col(&mut self, j: usize) {
        let start = self.colptr[j];
        let end = self.colptr[j + 1];
        let removed = end - start;
        self.rowval.drain(start..end);
        self.nzval.drain(start..end);
        self.colptr.remove(j + 1);
        for ptr in self.colptr.iter_mut().skip(j + 1) {
            *ptr -= removed;
        }
    }

    /// Grows the row dimension by `n` zero rows.
    pub fn append_rows(&mut self, n: usize) {
        self.nrows += n;
    }

    /// Exports the stored entries as `(row, col, val)` triplets in
    /// column-major order.
    pub fn to_triplets(&self) -> Vec<(u32, u32, f32)> {
        let mut out = Vec::with_capacity(self.nnz());
        for j in 0..self.ncols() {
            for (row, val) in self.col(j) {
                out.push((row as u32, j as u32, val));
            }
        }
        out
    }
}
