//! NaN + mask missingness encoding.
//!
//! A dropped sample is marked twice: `true` in the boolean mask and `NaN`
//! in the numeric matrix at the same position. Downstream consumers can
//! detect missingness from either side without ambiguity.

use ndarray::Array2;

use crate::rng::SynthRng;

/// Wire name of the missingness encoding.
pub const ENCODING: &str = "nan+mask";

/// Draws an `n_steps x n` dropout mask at the given rate.
pub fn dropout_mask(rng: &mut SynthRng, n_steps: usize, n: usize, rate: f32) -> Vec<Vec<bool>> {
    (0..n_steps)
        .map(|_| (0..n).map(|_| rng.bernoulli(rate)).collect())
        .collect()
}

/// Writes `NaN` into `matrix` wherever `mask` is `true`.
pub fn apply_mask(matrix: &mut Array2<f32>, mask: &[Vec<bool>]) {
    for (t, row) in mask.iter().enumerate() {
        for (c, &dropped) in row.iter().enumerate() {
            if dropped {
                matrix[[t, c]] = f32::NAN;
            }
        }
    }
}

/// Converts a matrix into the plain nested-row form of the contract.
pub fn to_rows(matrix: &Array2<f32>) -> Vec<Vec<f32>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}
