//! Cross-entity correlated noise via Cholesky factorisation.
//!
//! Each layer injects correlation between its entities (sensors, zones,
//! beds) by multiplying independent standard normals with the
//! lower-triangular Cholesky factor of a correlation matrix derived from a
//! seeded random factor vector. Ill-conditioned matrices are stabilised by
//! escalating diagonal jitter before falling back to heavy regularisation.

use ndarray::Array2;
use tracing::debug;

use crate::rng::SynthRng;

/// Initial diagonal jitter for an ill-conditioned matrix.
const JITTER_START: f32 = 1e-5;

/// Escalation steps (x10 each) before the heavy fallback.
const JITTER_STEPS: usize = 6;

/// Heavy fallback regularisation when escalation fails.
const JITTER_FALLBACK: f32 = 0.1;

/// Builds an `n x n` positive-definite correlation matrix from a seeded
/// random factor: `C = normalize(f·fᵀ + I)`, unit diagonal by construction.
pub fn factor_correlation(rng: &mut SynthRng, n: usize) -> Array2<f32> {
    let factor: Vec<f32> = (0..n).map(|_| rng.next_gaussian()).collect();
    let mut corr = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            let raw = factor[i] * factor[j] + if i == j { 1.0 } else { 0.0 };
            let scale = ((factor[i] * factor[i] + 1.0) * (factor[j] * factor[j] + 1.0)).sqrt();
            corr[[i, j]] = raw / scale;
        }
    }
    corr
}

/// Lower-triangular Cholesky factor with jitter escalation.
///
/// Starts at `1e-5·I` and multiplies by 10 up to six times; when the matrix
/// still is not positive definite, regularises with `0.1·I`, which always
/// succeeds for a unit-diagonal matrix.
pub fn cholesky_with_jitter(corr: &Array2<f32>) -> Array2<f32> {
    if let Some(l) = cholesky(corr) {
        return l;
    }
    let mut jitter = JITTER_START;
    for _ in 0..JITTER_STEPS {
        debug!(jitter, "correlation matrix ill-conditioned, adding jitter");
        if let Some(l) = cholesky(&jittered(corr, jitter)) {
            return l;
        }
        jitter *= 10.0;
    }
    match cholesky(&jittered(corr, JITTER_FALLBACK)) {
        Some(l) => l,
        // Unit-diagonal plus 0.1 is diagonally dominant enough in every
        // practical case; degrade to the identity factor if not.
        None => Array2::eye(corr.nrows()),
    }
}

fn jittered(corr: &Array2<f32>, jitter: f32) -> Array2<f32> {
    let mut out = corr.clone();
    for i in 0..out.nrows() {
        out[[i, i]] += jitter;
    }
    out
}

/// Plain Cholesky; `None` when a pivot goes non-positive.
fn cholesky(matrix: &Array2<f32>) -> Option<Array2<f32>> {
    let n = matrix.nrows();
    let mut l: Array2<f32> = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 1e-10 {
                    return None;
                }
                l[[i, j]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// `n_steps x n` matrix of standard normals correlated across columns:
/// each row is `L·z` for an independent normal vector `z`.
pub fn correlated_noise(rng: &mut SynthRng, n_steps: usize, l: &Array2<f32>) -> Array2<f32> {
    let n = l.nrows();
    let mut out = Array2::zeros((n_steps, n));
    let mut z = vec![0.0f32; n];
    for t in 0..n_steps {
        for value in z.iter_mut() {
            *value = rng.next_gaussian();
        }
        for i in 0..n {
            let mut acc = 0.0f32;
            for k in 0..=i {
                acc += l[[i, k]] * z[k];
            }
            out[[t, i]] = acc;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_correlation_is_unit_diagonal() {
        let mut rng = SynthRng::new(11);
        let corr = factor_correlation(&mut rng, 5);
        for i in 0..5 {
            assert!((corr[[i, i]] - 1.0).abs() < 1e-5);
            for j in 0..5 {
                assert!(corr[[i, j]].abs() <= 1.0 + 1e-5);
                assert!((corr[[i, j]] - corr[[j, i]]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_cholesky_reconstructs() {
        let mut rng = SynthRng::new(23);
        let corr = factor_correlation(&mut rng, 4);
        let l = cholesky_with_jitter(&corr);
        // L·Lᵀ ≈ C (within jitter tolerance)
        for i in 0..4 {
            for j in 0..4 {
                let mut acc = 0.0f32;
                for k in 0..4 {
                    acc += l[[i, k]] * l[[j, k]];
                }
                assert!((acc - corr[[i, j]]).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_jitter_rescues_degenerate_matrix() {
        // Perfectly correlated pair: rank one, not positive definite.
        let corr = ndarray::array![[1.0f32, 1.0], [1.0, 1.0]];
        let l = cholesky_with_jitter(&corr);
        assert!(l[[0, 0]] > 0.0);
        assert!(l[[1, 1]] > 0.0);
    }

    #[test]
    fn test_correlated_noise_tracks_factor() {
        let mut rng = SynthRng::new(5);
        let corr = factor_correlation(&mut rng, 3);
        let l = cholesky_with_jitter(&corr);
        let noise = correlated_noise(&mut rng, 4000, &l);

        // Empirical pairwise correlation approximates the target.
        let col = |j: usize| noise.column(j).to_vec();
        let (a, b) = (col(0), col(1));
        let mean_a = a.iter().sum::<f32>() / a.len() as f32;
        let mean_b = b.iter().sum::<f32>() / b.len() as f32;
        let mut cov = 0.0;
        let mut var_a = 0.0;
        let mut var_b = 0.0;
        for t in 0..a.len() {
            cov += (a[t] - mean_a) * (b[t] - mean_b);
            var_a += (a[t] - mean_a).powi(2);
            var_b += (b[t] - mean_b).powi(2);
        }
        let empirical = cov / (var_a * var_b).sqrt();
        assert!((empirical - corr[[0, 1]]).abs() < 0.08);
    }
}
