//! Max-pooling matching
//!
//! Each timestep of P is compared with every timestep of Q and the best
//! similarity is kept per perspective.

use ndarray::{Array3, ArrayView2, ArrayView3, Axis};

use super::similarity::{nan_max, weighted_cosine_pairwise};
use crate::error::{MatchingError, Result};

/// Max-pooling matching of `p` against all timesteps of `q`
///
/// # Returns
/// Matching vectors [seq_len_p, batch, perspectives]
pub fn max_pool_matching(
    p: ArrayView3<f64>,
    q: ArrayView3<f64>,
    w: ArrayView2<f64>,
) -> Result<Array3<f64>> {
    if q.dim().0 == 0 {
        return Err(MatchingError::shape("max-pool matching", "non-empty Q", q.dim()));
    }

    let grid = weighted_cosine_pairwise(p, q, w)?;
    let pooled = grid.fold_axis(Axis(1), f64::NEG_INFINITY, |&acc, &x| nan_max(acc, x));

    debug_assert_eq!(pooled.dim(), (p.dim().0, p.dim().1, w.nrows()));

    Ok(pooled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::similarity::weighted_cosine_similarity;
    use approx::assert_relative_eq;
    use ndarray::{s, Array2};

    #[test]
    fn test_picks_best_timestep() {
        let p = Array3::from_shape_vec((1, 1, 2), vec![1.0, 0.0]).unwrap();
        let q = Array3::from_shape_vec((3, 1, 2), vec![0.0, 1.0, 1.0, 0.1, -1.0, 0.0]).unwrap();
        let w = Array2::ones((1, 2));

        let m = max_pool_matching(p.view(), q.view(), w.view()).unwrap();
        let expected = 1.0 / (1.0f64 + 0.01).sqrt();
        assert_relative_eq!(m[[0, 0, 0]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_nan_in_q_is_not_masked() {
        let p = Array3::from_shape_vec((2, 2, 2), vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
        let mut q = Array3::from_shape_vec((2, 2, 2), vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
        // Only batch 0 of Q's second timestep is corrupted
        q[[1, 0, 0]] = f64::NAN;
        let w = Array2::ones((1, 2));

        let m = max_pool_matching(p.view(), q.view(), w.view()).unwrap();
        assert!(m[[0, 0, 0]].is_nan());
        assert!(m[[1, 0, 0]].is_nan());
        assert_relative_eq!(m[[0, 1, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(m[[1, 1, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matches_brute_force() {
        let p = Array3::from_shape_fn((3, 2, 4), |(t, b, k)| ((t * 5 + b * 2 + k * 3) % 7) as f64 - 3.0);
        let q = Array3::from_shape_fn((4, 2, 4), |(t, b, k)| ((t * 3 + b + k * 2) % 5) as f64 - 2.0);
        let w = Array2::from_shape_fn((2, 4), |(l, k)| 1.0 + (l + k) as f64 * 0.5);

        let m = max_pool_matching(p.view(), q.view(), w.view()).unwrap();

        for i in 0..3 {
            for b in 0..2 {
                for l in 0..2 {
                    let best = (0..4)
                        .map(|j| {
                            weighted_cosine_similarity(
                                p.slice(s![i, b, ..]),
                                q.slice(s![j, b, ..]),
                                w.row(l),
                            )
                        })
                        .fold(f64::NEG_INFINITY, f64::max);
                    assert_relative_eq!(m[[i, b, l]], best, epsilon = 1e-12);
                }
            }
        }
    }
}
