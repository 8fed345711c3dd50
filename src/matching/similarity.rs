//! Multi-perspective cosine similarity
//!
//! Every perspective `p` of a weight matrix `W` rescales the feature axis
//! elementwise before the cosine is taken:
//!
//! ```text
//! m_p = cos(W[p] ∘ v1, W[p] ∘ v2)
//! ```
//!
//! Norms are clamped from below by [`COSINE_EPS`] independently, so the
//! similarity against an all-zero vector is exactly `0.0`. NaN inputs are not
//! masked: they yield NaN similarities, and [`nan_max`] carries them through
//! max-reductions.

use ndarray::{Array3, Array4, ArrayView1, ArrayView2, ArrayView3};

use crate::error::{MatchingError, Result};

/// Lower bound applied to each vector norm in a cosine similarity
pub const COSINE_EPS: f64 = 1e-8;

/// Maximum of two values that returns NaN if either is NaN
///
/// `f64::max` drops NaN operands, which would hide NaN similarities in a
/// max-pooled result.
pub fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

/// Plain cosine similarity between two vectors of equal length
pub fn cosine_similarity(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let dot = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    dot / (norm_a.max(COSINE_EPS) * norm_b.max(COSINE_EPS))
}

/// Cosine similarity of `w ∘ a` and `w ∘ b`
pub fn weighted_cosine_similarity(
    a: ArrayView1<f64>,
    b: ArrayView1<f64>,
    w: ArrayView1<f64>,
) -> f64 {
    let mut dot = 0.0;
    let mut sq_a = 0.0;
    let mut sq_b = 0.0;

    for ((&x, &y), &k) in a.iter().zip(b.iter()).zip(w.iter()) {
        let wx = k * x;
        let wy = k * y;
        dot += wx * wy;
        sq_a += wx * wx;
        sq_b += wy * wy;
    }

    dot / (sq_a.sqrt().max(COSINE_EPS) * sq_b.sqrt().max(COSINE_EPS))
}

/// Position-aligned multi-perspective matching
///
/// # Arguments
/// * `v1` - Sequence [seq_len, batch, dim]
/// * `v2` - Sequence [seq_len, batch, dim], aligned with `v1` timestep by timestep
/// * `w` - Perspective weights [perspectives, dim]
///
/// # Returns
/// Similarities [seq_len, batch, perspectives]
pub fn weighted_cosine(
    v1: ArrayView3<f64>,
    v2: ArrayView3<f64>,
    w: ArrayView2<f64>,
) -> Result<Array3<f64>> {
    if v1.dim() != v2.dim() {
        return Err(MatchingError::shape("aligned matching", v1.dim(), v2.dim()));
    }
    let (seq_len, batch, dim) = v1.dim();
    check_weights("aligned matching", w, dim)?;

    let perspectives = w.nrows();
    let mut out = Array3::zeros((seq_len, batch, perspectives));

    for t in 0..seq_len {
        for b in 0..batch {
            let a = v1.slice(ndarray::s![t, b, ..]);
            let c = v2.slice(ndarray::s![t, b, ..]);
            for (p, w_row) in w.rows().into_iter().enumerate() {
                out[[t, b, p]] = weighted_cosine_similarity(a, c, w_row);
            }
        }
    }

    Ok(out)
}

/// All-pairs multi-perspective matching
///
/// Compares every timestep of `v1` with every timestep of `v2`. The two
/// sequences may have different lengths but must share batch and feature size.
///
/// # Returns
/// Similarities [seq_len_1, seq_len_2, batch, perspectives]
pub fn weighted_cosine_pairwise(
    v1: ArrayView3<f64>,
    v2: ArrayView3<f64>,
    w: ArrayView2<f64>,
) -> Result<Array4<f64>> {
    check_unaligned("pairwise matching", v1, v2)?;
    let (len_1, batch, dim) = v1.dim();
    let len_2 = v2.dim().0;
    check_weights("pairwise matching", w, dim)?;

    let perspectives = w.nrows();
    // Weighted norms are shared by every pair they take part in.
    let norms_1 = weighted_norms(v1, w);
    let norms_2 = weighted_norms(v2, w);
    let w_sq = w.mapv(|k| k * k);

    let mut out = Array4::zeros((len_1, len_2, batch, perspectives));

    for i in 0..len_1 {
        for j in 0..len_2 {
            for b in 0..batch {
                for p in 0..perspectives {
                    let mut dot = 0.0;
                    for k in 0..dim {
                        dot += w_sq[[p, k]] * v1[[i, b, k]] * v2[[j, b, k]];
                    }
                    let denom = norms_1[[i, b, p]].max(COSINE_EPS) * norms_2[[j, b, p]].max(COSINE_EPS);
                    out[[i, j, b, p]] = dot / denom;
                }
            }
        }
    }

    Ok(out)
}

/// Unweighted all-pairs cosine similarity
///
/// # Returns
/// Attention scores [seq_len_1, seq_len_2, batch]
pub fn cosine_pairwise(v1: ArrayView3<f64>, v2: ArrayView3<f64>) -> Result<Array3<f64>> {
    check_unaligned("attention", v1, v2)?;
    let (len_1, batch, _) = v1.dim();
    let len_2 = v2.dim().0;

    let mut out = Array3::zeros((len_1, len_2, batch));
    for i in 0..len_1 {
        for j in 0..len_2 {
            for b in 0..batch {
                out[[i, j, b]] = cosine_similarity(
                    v1.slice(ndarray::s![i, b, ..]),
                    v2.slice(ndarray::s![j, b, ..]),
                );
            }
        }
    }

    Ok(out)
}

/// Norms of `w[p] ∘ v[t, b]` for every (t, b, p)
fn weighted_norms(v: ArrayView3<f64>, w: ArrayView2<f64>) -> Array3<f64> {
    let (seq_len, batch, dim) = v.dim();
    let perspectives = w.nrows();

    Array3::from_shape_fn((seq_len, batch, perspectives), |(t, b, p)| {
        (0..dim)
            .map(|k| {
                let x = w[[p, k]] * v[[t, b, k]];
                x * x
            })
            .sum::<f64>()
            .sqrt()
    })
}

fn check_unaligned(context: &'static str, v1: ArrayView3<f64>, v2: ArrayView3<f64>) -> Result<()> {
    let (_, batch_1, dim_1) = v1.dim();
    let (_, batch_2, dim_2) = v2.dim();
    if batch_1 != batch_2 || dim_1 != dim_2 {
        return Err(MatchingError::shape(
            context,
            format!("[_, {}, {}]", batch_1, dim_1),
            v2.dim(),
        ));
    }
    Ok(())
}

fn check_weights(context: &'static str, w: ArrayView2<f64>, dim: usize) -> Result<()> {
    if w.ncols() != dim {
        return Err(MatchingError::shape(
            context,
            format!("[_, {}]", dim),
            w.dim(),
        ));
    }
    Ok(())
}
