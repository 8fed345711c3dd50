//! Attentive and max-attentive matching
//!
//! Both strategies start from the same attention matrix: the plain cosine
//! similarity between every timestep of P and every timestep of Q.
//! Attentive matching compares P with the attention-weighted mean of Q,
//! max-attentive matching compares P with the single most-attended Q timestep.

use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::similarity::{cosine_pairwise, weighted_cosine};
use crate::error::{MatchingError, Result};

/// Attention rows whose absolute sum falls below this are treated as degenerate
pub const DEGENERATE_ATTENTION_EPS: f64 = 1e-12;

/// What to do when an attention row sums to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttentionFallback {
    /// Fail with [`MatchingError::DegenerateAttention`]
    Error,
    /// Use the unweighted mean of Q's timesteps
    #[default]
    UniformMean,
    /// Use a zero vector, which matches everything with similarity 0
    Zero,
}

/// Attention scores between P and Q
///
/// # Returns
/// alpha [seq_len_p, seq_len_q, batch]
pub fn attention_scores(p: ArrayView3<f64>, q: ArrayView3<f64>) -> Result<Array3<f64>> {
    if q.dim().0 == 0 {
        return Err(MatchingError::shape("attentive matching", "non-empty Q", q.dim()));
    }
    cosine_pairwise(p, q)
}

/// Attention-weighted mean of Q for every timestep of P
///
/// # Arguments
/// * `alpha` - Attention scores [seq_len_p, seq_len_q, batch]
/// * `q` - Sequence Q [seq_len_q, batch, dim]
/// * `fallback` - Handling of rows whose scores sum to zero
///
/// # Returns
/// Weighted means [seq_len_p, batch, dim]
pub fn attentive_mean(
    alpha: ArrayView3<f64>,
    q: ArrayView3<f64>,
    fallback: AttentionFallback,
) -> Result<Array3<f64>> {
    let (len_p, len_q, batch) = alpha.dim();
    let dim = q.dim().2;
    if q.dim().0 != len_q || q.dim().1 != batch {
        return Err(MatchingError::shape("attentive mean", (len_q, batch, dim), q.dim()));
    }

    let totals = attention_totals(alpha);
    let mut mean = Array3::zeros((len_p, batch, dim));

    for i in 0..len_p {
        for b in 0..batch {
            let weights = alpha.slice(s![i, .., b]);
            let total = totals[[i, b]];
            let mut out = mean.slice_mut(s![i, b, ..]);

            if total.abs() < DEGENERATE_ATTENTION_EPS {
                match fallback {
                    AttentionFallback::Error => {
                        return Err(MatchingError::DegenerateAttention { timestep: i, batch: b });
                    }
                    AttentionFallback::UniformMean => {
                        warn!(timestep = i, batch = b, "attention row sums to zero, using uniform mean");
                        for j in 0..len_q {
                            out.scaled_add(1.0 / len_q as f64, &q.slice(s![j, b, ..]));
                        }
                    }
                    AttentionFallback::Zero => {
                        warn!(timestep = i, batch = b, "attention row sums to zero, using zero vector");
                    }
                }
                continue;
            }

            for (j, &a) in weights.iter().enumerate() {
                out.scaled_add(a / total, &q.slice(s![j, b, ..]));
            }
        }
    }

    Ok(mean)
}

/// Index of the most-attended Q timestep for every (P timestep, batch)
///
/// Ties resolve to the earliest timestep.
pub fn most_attended(alpha: ArrayView3<f64>) -> Array2<usize> {
    let (len_p, _, batch) = alpha.dim();

    Array2::from_shape_fn((len_p, batch), |(i, b)| {
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (j, &score) in alpha.slice(s![i, .., b]).iter().enumerate() {
            if score > best_score {
                best = j;
                best_score = score;
            }
        }
        best
    })
}

/// Gather Q's most-attended timestep for every (P timestep, batch)
///
/// # Returns
/// Selected vectors [seq_len_p, batch, dim]
pub fn max_attentive_vectors(alpha: ArrayView3<f64>, q: ArrayView3<f64>) -> Result<Array3<f64>> {
    let (len_p, len_q, batch) = alpha.dim();
    let dim = q.dim().2;
    if q.dim().0 != len_q || q.dim().1 != batch {
        return Err(MatchingError::shape("max-attentive gather", (len_q, batch, dim), q.dim()));
    }

    let idx = most_attended(alpha);
    let mut gathered = Array3::zeros((len_p, batch, dim));
    for ((i, b), &j) in idx.indexed_iter() {
        gathered.slice_mut(s![i, b, ..]).assign(&q.slice(s![j, b, ..]));
    }

    Ok(gathered)
}

/// Attentive matching result for one direction
#[derive(Debug, Clone)]
pub struct AttentiveMatch {
    /// Matching against the attention-weighted mean [seq_len_p, batch, perspectives]
    pub attentive: Array3<f64>,
    /// Matching against the most-attended timestep [seq_len_p, batch, perspectives]
    pub max_attentive: Array3<f64>,
}

/// Attentive and max-attentive matching of `p` against `q`
///
/// # Arguments
/// * `p` - One direction of P [seq_len_p, batch, dim]
/// * `q` - The same direction of Q [seq_len_q, batch, dim]
/// * `w_att` - Weights for attentive matching [perspectives, dim]
/// * `w_max_att` - Weights for max-attentive matching [perspectives, dim]
pub fn attentive_matching(
    p: ArrayView3<f64>,
    q: ArrayView3<f64>,
    w_att: ArrayView2<f64>,
    w_max_att: ArrayView2<f64>,
    fallback: AttentionFallback,
) -> Result<AttentiveMatch> {
    let alpha = attention_scores(p, q)?;

    Ok(AttentiveMatch {
        attentive: attentive_from_scores(p, q, alpha.view(), w_att, fallback)?,
        max_attentive: max_attentive_from_scores(p, q, alpha.view(), w_max_att)?,
    })
}

/// Attentive matching given precomputed attention scores
///
/// # Returns
/// Matching vectors [seq_len_p, batch, perspectives]
pub fn attentive_from_scores(
    p: ArrayView3<f64>,
    q: ArrayView3<f64>,
    alpha: ArrayView3<f64>,
    w: ArrayView2<f64>,
    fallback: AttentionFallback,
) -> Result<Array3<f64>> {
    let h_mean = attentive_mean(alpha, q, fallback)?;
    weighted_cosine(p, h_mean.view(), w)
}

/// Max-attentive matching given precomputed attention scores
///
/// # Returns
/// Matching vectors [seq_len_p, batch, perspectives]
pub fn max_attentive_from_scores(
    p: ArrayView3<f64>,
    q: ArrayView3<f64>,
    alpha: ArrayView3<f64>,
    w: ArrayView2<f64>,
) -> Result<Array3<f64>> {
    let h_max = max_attentive_vectors(alpha, q)?;
    weighted_cosine(p, h_max.view(), w)
}

/// Sum of attention over Q for every (P timestep, batch)
pub fn attention_totals(alpha: ArrayView3<f64>) -> Array2<f64> {
    alpha.sum_axis(Axis(1))
}
