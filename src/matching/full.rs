//! Full matching
//!
//! Every timestep of P is compared with one boundary timestep of Q: the last
//! one for the forward half, the first one for the backward half.

use ndarray::{s, Array3, ArrayView2, ArrayView3};

use super::similarity::weighted_cosine;
use super::Direction;
use crate::error::{MatchingError, Result};

/// Full matching of `p` against the boundary timestep of `q`
///
/// # Arguments
/// * `p` - One direction of P [seq_len_p, batch, half_dim]
/// * `q` - The same direction of Q [seq_len_q, batch, half_dim]
/// * `w` - Perspective weights [perspectives, half_dim]
/// * `direction` - Selects the boundary timestep of `q`
///
/// # Returns
/// Matching vectors [seq_len_p, batch, perspectives]
pub fn full_matching(
    p: ArrayView3<f64>,
    q: ArrayView3<f64>,
    w: ArrayView2<f64>,
    direction: Direction,
) -> Result<Array3<f64>> {
    let (len_p, batch, dim) = p.dim();
    let (len_q, batch_q, dim_q) = q.dim();

    if batch != batch_q || dim != dim_q {
        return Err(MatchingError::shape("full matching", (len_q, batch, dim), q.dim()));
    }
    let boundary = direction
        .boundary(len_q)
        .ok_or_else(|| MatchingError::shape("full matching", "non-empty Q", q.dim()))?;

    let q_boundary = q.slice(s![boundary..boundary + 1, .., ..]);
    let q_repeated = q_boundary
        .broadcast((len_p, batch, dim))
        .ok_or_else(|| MatchingError::shape("full matching", (len_p, batch, dim), q_boundary.dim()))?;

    weighted_cosine(p, q_repeated, w)
}
