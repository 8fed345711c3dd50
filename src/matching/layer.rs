//! Bilateral multi-perspective matching layer
//!
//! Splits both encodings into forward and backward halves, runs every enabled
//! strategy on each half and concatenates the results along the perspective axis:
//!
//! ```text
//! [full_fw, full_bw, maxpool_fw, maxpool_bw, att_fw, att_bw, maxatt_fw, maxatt_bw]
//! ```

use ndarray::{concatenate, Array3, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use super::attentive::{attention_scores, attentive_from_scores, max_attentive_from_scores};
use super::config::MatchingConfig;
use super::full::full_matching;
use super::max_pool::max_pool_matching;
use super::strategy::{Direction, MatchingStrategy};
use super::weights::PerspectiveWeights;
use crate::error::{MatchingError, Result};

/// Output of one strategy on one direction
#[derive(Debug, Clone)]
pub struct MatchingVector {
    pub strategy: MatchingStrategy,
    pub direction: Direction,
    /// Similarities [seq_len_p, batch, perspectives]
    pub values: Array3<f64>,
}

/// Matching layer holding the perspective weight bank
///
/// # Example
/// ```
/// use bimpm_matching::{MatchingConfig, MatchingLayer};
/// use ndarray::Array3;
///
/// let layer = MatchingLayer::with_seed(MatchingConfig::new(8, 3), 42).unwrap();
/// let p = Array3::from_elem((5, 2, 8), 0.5);
/// let q = Array3::from_elem((4, 2, 8), -0.5);
///
/// let out = layer.forward(&p, &q).unwrap();
/// assert_eq!(out.dim(), (5, 2, 24));
/// ```
#[derive(Debug, Clone)]
pub struct MatchingLayer {
    config: MatchingConfig,
    weights: PerspectiveWeights,
}

impl MatchingLayer {
    /// Create a layer with randomly initialized weights
    pub fn new(config: MatchingConfig) -> Result<Self> {
        Self::with_rng(config, &mut rand::thread_rng())
    }

    /// Create a layer with weights drawn from a seeded generator
    pub fn with_seed(config: MatchingConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, &mut StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: Rng + ?Sized>(config: MatchingConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let weights = PerspectiveWeights::random(config.perspectives, config.half_dim(), rng);

        debug!(
            hidden_dim = config.hidden_dim,
            perspectives = config.perspectives,
            output_dim = config.output_dim(),
            "created matching layer"
        );

        Ok(Self { config, weights })
    }

    /// Create a layer around existing weights
    pub fn from_weights(config: MatchingConfig, weights: PerspectiveWeights) -> Result<Self> {
        config.validate()?;
        weights.validate(config.perspectives, config.half_dim())?;
        Ok(Self { config, weights })
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn weights(&self) -> &PerspectiveWeights {
        &self.weights
    }

    /// Mutable weights for external parameter updates between forward calls
    pub fn weights_mut(&mut self) -> &mut PerspectiveWeights {
        &mut self.weights
    }

    /// Width of the last output axis
    pub fn output_dim(&self) -> usize {
        self.config.output_dim()
    }

    pub fn num_parameters(&self) -> usize {
        self.weights.num_parameters()
    }

    /// Match every timestep of `p` against `q`
    ///
    /// # Arguments
    /// * `p` - Encoding of the first sequence [seq_len_p, batch, hidden_dim]
    /// * `q` - Encoding of the second sequence [seq_len_q, batch, hidden_dim]
    ///
    /// # Returns
    /// Matching vectors [seq_len_p, batch, output_dim]
    pub fn forward(&self, p: &Array3<f64>, q: &Array3<f64>) -> Result<Array3<f64>> {
        let components = self.forward_components(p, q)?;
        let views: Vec<ArrayView3<f64>> = components.iter().map(|m| m.values.view()).collect();

        concatenate(Axis(2), &views).map_err(|e| MatchingError::ShapeMismatch {
            context: "concatenation",
            expected: format!("{:?}", (p.dim().0, p.dim().1, self.output_dim())),
            got: e.to_string(),
        })
    }

    /// Match in both directions: `(p against q, q against p)`
    pub fn forward_bilateral(
        &self,
        p: &Array3<f64>,
        q: &Array3<f64>,
    ) -> Result<(Array3<f64>, Array3<f64>)> {
        Ok((self.forward(p, q)?, self.forward(q, p)?))
    }

    /// Per-strategy matching vectors in output order, before concatenation
    pub fn forward_components(&self, p: &Array3<f64>, q: &Array3<f64>) -> Result<Vec<MatchingVector>> {
        self.check_inputs(p, q)?;

        let (len_p, batch, _) = p.dim();
        let half = self.config.half_dim();
        let (p_fw, p_bw) = split_halves(p.view(), half);
        let (q_fw, q_bw) = split_halves(q.view(), half);
        let halves = |direction: Direction| match direction {
            Direction::Forward => (p_fw, q_fw),
            Direction::Backward => (p_bw, q_bw),
        };

        debug!(
            p_shape = ?p.dim(),
            q_shape = ?q.dim(),
            "matching forward pass"
        );

        let strategies = self.config.enabled_strategies();

        // One attention matrix per direction, shared by attentive and max-attentive.
        let attention = if strategies.iter().any(|s| s.uses_attention()) {
            Direction::BOTH
                .into_iter()
                .map(|d| {
                    let (pd, qd) = halves(d);
                    attention_scores(pd, qd)
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let mut vectors = Vec::with_capacity(strategies.len() * 2);
        for strategy in strategies {
            for direction in Direction::BOTH {
                let (pd, qd) = halves(direction);
                let slot = strategy.weight_slot(direction, self.config.share_attention_weights);
                let w = self.weights.get(slot).view();

                let values = match strategy {
                    MatchingStrategy::Full => full_matching(pd, qd, w, direction)?,
                    MatchingStrategy::MaxPool => max_pool_matching(pd, qd, w)?,
                    MatchingStrategy::Attentive => attentive_from_scores(
                        pd,
                        qd,
                        attention[direction.index()].view(),
                        w,
                        self.config.attention_fallback,
                    )?,
                    MatchingStrategy::MaxAttentive => {
                        max_attentive_from_scores(pd, qd, attention[direction.index()].view(), w)?
                    }
                };

                trace!(%strategy, %direction, slot = slot.index(), "computed matching vector");
                vectors.push(MatchingVector {
                    strategy,
                    direction,
                    values,
                });
            }
        }

        if self.config.full_match {
            let expected = (len_p, batch, self.config.perspectives);
            assert_eq!(
                vectors[0].values.dim(),
                vectors[1].values.dim(),
                "full matching directions disagree in shape"
            );
            assert_eq!(vectors[0].values.dim(), expected, "full matching has wrong shape");
        }

        Ok(vectors)
    }

    fn check_inputs(&self, p: &Array3<f64>, q: &Array3<f64>) -> Result<()> {
        let (len_p, batch_p, hidden_p) = p.dim();
        let (len_q, batch_q, hidden_q) = q.dim();

        if hidden_p % 2 != 0 {
            return Err(MatchingError::shape("input P", "even hidden_dim", p.dim()));
        }
        if batch_p != batch_q || hidden_p != hidden_q {
            return Err(MatchingError::shape(
                "input Q",
                (len_q, batch_p, hidden_p),
                q.dim(),
            ));
        }
        if hidden_p != self.config.hidden_dim {
            return Err(MatchingError::shape(
                "input P",
                (len_p, batch_p, self.config.hidden_dim),
                p.dim(),
            ));
        }
        if len_p == 0 || len_q == 0 || batch_p == 0 {
            return Err(MatchingError::shape(
                "inputs",
                "non-empty sequences and batch",
                (p.dim(), q.dim()),
            ));
        }
        Ok(())
    }
}

/// Split [seq, batch, 2 * half] into forward and backward views
fn split_halves(x: ArrayView3<'_, f64>, half: usize) -> (ArrayView3<'_, f64>, ArrayView3<'_, f64>) {
    x.split_at(Axis(2), half)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::weights::WeightSlot;
    use approx::assert_relative_eq;
    use ndarray::{s, Array2};

    fn encoding(len: usize, batch: usize, hidden: usize, seed: usize) -> Array3<f64> {
        Array3::from_shape_fn((len, batch, hidden), |(t, b, k)| {
            (((t + 1) * 13 + (b + 1) * 7 + k * 5 + seed * 3) % 17) as f64 / 4.0 - 2.0
        })
    }

    #[test]
    fn test_forward_shape_all_strategies() {
        let layer = MatchingLayer::with_seed(MatchingConfig::new(8, 3), 1).unwrap();
        let out = layer.forward(&encoding(5, 2, 8, 0), &encoding(5, 2, 8, 1)).unwrap();

        assert_eq!(out.dim(), (5, 2, 24));
        assert_eq!(layer.output_dim(), 24);
    }

    #[test]
    fn test_components_in_fixed_order() {
        let layer = MatchingLayer::with_seed(MatchingConfig::new(8, 2), 3).unwrap();
        let components = layer
            .forward_components(&encoding(3, 1, 8, 0), &encoding(4, 1, 8, 2))
            .unwrap();

        let order: Vec<(MatchingStrategy, Direction)> =
            components.iter().map(|m| (m.strategy, m.direction)).collect();
        let expected: Vec<(MatchingStrategy, Direction)> = MatchingStrategy::ORDER
            .into_iter()
            .flat_map(|s| Direction::BOTH.map(|d| (s, d)))
            .collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_concatenation_matches_components() {
        let layer = MatchingLayer::with_seed(MatchingConfig::new(6, 2), 9).unwrap();
        let p = encoding(4, 2, 6, 0);
        let q = encoding(3, 2, 6, 5);

        let out = layer.forward(&p, &q).unwrap();
        let components = layer.forward_components(&p, &q).unwrap();

        for (n, component) in components.iter().enumerate() {
            let block = out.slice(s![.., .., n * 2..(n + 1) * 2]);
            assert_eq!(block, component.values.view());
        }
    }

    #[test]
    fn test_shared_attention_weights() {
        let config = MatchingConfig::new(4, 2).with_strategies(false, false, true, false);
        let mut weights = PerspectiveWeights::constant(2, 2, 1.0);
        *weights.get_mut(WeightSlot::AttentiveBackward) = Array2::from_elem((2, 2), 0.0);
        let p = encoding(3, 1, 4, 0);
        let q = encoding(3, 1, 4, 4);

        // Shared: the zeroed backward slot is never read
        let shared = MatchingLayer::from_weights(config.clone(), weights.clone()).unwrap();
        let out = shared.forward(&p, &q).unwrap();
        assert!(out.slice(s![.., .., 2..]).iter().any(|&x| x != 0.0));

        // Dedicated: the backward pass reads the zeroed slot
        let dedicated =
            MatchingLayer::from_weights(config.with_shared_attention_weights(false), weights).unwrap();
        let out = dedicated.forward(&p, &q).unwrap();
        assert!(out.slice(s![.., .., 2..]).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_full_matching_ignores_inner_q_timesteps() {
        let layer = MatchingLayer::with_seed(
            MatchingConfig::new(6, 3).with_strategies(true, false, false, false),
            11,
        )
        .unwrap();
        let p = encoding(4, 2, 6, 0);
        let q = encoding(5, 2, 6, 1);
        let mut q_changed = q.clone();
        q_changed.slice_mut(s![1..4, .., ..]).mapv_inplace(|x| x * -3.0 + 1.0);

        let a = layer.forward(&p, &q).unwrap();
        let b = layer.forward(&p, &q_changed).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let layer = MatchingLayer::with_seed(MatchingConfig::new(8, 2), 0).unwrap();

        let odd = Array3::<f64>::ones((3, 2, 7));
        assert!(matches!(
            layer.forward(&odd, &odd),
            Err(MatchingError::ShapeMismatch { .. })
        ));

        let p = encoding(3, 2, 8, 0);
        let q = encoding(3, 3, 8, 0);
        assert!(matches!(layer.forward(&p, &q), Err(MatchingError::ShapeMismatch { .. })));

        let q = encoding(3, 2, 10, 0);
        assert!(layer.forward(&p, &q).is_err());

        let wide = encoding(3, 2, 10, 0);
        assert!(layer.forward(&wide, &wide).is_err());

        let empty = Array3::<f64>::zeros((0, 2, 8));
        assert!(layer.forward(&p, &empty).is_err());
    }

    #[test]
    fn test_from_weights_checks_shapes() {
        let config = MatchingConfig::new(8, 3);
        assert!(MatchingLayer::from_weights(config.clone(), PerspectiveWeights::constant(3, 4, 1.0)).is_ok());
        assert!(MatchingLayer::from_weights(config, PerspectiveWeights::constant(3, 8, 1.0)).is_err());
    }

    #[test]
    fn test_bilateral_shapes() {
        let layer = MatchingLayer::with_seed(MatchingConfig::new(4, 2), 5).unwrap();
        let (p_vs_q, q_vs_p) = layer
            .forward_bilateral(&encoding(6, 3, 4, 0), &encoding(2, 3, 4, 1))
            .unwrap();

        assert_eq!(p_vs_q.dim(), (6, 3, 16));
        assert_eq!(q_vs_p.dim(), (2, 3, 16));
    }
}
