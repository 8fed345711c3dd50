//! Perspective weight bank
//!
//! Eight `[perspectives, half_dim]` matrices, one per strategy/direction slot.
//! The layer only reads them; training code updates them between forward calls
//! through [`PerspectiveWeights::get_mut`] or [`PerspectiveWeights::iter_mut`].

use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{MatchingError, Result};

/// Slot of a perspective weight matrix inside the bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightSlot {
    /// Full matching, forward half
    FullForward,
    /// Full matching, backward half
    FullBackward,
    /// Max-pooling matching, forward half
    MaxPoolForward,
    /// Max-pooling matching, backward half
    MaxPoolBackward,
    /// Attentive matching (both halves when attention weights are shared)
    Attentive,
    /// Max-attentive matching (both halves when attention weights are shared)
    MaxAttentive,
    /// Attentive matching, backward half, when attention weights are not shared
    AttentiveBackward,
    /// Max-attentive matching, backward half, when attention weights are not shared
    MaxAttentiveBackward,
}

impl WeightSlot {
    /// All slots in index order
    pub const ALL: [WeightSlot; 8] = [
        WeightSlot::FullForward,
        WeightSlot::FullBackward,
        WeightSlot::MaxPoolForward,
        WeightSlot::MaxPoolBackward,
        WeightSlot::Attentive,
        WeightSlot::MaxAttentive,
        WeightSlot::AttentiveBackward,
        WeightSlot::MaxAttentiveBackward,
    ];

    /// Position of the slot in the bank (0..8)
    pub fn index(self) -> usize {
        match self {
            WeightSlot::FullForward => 0,
            WeightSlot::FullBackward => 1,
            WeightSlot::MaxPoolForward => 2,
            WeightSlot::MaxPoolBackward => 3,
            WeightSlot::Attentive => 4,
            WeightSlot::MaxAttentive => 5,
            WeightSlot::AttentiveBackward => 6,
            WeightSlot::MaxAttentiveBackward => 7,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Fixed bank of perspective weight matrices
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveWeights {
    full_forward: Array2<f64>,
    full_backward: Array2<f64>,
    maxpool_forward: Array2<f64>,
    maxpool_backward: Array2<f64>,
    attentive: Array2<f64>,
    max_attentive: Array2<f64>,
    attentive_backward: Array2<f64>,
    max_attentive_backward: Array2<f64>,
}

impl PerspectiveWeights {
    /// Draw every matrix from a standard normal distribution
    pub fn random<R: Rng + ?Sized>(perspectives: usize, half_dim: usize, rng: &mut R) -> Self {
        let shape = (perspectives, half_dim);
        let mut draw = || Array2::<f64>::random_using(shape, StandardNormal, &mut *rng);

        Self {
            full_forward: draw(),
            full_backward: draw(),
            maxpool_forward: draw(),
            maxpool_backward: draw(),
            attentive: draw(),
            max_attentive: draw(),
            attentive_backward: draw(),
            max_attentive_backward: draw(),
        }
    }

    /// Every matrix filled with `value`
    pub fn constant(perspectives: usize, half_dim: usize, value: f64) -> Self {
        Self::from_fn(|_| Array2::from_elem((perspectives, half_dim), value))
    }

    /// Build the bank slot by slot
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(WeightSlot) -> Array2<f64>,
    {
        Self {
            full_forward: f(WeightSlot::FullForward),
            full_backward: f(WeightSlot::FullBackward),
            maxpool_forward: f(WeightSlot::MaxPoolForward),
            maxpool_backward: f(WeightSlot::MaxPoolBackward),
            attentive: f(WeightSlot::Attentive),
            max_attentive: f(WeightSlot::MaxAttentive),
            attentive_backward: f(WeightSlot::AttentiveBackward),
            max_attentive_backward: f(WeightSlot::MaxAttentiveBackward),
        }
    }

    /// Build the bank from eight matrices in slot index order
    pub fn from_vec(matrices: Vec<Array2<f64>>) -> Result<Self> {
        if matrices.len() != WeightSlot::ALL.len() {
            return Err(MatchingError::ConfigurationError(format!(
                "expected {} weight matrices, got {}",
                WeightSlot::ALL.len(),
                matrices.len()
            )));
        }

        let mut iter = matrices.into_iter();
        Ok(Self::from_fn(|_| iter.next().unwrap_or_default()))
    }

    pub fn get(&self, slot: WeightSlot) -> &Array2<f64> {
        match slot {
            WeightSlot::FullForward => &self.full_forward,
            WeightSlot::FullBackward => &self.full_backward,
            WeightSlot::MaxPoolForward => &self.maxpool_forward,
            WeightSlot::MaxPoolBackward => &self.maxpool_backward,
            WeightSlot::Attentive => &self.attentive,
            WeightSlot::MaxAttentive => &self.max_attentive,
            WeightSlot::AttentiveBackward => &self.attentive_backward,
            WeightSlot::MaxAttentiveBackward => &self.max_attentive_backward,
        }
    }

    pub fn get_mut(&mut self, slot: WeightSlot) -> &mut Array2<f64> {
        match slot {
            WeightSlot::FullForward => &mut self.full_forward,
            WeightSlot::FullBackward => &mut self.full_backward,
            WeightSlot::MaxPoolForward => &mut self.maxpool_forward,
            WeightSlot::MaxPoolBackward => &mut self.maxpool_backward,
            WeightSlot::Attentive => &mut self.attentive,
            WeightSlot::MaxAttentive => &mut self.max_attentive,
            WeightSlot::AttentiveBackward => &mut self.attentive_backward,
            WeightSlot::MaxAttentiveBackward => &mut self.max_attentive_backward,
        }
    }

    /// Iterate over (slot, matrix) in index order
    pub fn iter(&self) -> impl Iterator<Item = (WeightSlot, &Array2<f64>)> {
        WeightSlot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }

    /// Mutable access to every matrix in index order, for parameter updates
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (WeightSlot, &mut Array2<f64>)> {
        [
            (WeightSlot::FullForward, &mut self.full_forward),
            (WeightSlot::FullBackward, &mut self.full_backward),
            (WeightSlot::MaxPoolForward, &mut self.maxpool_forward),
            (WeightSlot::MaxPoolBackward, &mut self.maxpool_backward),
            (WeightSlot::Attentive, &mut self.attentive),
            (WeightSlot::MaxAttentive, &mut self.max_attentive),
            (WeightSlot::AttentiveBackward, &mut self.attentive_backward),
            (WeightSlot::MaxAttentiveBackward, &mut self.max_attentive_backward),
        ]
        .into_iter()
    }

    /// Check that every matrix is `[perspectives, half_dim]`
    pub fn validate(&self, perspectives: usize, half_dim: usize) -> Result<()> {
        for (slot, w) in self.iter() {
            if w.dim() != (perspectives, half_dim) {
                return Err(MatchingError::ConfigurationError(format!(
                    "weight slot {} ({:?}) has shape {:?}, expected {:?}",
                    slot.index(),
                    slot,
                    w.dim(),
                    (perspectives, half_dim)
                )));
            }
        }
        Ok(())
    }

    /// Total number of scalar parameters in the bank
    pub fn num_parameters(&self) -> usize {
        self.iter().map(|(_, w)| w.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_slot_indices_roundtrip() {
        for (i, slot) in WeightSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
            assert_eq!(WeightSlot::from_index(i), Some(*slot));
        }
        assert_eq!(WeightSlot::from_index(8), None);
    }

    #[test]
    fn test_random_bank_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        let bank = PerspectiveWeights::random(3, 5, &mut rng);

        assert!(bank.validate(3, 5).is_ok());
        assert_eq!(bank.num_parameters(), 8 * 3 * 5);
        // Slots are drawn independently
        assert_ne!(bank.get(WeightSlot::FullForward), bank.get(WeightSlot::FullBackward));
    }

    #[test]
    fn test_random_bank_is_seeded() {
        let a = PerspectiveWeights::random(2, 4, &mut StdRng::seed_from_u64(42));
        let b = PerspectiveWeights::random(2, 4, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_vec_requires_eight() {
        let matrices = vec![Array2::<f64>::zeros((2, 2)); 7];
        assert!(PerspectiveWeights::from_vec(matrices).is_err());

        let matrices: Vec<_> = (0..8).map(|i| Array2::from_elem((2, 2), i as f64)).collect();
        let bank = PerspectiveWeights::from_vec(matrices).unwrap();
        assert_eq!(bank.get(WeightSlot::MaxAttentiveBackward)[[0, 0]], 7.0);
        assert_eq!(bank.get(WeightSlot::Attentive)[[1, 1]], 4.0);
    }

    #[test]
    fn test_validate_reports_bad_slot() {
        let mut bank = PerspectiveWeights::constant(2, 3, 1.0);
        *bank.get_mut(WeightSlot::MaxPoolBackward) = Array2::zeros((2, 4));

        let err = bank.validate(2, 3).unwrap_err();
        assert!(err.to_string().contains("slot 3"));
    }

    #[test]
    fn test_iter_mut_updates_in_place() {
        let mut bank = PerspectiveWeights::constant(2, 2, 1.0);
        for (_, w) in bank.iter_mut() {
            w.mapv_inplace(|x| x - 0.5);
        }
        assert!(bank.iter().all(|(_, w)| w.iter().all(|&x| x == 0.5)));
    }
}
