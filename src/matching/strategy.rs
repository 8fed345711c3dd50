//! Matching strategies and encoder directions

use std::fmt;

use super::weights::WeightSlot;

/// Half of a bidirectional encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// First half of the hidden dimension
    Forward,
    /// Second half of the hidden dimension
    Backward,
}

impl Direction {
    /// Both directions in output order
    pub const BOTH: [Direction; 2] = [Direction::Forward, Direction::Backward];

    pub fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Backward => 1,
        }
    }

    /// Boundary timestep of a sequence of length `len`: last for forward, first for backward
    pub fn boundary(self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        match self {
            Direction::Forward => Some(len - 1),
            Direction::Backward => Some(0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

/// Matching strategy, in the order their vectors appear in the layer output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchingStrategy {
    /// Against Q's boundary timestep
    Full,
    /// Best match over all Q timesteps
    MaxPool,
    /// Against the attention-weighted mean of Q
    Attentive,
    /// Against Q's most-attended timestep
    MaxAttentive,
}

impl MatchingStrategy {
    /// Output order of the strategies
    pub const ORDER: [MatchingStrategy; 4] = [
        MatchingStrategy::Full,
        MatchingStrategy::MaxPool,
        MatchingStrategy::Attentive,
        MatchingStrategy::MaxAttentive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MatchingStrategy::Full => "full",
            MatchingStrategy::MaxPool => "maxpool",
            MatchingStrategy::Attentive => "attentive",
            MatchingStrategy::MaxAttentive => "max_attentive",
        }
    }

    /// Whether the strategy reads the P/Q attention matrix
    pub fn uses_attention(self) -> bool {
        matches!(self, MatchingStrategy::Attentive | MatchingStrategy::MaxAttentive)
    }

    /// Weight slot for this strategy and direction
    ///
    /// With `share_attention` set, the backward attentive passes reuse the
    /// forward slots and slots 6/7 stay idle.
    pub fn weight_slot(self, direction: Direction, share_attention: bool) -> WeightSlot {
        match (self, direction) {
            (MatchingStrategy::Full, Direction::Forward) => WeightSlot::FullForward,
            (MatchingStrategy::Full, Direction::Backward) => WeightSlot::FullBackward,
            (MatchingStrategy::MaxPool, Direction::Forward) => WeightSlot::MaxPoolForward,
            (MatchingStrategy::MaxPool, Direction::Backward) => WeightSlot::MaxPoolBackward,
            (MatchingStrategy::Attentive, Direction::Backward) if !share_attention => {
                WeightSlot::AttentiveBackward
            }
            (MatchingStrategy::Attentive, _) => WeightSlot::Attentive,
            (MatchingStrategy::MaxAttentive, Direction::Backward) if !share_attention => {
                WeightSlot::MaxAttentiveBackward
            }
            (MatchingStrategy::MaxAttentive, _) => WeightSlot::MaxAttentive,
        }
    }
}

impl fmt::Display for MatchingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary() {
        assert_eq!(Direction::Forward.boundary(5), Some(4));
        assert_eq!(Direction::Backward.boundary(5), Some(0));
        assert_eq!(Direction::Forward.boundary(0), None);
    }

    #[test]
    fn test_shared_attention_slots() {
        for direction in Direction::BOTH {
            assert_eq!(
                MatchingStrategy::Attentive.weight_slot(direction, true),
                WeightSlot::Attentive
            );
            assert_eq!(
                MatchingStrategy::MaxAttentive.weight_slot(direction, true),
                WeightSlot::MaxAttentive
            );
        }
    }

    #[test]
    fn test_dedicated_attention_slots() {
        assert_eq!(
            MatchingStrategy::Attentive.weight_slot(Direction::Backward, false),
            WeightSlot::AttentiveBackward
        );
        assert_eq!(
            MatchingStrategy::MaxAttentive.weight_slot(Direction::Backward, false),
            WeightSlot::MaxAttentiveBackward
        );
        assert_eq!(
            MatchingStrategy::Attentive.weight_slot(Direction::Forward, false),
            WeightSlot::Attentive
        );
    }

    #[test]
    fn test_non_attention_slots_are_distinct() {
        let slots: Vec<usize> = [MatchingStrategy::Full, MatchingStrategy::MaxPool]
            .iter()
            .flat_map(|s| Direction::BOTH.map(|d| s.weight_slot(d, true).index()))
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);
    }
}
