//! Error types for the matching layer

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, MatchingError>;

/// Errors raised while building or running a matching layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchingError {
    /// Input tensors have incompatible dimensions
    #[error("Shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        got: String,
    },

    /// An attention row summed to zero and the layer is configured to reject it
    #[error("Degenerate attention at timestep {timestep}, batch {batch}: attention weights sum to zero")]
    DegenerateAttention { timestep: usize, batch: usize },

    /// Invalid layer configuration
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),
}

impl MatchingError {
    pub(crate) fn shape(
        context: &'static str,
        expected: impl std::fmt::Debug,
        got: impl std::fmt::Debug,
    ) -> Self {
        Self::ShapeMismatch {
            context,
            expected: format!("{:?}", expected),
            got: format!("{:?}", got),
        }
    }
}
