//! # BiMPM Matching Layer
//!
//! This crate implements the matching layer of the Bilateral Multi-Perspective
//! Matching model for sentence-pair tasks such as paraphrase identification and
//! natural language inference.
//!
//! Given two contextual encodings P and Q produced by a bidirectional encoder,
//! the layer computes for every timestep of P a matching vector describing how
//! that timestep relates to Q.
//!
//! ## Strategies
//!
//! - **Full**: against Q's boundary timestep (last for forward, first for backward)
//! - **Max-pooling**: best match over every timestep of Q
//! - **Attentive**: against the cosine-attention weighted mean of Q
//! - **Max-attentive**: against Q's most-attended timestep
//!
//! Each strategy runs on the forward and the backward half of the encodings and
//! compares vectors under several learned perspectives:
//!
//! ```text
//! m_k = cos(W_k ∘ v1, W_k ∘ v2)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use bimpm_matching::{MatchingConfig, MatchingLayer};
//! use ndarray::Array3;
//!
//! // hidden_dim = 8 (two halves of 4), 3 perspectives, every strategy enabled
//! let layer = MatchingLayer::with_seed(MatchingConfig::new(8, 3), 7).unwrap();
//!
//! let p = Array3::from_shape_fn((5, 2, 8), |(t, b, k)| (t + b + k) as f64);
//! let q = Array3::from_shape_fn((6, 2, 8), |(t, b, k)| (t * k + b) as f64);
//!
//! let matching = layer.forward(&p, &q).unwrap();
//! assert_eq!(matching.dim(), (5, 2, 24));
//! ```
//!
//! ## Modules
//!
//! - [`matching`]: Similarity functions, strategies, weight bank and layer
//! - [`error`]: Error types
//! - [`utils`]: Configuration files and logging setup

pub mod error;
pub mod matching;
pub mod utils;

// Re-export main types for convenience
pub use error::{MatchingError, Result};
pub use matching::{
    AttentionFallback, Direction, MatchingConfig, MatchingLayer, MatchingStrategy,
    MatchingVector, PerspectiveWeights, WeightSlot,
};
pub use utils::{setup_logging, Config};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::matching::*;
    pub use crate::utils::*;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
