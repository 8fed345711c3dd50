//! Multi-perspective matching
//!
//! This module contains the numerical building blocks of the matching layer:
//! - Weighted cosine similarity, position-aligned and all-pairs
//! - The four matching strategies (full, max-pooling, attentive, max-attentive)
//! - The perspective weight bank and the layer that composes everything

mod attentive;
mod config;
mod full;
mod layer;
mod max_pool;
mod similarity;
mod strategy;
mod weights;

pub use attentive::{
    attention_scores, attention_totals, attentive_from_scores, attentive_matching, attentive_mean,
    max_attentive_from_scores, max_attentive_vectors, most_attended, AttentionFallback,
    AttentiveMatch, DEGENERATE_ATTENTION_EPS,
};
pub use config::MatchingConfig;
pub use full::full_matching;
pub use layer::{MatchingLayer, MatchingVector};
pub use max_pool::max_pool_matching;
pub use similarity::{
    cosine_pairwise, cosine_similarity, nan_max, weighted_cosine, weighted_cosine_pairwise,
    weighted_cosine_similarity, COSINE_EPS,
};
pub use strategy::{Direction, MatchingStrategy};
pub use weights::{PerspectiveWeights, WeightSlot};
