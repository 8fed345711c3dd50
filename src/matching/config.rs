//! Matching layer configuration

use serde::{Deserialize, Serialize};

use super::attentive::AttentionFallback;
use super::strategy::MatchingStrategy;
use crate::error::{MatchingError, Result};

/// Configuration of a [`MatchingLayer`](super::MatchingLayer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Size of one bidirectional encoding (forward half + backward half)
    pub hidden_dim: usize,
    /// Number of perspectives per weight matrix
    pub perspectives: usize,
    /// Emit full matching vectors
    pub full_match: bool,
    /// Emit max-pooling matching vectors
    pub maxpool_match: bool,
    /// Emit attentive matching vectors
    pub att_match: bool,
    /// Emit max-attentive matching vectors
    pub maxatt_match: bool,
    /// Backward attentive passes reuse the forward weight slots
    pub share_attention_weights: bool,
    /// Handling of attention rows that sum to zero
    pub attention_fallback: AttentionFallback,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 200,
            perspectives: 4,
            full_match: true,
            maxpool_match: true,
            att_match: true,
            maxatt_match: true,
            share_attention_weights: true,
            attention_fallback: AttentionFallback::default(),
        }
    }
}

impl MatchingConfig {
    /// All strategies enabled with the given dimensions
    pub fn new(hidden_dim: usize, perspectives: usize) -> Self {
        Self {
            hidden_dim,
            perspectives,
            ..Default::default()
        }
    }

    /// Select which strategies are emitted
    pub fn with_strategies(mut self, full: bool, maxpool: bool, att: bool, maxatt: bool) -> Self {
        self.full_match = full;
        self.maxpool_match = maxpool;
        self.att_match = att;
        self.maxatt_match = maxatt;
        self
    }

    pub fn with_shared_attention_weights(mut self, shared: bool) -> Self {
        self.share_attention_weights = shared;
        self
    }

    pub fn with_attention_fallback(mut self, fallback: AttentionFallback) -> Self {
        self.attention_fallback = fallback;
        self
    }

    /// Size of one direction's half of the encoding
    pub fn half_dim(&self) -> usize {
        self.hidden_dim / 2
    }

    pub fn is_enabled(&self, strategy: MatchingStrategy) -> bool {
        match strategy {
            MatchingStrategy::Full => self.full_match,
            MatchingStrategy::MaxPool => self.maxpool_match,
            MatchingStrategy::Attentive => self.att_match,
            MatchingStrategy::MaxAttentive => self.maxatt_match,
        }
    }

    /// Enabled strategies in output order
    pub fn enabled_strategies(&self) -> Vec<MatchingStrategy> {
        MatchingStrategy::ORDER
            .into_iter()
            .filter(|&s| self.is_enabled(s))
            .collect()
    }

    /// Width of the concatenated output: two directions per enabled strategy
    pub fn output_dim(&self) -> usize {
        self.perspectives * 2 * self.enabled_strategies().len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.perspectives == 0 {
            return Err(MatchingError::ConfigurationError(
                "perspectives must be positive".to_string(),
            ));
        }
        if self.hidden_dim == 0 || self.hidden_dim % 2 != 0 {
            return Err(MatchingError::ConfigurationError(format!(
                "hidden_dim must be positive and even, got {}",
                self.hidden_dim
            )));
        }
        if self.enabled_strategies().is_empty() {
            return Err(MatchingError::ConfigurationError(
                "at least one matching strategy must be enabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MatchingConfig::default();
        assert_eq!(config.half_dim(), 100);
        assert_eq!(config.output_dim(), 4 * 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_dim_follows_flags() {
        let config = MatchingConfig::new(8, 3).with_strategies(true, false, false, false);
        assert_eq!(config.output_dim(), 6);
        assert_eq!(config.enabled_strategies(), vec![MatchingStrategy::Full]);

        let config = MatchingConfig::new(8, 3).with_strategies(false, true, false, true);
        assert_eq!(
            config.enabled_strategies(),
            vec![MatchingStrategy::MaxPool, MatchingStrategy::MaxAttentive]
        );
    }

    #[test]
    fn test_invalid_configs() {
        assert!(MatchingConfig::new(8, 0).validate().is_err());
        assert!(MatchingConfig::new(7, 2).validate().is_err());
        assert!(MatchingConfig::new(0, 2).validate().is_err());
        assert!(MatchingConfig::new(8, 2)
            .with_strategies(false, false, false, false)
            .validate()
            .is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: MatchingConfig = toml::from_str("perspectives = 7\natt_match = false").unwrap();
        assert_eq!(config.perspectives, 7);
        assert!(!config.att_match);
        assert_eq!(config.hidden_dim, 200);
        assert_eq!(config.attention_fallback, AttentionFallback::UniformMean);
    }

    #[test]
    fn test_fallback_serialization() {
        let config = MatchingConfig::default().with_attention_fallback(AttentionFallback::Error);
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("attention_fallback = \"error\""));
        let parsed: MatchingConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
