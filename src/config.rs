//! Sampling strategy settings.

use crate::error::StreamError;
use serde::{Deserialize, Serialize};

/// Tunables for the hybrid grid-sampling strategy.
///
/// The hybrid sampler streams the interval while the observed density stays at or below
/// `density_threshold` events per sample, and falls back to one point query per sample once
/// it is exceeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSamplerConfig {
    /// Events per sample above which point queries are cheaper than streaming.
    ///
    /// Default: 5000
    pub density_threshold: f64,

    /// Events read ahead before the first sample to estimate the initial density.
    ///
    /// Default: 8192
    pub lookahead: usize,

    /// Samples between density re-checks while streaming.
    ///
    /// Default: 64
    pub check_interval: u64,

    /// Samples emitted before the first re-check.
    ///
    /// Default: 16
    pub delay: u64,
}

impl Default for HybridSamplerConfig {
    fn default() -> Self {
        Self {
            density_threshold: 5000.0,
            lookahead: 8192,
            check_interval: 64,
            delay: 16,
        }
    }
}

impl HybridSamplerConfig {
    /// Rejects settings the hybrid sampler cannot run with.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.density_threshold.is_nan() || self.density_threshold <= 0.0 {
            return Err(StreamError::Configuration(format!(
                "density threshold must be positive, got {}",
                self.density_threshold
            )));
        }
        if self.lookahead == 0 {
            return Err(StreamError::Configuration(
                "lookahead buffer must hold at least one event".to_string(),
            ));
        }
        if self.check_interval == 0 {
            return Err(StreamError::Configuration(
                "check interval must be at least one sample".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the grid sampler obtains its samples. Every strategy yields identical samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum SamplerStrategy {
    /// Stream the whole interval once and sample it with the straddle algorithm.
    #[default]
    Stream,
    /// Issue one "last event at or before t" query per sample.
    PointQueries,
    /// Stream while sparse, switch to point queries when dense.
    Hybrid(HybridSamplerConfig),
}
