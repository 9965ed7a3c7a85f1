//! Configuration for the abstraction layer.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration shared by the tree and histogram abstractors.
///
/// # Example
/// ```
/// use equilibrium_solver::abstraction::AbstractionConfig;
///
/// let config = AbstractionConfig::from_json_str(r#"{"num_buckets": 8}"#).unwrap();
/// assert_eq!(config.num_buckets, 8);
/// assert_eq!(config.num_histogram_bins, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbstractionConfig {
    /// Number of strength buckets hands and information sets are mapped to.
    pub num_buckets: usize,

    /// Number of equal-width bins in an equity histogram.
    pub num_histogram_bins: usize,

    /// Upper bound on Lloyd iterations when clustering hands.
    pub max_cluster_iterations: usize,
}

impl Default for AbstractionConfig {
    fn default() -> Self {
        Self {
            num_buckets: 10,
            num_histogram_bins: 10,
            max_cluster_iterations: 100,
        }
    }
}

impl AbstractionConfig {
    /// Create a config with the given bucket count and default resolution.
    pub fn new(num_buckets: usize) -> Self {
        Self {
            num_buckets,
            ..Default::default()
        }
    }

    /// Builder method: set histogram resolution.
    pub fn with_histogram_bins(mut self, bins: usize) -> Self {
        self.num_histogram_bins = bins;
        self
    }

    /// Builder method: set the clustering iteration cap.
    pub fn with_max_cluster_iterations(mut self, iterations: usize) -> Self {
        self.max_cluster_iterations = iterations;
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_buckets == 0 {
            return Err(ConfigError::ZeroCount("num_buckets"));
        }
        if self.num_histogram_bins == 0 {
            return Err(ConfigError::ZeroCount("num_histogram_bins"));
        }
        if self.max_cluster_iterations == 0 {
            return Err(ConfigError::ZeroCount("max_cluster_iterations"));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string. Missing fields take their
    /// default values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
