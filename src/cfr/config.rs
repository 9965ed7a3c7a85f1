//! Configuration options for the equilibrium solver.
//!
//! This module provides the configuration struct that selects the regret
//! matching variant, averaging scheme and diagnostics of a solve, plus the
//! statistics recorded while one runs.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the equilibrium solver.
///
/// This struct controls various aspects of the self-play loop including:
/// - Which regret matching variant to use (vanilla or regret matching+)
/// - How per-iteration strategies are averaged
/// - Sampling and exploration for the sampled variant
/// - How strongly a warm start anchors a realtime update
///
/// # Example
/// ```
/// use equilibrium_solver::cfr::SolverConfig;
///
/// let config = SolverConfig::default();
/// assert!(config.use_cfr_plus); // regret matching+ is enabled by default
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Floor cumulative regrets at zero after every update (regret matching+).
    ///
    /// Keeps stale negative regret from delaying a switch to an action that
    /// has become good. Enabled by default.
    pub use_cfr_plus: bool,

    /// Weight iteration `t` by `t` when accumulating the average strategy.
    ///
    /// Early iterates are far from equilibrium, so down-weighting them
    /// speeds up convergence of the average.
    pub use_linear_averaging: bool,

    /// Update regrets against a sampled opponent action instead of the full
    /// opponent distribution.
    pub sample_opponents: bool,

    /// Probability of sampling a uniformly random opponent action in sampled
    /// mode. Ignored when `sample_opponents` is false.
    ///
    /// Sampled payoffs are importance-weighted against the exploration mix,
    /// so exploration only changes the variance, not the game being solved.
    pub exploration: f64,

    /// Multiply cumulative regrets by this factor before every iteration.
    ///
    /// Set to `None` to disable discounting.
    pub regret_discount: Option<f64>,

    /// Multiply cumulative strategy sums by this factor before every iteration.
    ///
    /// Set to `None` to disable discounting.
    pub strategy_discount: Option<f64>,

    /// How much of the prior average a realtime update keeps, relative to the
    /// averaging weight of the new iterations. `1.0` weighs both equally,
    /// `0.0` only seeds the regrets.
    pub warm_start_weight: f64,

    /// Record exploitability every this many iterations. `0` disables the
    /// history; the final exploitability is always computed.
    pub exploitability_interval: u64,

    /// Solve multiway subgames on the rayon thread pool.
    pub parallel_subgames: bool,

    /// Random seed for the sampled variant.
    ///
    /// If set, sampled solves are reproducible. If `None`, a fixed default
    /// seed is used so results never depend on process state.
    pub seed: Option<u64>,
}

/// Seed used by sampled solves when the config does not name one.
pub const DEFAULT_SEED: u64 = 0x5eed;

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            use_cfr_plus: true,
            use_linear_averaging: true,
            sample_opponents: false,
            exploration: 0.0,
            regret_discount: None,
            strategy_discount: None,
            warm_start_weight: 1.0,
            exploitability_interval: 0,
            parallel_subgames: false,
            seed: None,
        }
    }
}

impl SolverConfig {
    /// Create a new SolverConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for plain regret matching with uniform averaging.
    pub fn vanilla() -> Self {
        Self {
            use_cfr_plus: false,
            use_linear_averaging: false,
            ..Default::default()
        }
    }

    /// Configuration for sampled self-play with moderate exploration.
    pub fn sampled(seed: u64) -> Self {
        Self {
            sample_opponents: true,
            exploration: 0.1,
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Configuration with discounted regrets and strategy sums.
    ///
    /// # Arguments
    /// * `alpha` - Regret discount factor (typically 0.75 - 0.99)
    /// * `beta` - Strategy discount factor (typically 0.9 - 1.0)
    pub fn discounted(alpha: f64, beta: f64) -> Self {
        Self {
            use_linear_averaging: false,
            regret_discount: Some(alpha),
            strategy_discount: Some(beta),
            ..Default::default()
        }
    }

    /// Builder method: set whether to use regret matching+.
    pub fn with_cfr_plus(mut self, enable: bool) -> Self {
        self.use_cfr_plus = enable;
        self
    }

    /// Builder method: set whether to use linear averaging.
    pub fn with_linear_averaging(mut self, enable: bool) -> Self {
        self.use_linear_averaging = enable;
        self
    }

    /// Builder method: set exploration probability.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration.clamp(0.0, 1.0);
        self
    }

    /// Builder method: set the warm-start weight.
    pub fn with_warm_start_weight(mut self, weight: f64) -> Self {
        self.warm_start_weight = weight;
        self
    }

    /// Builder method: record exploitability every `interval` iterations.
    pub fn with_exploitability_interval(mut self, interval: u64) -> Self {
        self.exploitability_interval = interval;
        self
    }

    /// Builder method: solve multiway subgames in parallel.
    pub fn with_parallel_subgames(mut self, enable: bool) -> Self {
        self.parallel_subgames = enable;
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.exploration) {
            return Err(ConfigError::InvalidExploration(self.exploration));
        }

        if let Some(discount) = self.regret_discount {
            if !(0.0..=1.0).contains(&discount) {
                return Err(ConfigError::InvalidDiscount("regret", discount));
            }
        }

        if let Some(discount) = self.strategy_discount {
            if !(0.0..=1.0).contains(&discount) {
                return Err(ConfigError::InvalidDiscount("strategy", discount));
            }
        }

        if !self.warm_start_weight.is_finite() || self.warm_start_weight < 0.0 {
            return Err(ConfigError::InvalidWarmStartWeight(self.warm_start_weight));
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

    /// The seed sampled solves will use.
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }
}

/// Statistics recorded during one solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    /// Total number of iterations completed.
    pub iterations: u64,

    /// Total time spent iterating (in seconds).
    pub elapsed_seconds: f64,

    /// Iterations per second.
    pub iterations_per_second: f64,

    /// Final exploitability of the average strategies.
    pub exploitability: Option<f64>,

    /// History of exploitability measurements.
    pub exploitability_history: Vec<ExploitabilityPoint>,

    /// Whether a convergence target was reached. Always false for fixed-budget
    /// solves.
    pub converged: bool,
}

/// A single exploitability measurement at a specific iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploitabilityPoint {
    /// Iteration number when this measurement was taken.
    pub iteration: u64,
    /// Exploitability value, in payoff units.
    pub exploitability: f64,
}

impl SolveStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update iterations per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.iterations_per_second = self.iterations as f64 / self.elapsed_seconds;
        }
    }

    /// Record an exploitability measurement.
    pub fn record_exploitability(&mut self, iteration: u64, exploitability: f64) {
        self.exploitability = Some(exploitability);
        self.exploitability_history.push(ExploitabilityPoint {
            iteration,
            exploitability,
        });
    }
}
