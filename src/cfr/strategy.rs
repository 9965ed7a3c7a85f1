//! Mixed strategies and solve results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cfr::config::SolveStats;
use crate::cfr::matrix::{PlayerId, PlayerPair};
use crate::error::SolverError;

/// Tolerance for a strategy's probabilities to sum to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// A probability distribution over a player's actions, indexed by action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Strategy(Vec<f64>);

impl Strategy {
    /// Validate and wrap a probability vector.
    ///
    /// # Errors
    /// `InvalidStrategy` if the vector is empty, has a negative or non-finite
    /// entry, or does not sum to 1 within [`PROBABILITY_TOLERANCE`].
    pub fn new(probabilities: Vec<f64>) -> Result<Self, SolverError> {
        if probabilities.is_empty() {
            return Err(SolverError::InvalidStrategy("no actions".to_string()));
        }
        if let Some(p) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(SolverError::InvalidStrategy(format!(
                "probability {} is not a finite non-negative number",
                p
            )));
        }
        let total: f64 = probabilities.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(SolverError::InvalidStrategy(format!(
                "probabilities sum to {}",
                total
            )));
        }
        Ok(Self(probabilities))
    }

    /// Uniform distribution over `n` actions.
    pub fn uniform(n: usize) -> Self {
        Self(vec![1.0 / n as f64; n])
    }

    /// Normalise non-negative weights; all-zero weights give a uniform
    /// distribution.
    pub fn from_weights(weights: &[f64]) -> Self {
        let clipped: Vec<f64> = weights.iter().map(|&w| w.max(0.0)).collect();
        let total: f64 = clipped.iter().sum();
        if total > 0.0 {
            Self(clipped.iter().map(|&w| w / total).collect())
        } else {
            Self::uniform(weights.len())
        }
    }

    /// Probability of action `i`.
    pub fn probability(&self, i: usize) -> f64 {
        self.0[i]
    }

    /// All probabilities, by action index.
    pub fn probabilities(&self) -> &[f64] {
        &self.0
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the strategy has no actions. Never true for a constructed
    /// strategy.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of absolute probability differences, in [0, 2].
    pub fn l1_distance(&self, other: &Strategy) -> f64 {
        self.0.iter().zip(&other.0).map(|(a, b)| (a - b).abs()).sum()
    }

    /// Largest absolute probability difference on any action.
    pub fn max_deviation(&self, other: &Strategy) -> f64 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl TryFrom<Vec<f64>> for Strategy {
    type Error = SolverError;

    fn try_from(probabilities: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(probabilities)
    }
}

impl From<Strategy> for Vec<f64> {
    fn from(strategy: Strategy) -> Self {
        strategy.0
    }
}

/// Outcome of a heads-up solve.
///
/// Equality ignores the wall-clock fields of [`SolveStats`], so two solves
/// of the same inputs compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquilibriumResult {
    strategies: BTreeMap<PlayerId, Strategy>,
    value: f64,
    exploitability: f64,
    iterations: u64,
    stats: SolveStats,
}

impl EquilibriumResult {
    pub(crate) fn new(
        strategies: BTreeMap<PlayerId, Strategy>,
        value: f64,
        exploitability: f64,
        iterations: u64,
        stats: SolveStats,
    ) -> Self {
        Self {
            strategies,
            value,
            exploitability,
            iterations,
            stats,
        }
    }

    /// Average strategy of every player, by player id.
    pub fn strategies(&self) -> &BTreeMap<PlayerId, Strategy> {
        &self.strategies
    }

    /// Average strategy of one player.
    pub fn strategy(&self, player: &str) -> Option<&Strategy> {
        self.strategies.get(player)
    }

    /// Expected payoff to the row player under the average strategies.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Largest best-response gain either player has against the other's
    /// average strategy.
    pub fn exploitability(&self) -> f64 {
        self.exploitability
    }

    /// Iterations actually run.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Timing and convergence statistics.
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }
}

impl PartialEq for EquilibriumResult {
    fn eq(&self, other: &Self) -> bool {
        self.strategies == other.strategies
            && self.value == other.value
            && self.exploitability == other.exploitability
            && self.iterations == other.iterations
            && self.stats.iterations == other.stats.iterations
            && self.stats.exploitability == other.stats.exploitability
            && self.stats.exploitability_history == other.stats.exploitability_history
            && self.stats.converged == other.stats.converged
    }
}

/// Outcome of a multiway solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiwayResult {
    aggregate_strategies: BTreeMap<PlayerId, Strategy>,
    #[serde(with = "pair_entries")]
    pairwise: BTreeMap<PlayerPair, EquilibriumResult>,
    exploitability: f64,
    iterations: u64,
}

/// JSON maps need string keys, so pairwise results travel as a list of
/// `(pair, result)` entries.
mod pair_entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::EquilibriumResult;
    use crate::cfr::matrix::PlayerPair;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<PlayerPair, EquilibriumResult>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<PlayerPair, EquilibriumResult>, D::Error> {
        let entries = Vec::<(PlayerPair, EquilibriumResult)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

impl MultiwayResult {
    pub(crate) fn new(
        aggregate_strategies: BTreeMap<PlayerId, Strategy>,
        pairwise: BTreeMap<PlayerPair, EquilibriumResult>,
        exploitability: f64,
        iterations: u64,
    ) -> Self {
        Self {
            aggregate_strategies,
            pairwise,
            exploitability,
            iterations,
        }
    }

    /// One strategy per player, reconciling all of its subgames.
    pub fn aggregate_strategies(&self) -> &BTreeMap<PlayerId, Strategy> {
        &self.aggregate_strategies
    }

    /// Aggregate strategy of one player.
    pub fn aggregate_strategy(&self, player: &str) -> Option<&Strategy> {
        self.aggregate_strategies.get(player)
    }

    /// Per-subgame results.
    pub fn pairwise(&self) -> &BTreeMap<PlayerPair, EquilibriumResult> {
        &self.pairwise
    }

    /// Result for the subgame between `a` and `b`, in either order.
    pub fn subgame(&self, a: &str, b: &str) -> Option<&EquilibriumResult> {
        self.pairwise.get(&PlayerPair::new(a, b))
    }

    /// Worst exploitability across all subgames.
    pub fn exploitability(&self) -> f64 {
        self.exploitability
    }

    /// Iterations run in each subgame.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}
