//! Regret-matching self-play solver for matrix games.
//!
//! This module implements the equilibrium loop with several variants:
//! - **Regret matching**: strategy proportional to positive cumulative regret
//! - **Regret matching+**: cumulative regrets floored at zero
//! - **Linear averaging**: later iterations weigh more in the average strategy
//! - **Sampled self-play**: regrets updated against a sampled opponent action
//!
//! Two-player games are solved directly. Multiway games are decomposed into
//! pairwise subgames whose solutions are averaged per player.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::cfr::config::{SolveStats, SolverConfig};
use crate::cfr::matrix::{PayoffMatrix, PlayerId, PlayerPair};
use crate::cfr::storage::RegretStorage;
use crate::cfr::strategy::{EquilibriumResult, MultiwayResult, Strategy};
use crate::error::{SolverError, SolverResult};

const ROW: usize = 0;
const COL: usize = 1;

/// Approximate Nash equilibrium solver over a fixed, ordered player list.
///
/// The solver keeps no state between calls: every operation builds its own
/// regret storage, so repeated calls with the same inputs (and seed) return
/// the same result.
///
/// # Example
/// ```
/// use equilibrium_solver::cfr::{EquilibriumSolver, PayoffMatrix};
///
/// let solver = EquilibriumSolver::new(["hero", "villain"]).unwrap();
/// let pennies = PayoffMatrix::new(vec![vec![1.0, -1.0], vec![-1.0, 1.0]]).unwrap();
/// let result = solver.solve_headsup(&pennies, 5_000).unwrap();
///
/// assert!((result.strategy("hero").unwrap().probability(0) - 0.5).abs() < 0.05);
/// assert!(result.exploitability() < 0.15);
/// ```
#[derive(Debug, Clone)]
pub struct EquilibriumSolver {
    players: Vec<PlayerId>,
    config: SolverConfig,
}

impl EquilibriumSolver {
    /// Create a solver with the default configuration.
    ///
    /// # Errors
    /// `InvalidPlayerCount` for fewer than two players, `DuplicatePlayer` if
    /// an id repeats.
    pub fn new<I, P>(players: I) -> SolverResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerId>,
    {
        Self::with_config(players, SolverConfig::default())
    }

    /// Create a solver with a custom configuration.
    pub fn with_config<I, P>(players: I, config: SolverConfig) -> SolverResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerId>,
    {
        config.validate()?;

        let players: Vec<PlayerId> = players.into_iter().map(Into::into).collect();
        if players.len() < 2 {
            return Err(SolverError::InvalidPlayerCount {
                expected: "at least 2".to_string(),
                actual: players.len(),
            });
        }
        for (i, player) in players.iter().enumerate() {
            if players[..i].contains(player) {
                return Err(SolverError::DuplicatePlayer(player.clone()));
            }
        }

        Ok(Self { players, config })
    }

    /// Configured players, in order.
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve a two-player zero-sum matrix game from a uniform prior.
    ///
    /// Rows belong to the first configured player, columns to the second.
    ///
    /// # Errors
    /// `InvalidPlayerCount` unless exactly two players are configured,
    /// `InvalidIterations` for a zero budget.
    pub fn solve_headsup(
        &self,
        matrix: &PayoffMatrix,
        iterations: u64,
    ) -> SolverResult<EquilibriumResult> {
        self.require_headsup()?;
        if iterations == 0 {
            return Err(SolverError::InvalidIterations);
        }

        Ok(self.run_headsup(&self.players[0], &self.players[1], matrix, iterations))
    }

    /// Solve a two-player game until exploitability reaches `target`.
    ///
    /// Exploitability is measured every `check_interval` iterations; training
    /// stops at the first measurement at or below `target`, or once
    /// `max_iterations` have run. `stats().converged` tells which.
    pub fn solve_headsup_until(
        &self,
        matrix: &PayoffMatrix,
        target: f64,
        check_interval: u64,
        max_iterations: u64,
    ) -> SolverResult<EquilibriumResult> {
        self.require_headsup()?;
        if check_interval == 0 || max_iterations == 0 {
            return Err(SolverError::InvalidIterations);
        }

        let mut play = SelfPlay::new(matrix, &self.config);
        while play.iteration < max_iterations {
            let batch = check_interval.min(max_iterations - play.iteration);
            play.train(batch);

            let exploitability = play.checkpoint();
            if exploitability <= target {
                play.stats.converged = true;
                log::info!(
                    "reached exploitability {:.6} (target {:.6}) after {} iterations",
                    exploitability,
                    target,
                    play.iteration
                );
                break;
            }
        }

        Ok(play.finish(&self.players[0], &self.players[1]))
    }

    /// Solve an N-player game by pairwise decomposition.
    ///
    /// `pairwise_matrices` must hold one matrix for every pair of configured
    /// players; each matrix's rows belong to its key's
    /// [`row_player`](PlayerPair::row_player). Every subgame is solved with
    /// the heads-up routine and each player's strategies are averaged across
    /// its subgames, action by action.
    ///
    /// # Errors
    /// `MissingPair` if a pair is absent, `UnknownPlayer` if a key names a
    /// player the solver does not know, `ActionCountMismatch` if a player has
    /// different action counts in different subgames, `InvalidIterations` for
    /// a zero budget.
    pub fn solve_multiway<S: BuildHasher>(
        &self,
        pairwise_matrices: &HashMap<PlayerPair, PayoffMatrix, S>,
        iterations: u64,
    ) -> SolverResult<MultiwayResult> {
        if iterations == 0 {
            return Err(SolverError::InvalidIterations);
        }

        for pair in pairwise_matrices.keys() {
            for player in [pair.row_player(), pair.col_player()] {
                if !self.players.iter().any(|p| p == player) {
                    return Err(SolverError::UnknownPlayer(player.to_string()));
                }
            }
            if pair.row_player() == pair.col_player() {
                return Err(SolverError::DuplicatePlayer(pair.row_player().to_string()));
            }
        }

        let subgames = self.orient_subgames(pairwise_matrices)?;

        let solve = |(i, j, matrix): &(usize, usize, Cow<'_, PayoffMatrix>)| {
            self.run_headsup(&self.players[*i], &self.players[*j], matrix, iterations)
        };
        let results: Vec<EquilibriumResult> = if self.config.parallel_subgames {
            subgames.par_iter().map(solve).collect()
        } else {
            subgames.iter().map(solve).collect()
        };

        let mut sums: Vec<Vec<f64>> = vec![Vec::new(); self.players.len()];
        let mut counts = vec![0usize; self.players.len()];
        let mut pairwise = BTreeMap::new();
        let mut exploitability: f64 = 0.0;

        for ((i, j, _), result) in subgames.iter().zip(results) {
            for &seat in &[*i, *j] {
                let strategy = result
                    .strategy(&self.players[seat])
                    .map(Strategy::probabilities)
                    .unwrap_or_default();
                if sums[seat].is_empty() {
                    sums[seat] = vec![0.0; strategy.len()];
                }
                for (s, &p) in sums[seat].iter_mut().zip(strategy) {
                    *s += p;
                }
                counts[seat] += 1;
            }
            exploitability = exploitability.max(result.exploitability());
            pairwise.insert(
                PlayerPair::new(self.players[*i].clone(), self.players[*j].clone()),
                result,
            );
        }

        let aggregate_strategies: BTreeMap<PlayerId, Strategy> = self
            .players
            .iter()
            .zip(sums.iter().zip(&counts))
            .map(|(player, (sum, &count))| {
                let mean: Vec<f64> = sum.iter().map(|&s| s / count as f64).collect();
                (player.clone(), Strategy::from_weights(&mean))
            })
            .collect();

        log::debug!(
            "solved {}-player game over {} subgames: worst exploitability {:.6}",
            self.players.len(),
            pairwise.len(),
            exploitability
        );

        Ok(MultiwayResult::new(
            aggregate_strategies,
            pairwise,
            exploitability,
            iterations,
        ))
    }

    /// Re-solve a two-player game warm-started from previous strategies.
    ///
    /// Regrets are seeded so that the first iterate reproduces the previous
    /// strategies, and the average starts from them with a weight of
    /// `config.warm_start_weight` times the weight of the new iterations.
    /// The new average therefore moves only part of the way toward the new
    /// matrix's equilibrium, which keeps repeated live updates smooth.
    /// Exactly `iterations` iterations are run.
    ///
    /// # Errors
    /// `InvalidPlayerCount` unless exactly two players are configured,
    /// `MissingStrategy` / `StrategyLengthMismatch` if a previous strategy is
    /// absent or does not match the matrix, `InvalidIterations` for a zero
    /// budget.
    pub fn approximate_realtime_update(
        &self,
        new_matrix: &PayoffMatrix,
        previous_strategies: &BTreeMap<PlayerId, Strategy>,
        iterations: u64,
    ) -> SolverResult<EquilibriumResult> {
        self.require_headsup()?;
        if iterations == 0 {
            return Err(SolverError::InvalidIterations);
        }

        let row_prior = self.prior_for(&self.players[0], new_matrix.rows(), previous_strategies)?;
        let col_prior = self.prior_for(&self.players[1], new_matrix.cols(), previous_strategies)?;

        let mut play = SelfPlay::new(new_matrix, &self.config);
        play.warm_start(row_prior, col_prior, iterations);
        play.train(iterations);

        Ok(play.finish(&self.players[0], &self.players[1]))
    }

    fn require_headsup(&self) -> SolverResult<()> {
        if self.players.len() != 2 {
            return Err(SolverError::InvalidPlayerCount {
                expected: "2".to_string(),
                actual: self.players.len(),
            });
        }
        Ok(())
    }

    fn prior_for<'a>(
        &self,
        player: &str,
        num_actions: usize,
        previous: &'a BTreeMap<PlayerId, Strategy>,
    ) -> SolverResult<&'a [f64]> {
        let strategy = previous
            .get(player)
            .ok_or_else(|| SolverError::MissingStrategy(player.to_string()))?;
        if strategy.len() != num_actions {
            return Err(SolverError::StrategyLengthMismatch {
                player: player.to_string(),
                expected: num_actions,
                actual: strategy.len(),
            });
        }
        Ok(strategy.probabilities())
    }

    /// Look up every pair in player order and orient its matrix so rows
    /// belong to the earlier player.
    fn orient_subgames<'m, S: BuildHasher>(
        &self,
        pairwise_matrices: &'m HashMap<PlayerPair, PayoffMatrix, S>,
    ) -> SolverResult<Vec<(usize, usize, Cow<'m, PayoffMatrix>)>> {
        let n = self.players.len();
        let mut subgames = Vec::with_capacity(n * (n - 1) / 2);
        let mut action_counts: Vec<Option<usize>> = vec![None; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.players[i], &self.players[j]);
                let (key, matrix) = pairwise_matrices
                    .get_key_value(&PlayerPair::new(a.clone(), b.clone()))
                    .ok_or_else(|| SolverError::MissingPair(a.clone(), b.clone()))?;

                let oriented = if key.row_player() == a {
                    Cow::Borrowed(matrix)
                } else {
                    Cow::Owned(matrix.transpose_negated())
                };

                for (seat, actions) in [(i, oriented.rows()), (j, oriented.cols())] {
                    match action_counts[seat] {
                        None => action_counts[seat] = Some(actions),
                        Some(expected) if expected != actions => {
                            return Err(SolverError::ActionCountMismatch {
                                player: self.players[seat].clone(),
                                expected,
                                actual: actions,
                            });
                        }
                        Some(_) => {}
                    }
                }

                subgames.push((i, j, oriented));
            }
        }

        Ok(subgames)
    }

    fn run_headsup(
        &self,
        row_player: &str,
        col_player: &str,
        matrix: &PayoffMatrix,
        iterations: u64,
    ) -> EquilibriumResult {
        let mut play = SelfPlay::new(matrix, &self.config);
        play.train(iterations);
        play.finish(row_player, col_player)
    }
}

/// Exploitability of a strategy pair in a zero-sum matrix game.
///
/// The larger of the two players' best-response gains against the other's
/// strategy. Zero exactly at a Nash equilibrium.
pub fn exploitability(matrix: &PayoffMatrix, row_strategy: &[f64], col_strategy: &[f64]) -> f64 {
    let value = matrix.value(row_strategy, col_strategy);
    let (_, row_best) = best_response(&matrix.row_values(col_strategy), 1.0);
    let (_, col_best) = best_response(&matrix.col_values(row_strategy), -1.0);
    let row_gain = row_best - value;
    let col_gain = value + col_best;
    row_gain.max(col_gain).max(0.0)
}

/// Index and value of the best action, where `sign` flips minimisation into
/// maximisation. Ties go to the lowest index.
fn best_response(values: &[f64], sign: f64) -> (usize, f64) {
    values
        .iter()
        .map(|&v| v * sign)
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
}

/// One self-play run over a single matrix.
struct SelfPlay<'a> {
    matrix: &'a PayoffMatrix,
    config: &'a SolverConfig,
    storage: RegretStorage,
    iteration: u64,
    rng: StdRng,
    stats: SolveStats,
    started: Instant,
}

impl<'a> SelfPlay<'a> {
    fn new(matrix: &'a PayoffMatrix, config: &'a SolverConfig) -> Self {
        Self {
            matrix,
            config,
            storage: RegretStorage::new(&[matrix.rows(), matrix.cols()]),
            iteration: 0,
            rng: StdRng::seed_from_u64(config.effective_seed()),
            stats: SolveStats::new(),
            started: Instant::now(),
        }
    }

    /// Seed regrets and averages from prior strategies before `planned`
    /// iterations are run.
    fn warm_start(&mut self, row_prior: &[f64], col_prior: &[f64], planned: u64) {
        let planned = planned as f64;
        let new_weight = if self.config.use_linear_averaging {
            planned * (planned + 1.0) / 2.0
        } else {
            planned
        };
        let prior_weight = self.config.warm_start_weight * new_weight;
        let regret_scale = self.matrix.span();

        self.storage.seed(ROW, row_prior, regret_scale, prior_weight);
        self.storage.seed(COL, col_prior, regret_scale, prior_weight);
    }

    fn train(&mut self, iterations: u64) {
        let interval = self.config.exploitability_interval;
        for _ in 0..iterations {
            self.run_iteration();
            if interval > 0 && self.iteration % interval == 0 {
                self.checkpoint();
            }
        }
    }

    /// Measure and record the exploitability of the current averages.
    fn checkpoint(&mut self) -> f64 {
        let already_recorded = self
            .stats
            .exploitability_history
            .last()
            .filter(|point| point.iteration == self.iteration)
            .map(|point| point.exploitability);
        if let Some(exploitability) = already_recorded {
            return exploitability;
        }

        let (row, col) = self.average_strategies();
        let exploitability = exploitability(self.matrix, &row, &col);
        self.stats.record_exploitability(self.iteration, exploitability);
        log::trace!(
            "iteration {}: exploitability {:.6}",
            self.iteration,
            exploitability
        );
        exploitability
    }

    fn run_iteration(&mut self) {
        self.iteration += 1;

        if let Some(discount) = self.config.regret_discount {
            self.storage.discount_regrets(discount);
        }
        if let Some(discount) = self.config.strategy_discount {
            self.storage.discount_strategy_sums(discount);
        }

        let row_strategy = self.storage.current_strategy(ROW);
        let col_strategy = self.storage.current_strategy(COL);

        // Payoffs to each seat, per own action, against the opponent's play.
        let (row_payoffs, col_payoffs) = if self.config.sample_opponents {
            let (col_action, col_weight) = self.sample_action(&col_strategy);
            let (row_action, row_weight) = self.sample_action(&row_strategy);
            let row_payoffs: Vec<f64> = (0..self.matrix.rows())
                .map(|r| self.matrix.get(r, col_action) * col_weight)
                .collect();
            let col_payoffs: Vec<f64> = (0..self.matrix.cols())
                .map(|c| -self.matrix.get(row_action, c) * row_weight)
                .collect();
            (row_payoffs, col_payoffs)
        } else {
            let row_payoffs = self.matrix.row_values(&col_strategy);
            let col_payoffs: Vec<f64> = self
                .matrix
                .col_values(&row_strategy)
                .into_iter()
                .map(|v| -v)
                .collect();
            (row_payoffs, col_payoffs)
        };

        self.update_seat(ROW, &row_strategy, &row_payoffs);
        self.update_seat(COL, &col_strategy, &col_payoffs);
    }

    fn update_seat(&mut self, seat: usize, strategy: &[f64], payoffs: &[f64]) {
        let realised: f64 = strategy.iter().zip(payoffs).map(|(&s, &v)| s * v).sum();
        let regret_updates: Vec<f64> = payoffs.iter().map(|&v| v - realised).collect();
        self.storage
            .update_regrets(seat, &regret_updates, self.config.use_cfr_plus);

        let weight = if self.config.use_linear_averaging {
            self.iteration as f64
        } else {
            1.0
        };
        self.storage.update_strategy_sum(seat, strategy, weight);
    }

    /// Sample an action index, exploring uniformly with probability
    /// `config.exploration`.
    ///
    /// Also returns the importance weight `strategy[i] / q[i]`, where `q` is
    /// the exploration-mixed distribution actually sampled from. Scaling the
    /// sampled payoffs by it keeps them unbiased estimates of the payoffs
    /// against `strategy` itself.
    fn sample_action(&mut self, strategy: &[f64]) -> (usize, f64) {
        let exploration = self.config.exploration;
        let action = if self.rng.gen::<f64>() < exploration {
            self.rng.gen_range(0..strategy.len())
        } else {
            let r: f64 = self.rng.gen();
            let mut cumsum = 0.0;
            // Floating point slack falls through to the last action.
            let mut chosen = strategy.len() - 1;
            for (i, &prob) in strategy.iter().enumerate() {
                cumsum += prob;
                if r < cumsum {
                    chosen = i;
                    break;
                }
            }
            chosen
        };

        let sampled_prob =
            (1.0 - exploration) * strategy[action] + exploration / strategy.len() as f64;
        let weight = if sampled_prob > 0.0 {
            strategy[action] / sampled_prob
        } else {
            0.0
        };
        (action, weight)
    }

    fn average_strategies(&self) -> (Vec<f64>, Vec<f64>) {
        (
            self.storage.average_strategy(ROW),
            self.storage.average_strategy(COL),
        )
    }

    fn finish(mut self, row_player: &str, col_player: &str) -> EquilibriumResult {
        let (row, col) = self.average_strategies();
        let value = self.matrix.value(&row, &col);
        let exploitability = exploitability(self.matrix, &row, &col);

        self.stats.iterations = self.iteration;
        self.stats.exploitability = Some(exploitability);
        self.stats.elapsed_seconds = self.started.elapsed().as_secs_f64();
        self.stats.update_rate();

        log::debug!(
            "solved {}x{} game ({} vs {}) in {} iterations: value {:.6}, exploitability {:.6}",
            self.matrix.rows(),
            self.matrix.cols(),
            row_player,
            col_player,
            self.iteration,
            value,
            exploitability
        );

        let mut strategies = BTreeMap::new();
        strategies.insert(row_player.to_string(), Strategy::from_weights(&row));
        strategies.insert(col_player.to_string(), Strategy::from_weights(&col));

        EquilibriumResult::new(strategies, value, exploitability, self.iteration, self.stats)
    }
}
