//! Equilibrium solver module.
//!
//! This module computes approximate Nash equilibria of zero-sum matrix games
//! by regret-matching self-play, and extends the two-player routine to N
//! players by pairwise decomposition.
//!
//! # Overview
//!
//! Each iteration of the self-play loop:
//! 1. Plays the regret-matched distribution for both players
//! 2. Credits every action with its regret against the opponent's play
//! 3. Adds the iteration's distributions to the running average
//!
//! The average strategies, not the last iterates, converge to equilibrium.
//!
//! # Supported Variants
//!
//! - **Regret matching**: Strategy proportional to positive cumulative regret
//! - **Regret matching+**: Floors cumulative regrets at zero (default)
//! - **Linear averaging**: Iteration `t` has weight `t` in the average (default)
//! - **Sampled self-play**: Regrets updated against a sampled opponent action
//! - **Discounting**: Decays older regrets and strategy sums
//!
//! # Example
//!
//! ```
//! use equilibrium_solver::cfr::{EquilibriumSolver, PayoffMatrix, SolverConfig};
//!
//! let config = SolverConfig::default().with_exploitability_interval(500);
//! let solver = EquilibriumSolver::with_config(["hero", "villain"], config).unwrap();
//!
//! let matrix = PayoffMatrix::new(vec![vec![3.0, -1.0], vec![-2.0, 1.0]]).unwrap();
//! let result = solver.solve_headsup(&matrix, 5_000).unwrap();
//!
//! // Row player mixes 3/7 on its first action at equilibrium.
//! assert!((result.strategy("hero").unwrap().probability(0) - 3.0 / 7.0).abs() < 0.05);
//! assert_eq!(result.stats().exploitability_history.len(), 10);
//! ```
//!
//! # Theory
//!
//! **Regret**: The difference between the value of an action and the value of
//! the current strategy.
//! ```text
//! Regret(a) = Value(a) - Value(current_strategy)
//! ```
//!
//! **Exploitability**: The most either player gains by deviating to a best
//! response against the other's average strategy.
//! ```text
//! Exploitability = max(max_i (A·y)_i - xᵀAy, xᵀAy - min_j (xᵀA)_j)
//! ```
//!
//! # References
//!
//! - Hart, S., Mas-Colell, A. "A Simple Adaptive Procedure Leading to Correlated Equilibrium" (2000)
//! - Tammelin, O. "Solving Large Imperfect Information Games Using CFR+" (2014)
//! - Brown, N., Sandholm, T. "Solving Imperfect-Information Games via Discounted Regret Minimization" (2019)

pub mod config;
pub mod matrix;
pub mod solver;
pub mod storage;
pub mod strategy;

// Re-export main types for convenient access
pub use config::{ExploitabilityPoint, SolveStats, SolverConfig, DEFAULT_SEED};
pub use matrix::{PayoffMatrix, PlayerId, PlayerPair};
pub use solver::{exploitability, EquilibriumSolver};
pub use storage::RegretStorage;
pub use strategy::{EquilibriumResult, MultiwayResult, Strategy, PROBABILITY_TOLERANCE};
