//! # Equilibrium Solver
//!
//! An approximate Nash equilibrium solver for two-player and multiway games,
//! with the abstraction machinery that keeps it tractable on large hand
//! spaces.
//!
//! ## Features
//!
//! - **Regret-Matching Self-Play**: Regret matching+ with linear averaging by
//!   default; vanilla, discounted and sampled variants by configuration
//! - **Multiway Games**: Pairwise decomposition with per-player aggregation,
//!   optionally solved in parallel
//! - **Realtime Updates**: Warm-started re-solves with a fixed iteration budget
//! - **Exploitability Tracking**: Periodic measurement and solve-until-target
//! - **Abstraction**: Strength bucketing of information sets and earth mover's
//!   distance clustering of equity histograms
//!
//! ## Quick Start
//!
//! ```
//! use equilibrium_solver::cfr::{EquilibriumSolver, PayoffMatrix};
//!
//! // 1. Describe the game as the row player's payoffs
//! let matrix = PayoffMatrix::new(vec![vec![1.0, -1.0], vec![-1.0, 1.0]]).unwrap();
//!
//! // 2. Create a solver for the two seats
//! let solver = EquilibriumSolver::new(["hero", "villain"]).unwrap();
//!
//! // 3. Solve
//! let result = solver.solve_headsup(&matrix, 5_000).unwrap();
//!
//! // 4. Read strategies
//! let hero = result.strategy("hero").unwrap();
//! assert!((hero.probability(0) - 0.5).abs() < 0.05);
//! ```
//!
//! ## Modules
//!
//! - [`cfr`]: Payoff matrices, strategies and the equilibrium solver
//! - [`abstraction`]: Game-tree bucketing and histogram clustering
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//!   equity samples                         hand strengths
//!         │                                      │
//!         ▼                                      ▼
//!  ┌─────────────────────┐  bucket ids  ┌─────────────────────┐
//!  │ HistogramAbstractor │─────────────▶│ GameTreeAbstractor  │
//!  │  - histograms       │              │  - nodes            │
//!  │  - EMD clustering   │              │  - information sets │
//!  └─────────────────────┘              └─────────────────────┘
//!                                                │
//!                                                │ reduced payoff matrices
//!                                                ▼
//!  ┌─────────────────────────────────────────────────────────────────┐
//!  │                       EquilibriumSolver                         │
//!  │  - heads-up self-play     - multiway pairwise decomposition     │
//!  │  - realtime warm start    - exploitability                      │
//!  └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//!                  strategies, value, exploitability
//! ```

#![warn(missing_docs)]

/// Abstraction module.
///
/// Histogram clustering and game-tree bucketing that shrink the game before
/// it reaches the solver.
pub mod abstraction;

/// Equilibrium solver module.
///
/// This is the core module containing the regret-matching self-play loop.
pub mod cfr;

/// Error types shared by all modules.
pub mod error;

// Re-export commonly used types at crate root for convenience
pub use abstraction::{AbstractionConfig, GameTreeAbstractor, Histogram, HistogramAbstractor};
pub use cfr::{
    EquilibriumResult, EquilibriumSolver, MultiwayResult, PayoffMatrix, PlayerPair, SolveStats,
    SolverConfig, Strategy,
};
pub use error::{AbstractionError, ConfigError, SolverError};
