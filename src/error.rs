//! Error types for the solver and the abstraction layer.
//!
//! Every failure here is a structural-input error: it is deterministic given
//! the same inputs and names the precondition that was violated.

use thiserror::Error;

/// Errors that can occur when validating solver or abstraction configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Exploration probability is out of range [0, 1].
    #[error("exploration probability {0} is out of range [0, 1]")]
    InvalidExploration(f64),

    /// Discount factor is out of range [0, 1].
    #[error("{0} discount {1} is out of range [0, 1]")]
    InvalidDiscount(&'static str, f64),

    /// Warm-start weight must be finite and non-negative.
    #[error("warm start weight {0} must be finite and non-negative")]
    InvalidWarmStartWeight(f64),

    /// A count that must be positive was zero.
    #[error("{0} must be positive")]
    ZeroCount(&'static str),

    /// The JSON document could not be parsed.
    #[error("failed to parse config: {0}")]
    ParseError(String),
}

/// Errors raised by [`EquilibriumSolver`](crate::cfr::EquilibriumSolver) and
/// the payoff/strategy types it consumes.
#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("payoff matrix is empty")]
    EmptyMatrix,

    #[error("payoff matrix row {row} has {actual} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("payoff matrix entry ({row}, {col}) is not finite")]
    NonFiniteEntry { row: usize, col: usize },

    #[error("expected {expected} players, got {actual}")]
    InvalidPlayerCount { expected: String, actual: usize },

    #[error("player {0} is listed more than once")]
    DuplicatePlayer(String),

    #[error("player {0} is not configured on this solver")]
    UnknownPlayer(String),

    #[error("no payoff matrix for pair ({0}, {1})")]
    MissingPair(String, String),

    #[error("player {player} has {expected} actions in one subgame but {actual} in another")]
    ActionCountMismatch {
        player: String,
        expected: usize,
        actual: usize,
    },

    #[error("no previous strategy for player {0}")]
    MissingStrategy(String),

    #[error("strategy for player {player} has {actual} actions, matrix has {expected}")]
    StrategyLengthMismatch {
        player: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid strategy: {0}")]
    InvalidStrategy(String),

    #[error("iteration budget must be positive")]
    InvalidIterations,

    #[error("invalid solver config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Errors raised by the game-tree and histogram abstractors.
#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AbstractionError {
    #[error("bucket count must be positive")]
    InvalidBucketCount,

    #[error("histogram bin count must be positive")]
    InvalidBinCount,

    #[error("node {0} already exists")]
    DuplicateNode(String),

    #[error("information set {0} already exists")]
    DuplicateInformationSet(String),

    #[error("unknown node {0}")]
    UnknownNode(String),

    #[error("unknown information set {0}")]
    UnknownInformationSet(String),

    #[error("node {0} is terminal and cannot have children")]
    TerminalParent(String),

    #[error("node {0} is terminal and cannot hold an information set")]
    TerminalNode(String),

    #[error("terminal node {0} requires a payoff")]
    MissingPayoff(String),

    #[error("non-terminal node {0} must not carry a payoff")]
    UnexpectedPayoff(String),

    #[error("node {id} payoff has {actual} entries, expected {expected}")]
    PayoffLengthMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("information set {0} has no actions")]
    NoActions(String),

    #[error("no equity samples for hand {0}")]
    EmptySamples(String),

    #[error("equity sample {index} for hand {hand} is NaN")]
    InvalidSample { hand: String, index: usize },

    #[error("histograms have {0} and {1} bins")]
    BinCountMismatch(usize, usize),

    #[error("no histogram for hand {0}")]
    UnknownHand(String),

    #[error("invalid abstraction config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Result alias for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;

/// Result alias for abstraction operations.
pub type AbstractionResult<T> = Result<T, AbstractionError>;
