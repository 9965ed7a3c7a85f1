//! Payoff matrices and player pairs.
//!
//! A [`PayoffMatrix`] holds the row player's payoffs in a zero-sum matrix game;
//! the column player receives the negation. Multiway games are given as one
//! matrix per [`PlayerPair`].

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::SolverError;

/// Identifier of a player as supplied by the caller.
pub type PlayerId = String;

/// A rectangular, non-empty table of finite payoffs for the row player.
///
/// Stored row-major. Construction validates shape and finiteness, and so
/// does deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct PayoffMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl PayoffMatrix {
    /// Build a matrix from nested rows.
    ///
    /// # Errors
    /// `EmptyMatrix` if there are no rows or the first row is empty,
    /// `RaggedMatrix` if a row's length differs from the first row's,
    /// `NonFiniteEntry` for NaN or infinite payoffs.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, SolverError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if cols == 0 {
            return Err(SolverError::EmptyMatrix);
        }

        let mut data = Vec::with_capacity(rows.len() * cols);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(SolverError::RaggedMatrix {
                    row: r,
                    expected: cols,
                    actual: row.len(),
                });
            }
            for (c, &value) in row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(SolverError::NonFiniteEntry { row: r, col: c });
                }
                data.push(value);
            }
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Number of row-player actions.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of column-player actions.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Payoff to the row player when row `r` meets column `c`.
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    /// Row payoffs against a column distribution: `A·y`.
    pub fn row_values(&self, col_strategy: &[f64]) -> Vec<f64> {
        debug_assert_eq!(col_strategy.len(), self.cols);
        self.data
            .chunks_exact(self.cols)
            .map(|row| row.iter().zip(col_strategy).map(|(&a, &y)| a * y).sum())
            .collect()
    }

    /// Column payoffs (to the row player) against a row distribution: `xᵀ·A`.
    pub fn col_values(&self, row_strategy: &[f64]) -> Vec<f64> {
        debug_assert_eq!(row_strategy.len(), self.rows);
        let mut values = vec![0.0; self.cols];
        for (row, &x) in self.data.chunks_exact(self.cols).zip(row_strategy) {
            if x == 0.0 {
                continue;
            }
            for (v, &a) in values.iter_mut().zip(row) {
                *v += x * a;
            }
        }
        values
    }

    /// Expected payoff to the row player: `xᵀ·A·y`.
    pub fn value(&self, row_strategy: &[f64], col_strategy: &[f64]) -> f64 {
        self.row_values(col_strategy)
            .iter()
            .zip(row_strategy)
            .map(|(&v, &x)| v * x)
            .sum()
    }

    /// The same game from the column player's seat: `−Aᵀ`.
    pub fn transpose_negated(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                data.push(-self.get(r, c));
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Difference between the largest and smallest payoff.
    pub fn span(&self) -> f64 {
        let (min, max) = self
            .data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        max - min
    }

    /// Copy out as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks_exact(self.cols).map(<[f64]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<f64>>> for PayoffMatrix {
    type Error = SolverError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}

impl From<PayoffMatrix> for Vec<Vec<f64>> {
    fn from(matrix: PayoffMatrix) -> Self {
        matrix.to_rows()
    }
}

/// An unordered pair of players keying a two-player subgame.
///
/// Equality, hashing and ordering ignore orientation, so `(a, b)` and
/// `(b, a)` address the same subgame. The pair still remembers which player
/// owns the rows of the matrix stored under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerPair {
    row_player: PlayerId,
    col_player: PlayerId,
}

impl PlayerPair {
    /// Pair keyed so that `row_player` owns the matrix rows.
    pub fn new(row_player: impl Into<PlayerId>, col_player: impl Into<PlayerId>) -> Self {
        Self {
            row_player: row_player.into(),
            col_player: col_player.into(),
        }
    }

    /// Player owning the matrix rows.
    pub fn row_player(&self) -> &str {
        &self.row_player
    }

    /// Player owning the matrix columns.
    pub fn col_player(&self) -> &str {
        &self.col_player
    }

    /// Whether `player` is one of the two.
    pub fn contains(&self, player: &str) -> bool {
        self.row_player == player || self.col_player == player
    }

    fn canonical(&self) -> (&str, &str) {
        if self.row_player <= self.col_player {
            (&self.row_player, &self.col_player)
        } else {
            (&self.col_player, &self.row_player)
        }
    }
}

impl PartialEq for PlayerPair {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for PlayerPair {}

impl Hash for PlayerPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl PartialOrd for PlayerPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlayerPair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(&other.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn rps() -> PayoffMatrix {
        PayoffMatrix::new(vec![
            vec![0.0, -1.0, 1.0],
            vec![1.0, 0.0, -1.0],
            vec![-1.0, 1.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_and_ragged() {
        assert_eq!(PayoffMatrix::new(vec![]), Err(SolverError::EmptyMatrix));
        assert_eq!(PayoffMatrix::new(vec![vec![]]), Err(SolverError::EmptyMatrix));
        assert_eq!(
            PayoffMatrix::new(vec![vec![1.0, 2.0], vec![3.0]]),
            Err(SolverError::RaggedMatrix {
                row: 1,
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            PayoffMatrix::new(vec![vec![1.0, f64::NAN]]),
            Err(SolverError::NonFiniteEntry { row: 0, col: 1 })
        );
    }

    #[test]
    fn test_non_square_shape() {
        let m = PayoffMatrix::new(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.get(1, 2), 6.0);
        assert_eq!(m.span(), 5.0);
    }

    #[test]
    fn test_values_under_uniform_play() {
        let m = rps();
        let uniform = vec![1.0 / 3.0; 3];
        for v in m.row_values(&uniform) {
            assert!(v.abs() < 1e-12);
        }
        for v in m.col_values(&uniform) {
            assert!(v.abs() < 1e-12);
        }
        assert!(m.value(&uniform, &uniform).abs() < 1e-12);

        // Rock against pure paper loses 1.
        assert_eq!(m.value(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), -1.0);
    }

    #[test]
    fn test_transpose_negated_swaps_seats() {
        let m = PayoffMatrix::new(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let t = m.transpose_negated();
        assert_eq!(t.rows(), 3);
        assert_eq!(t.cols(), 2);
        for r in 0..m.rows() {
            for c in 0..m.cols() {
                assert_eq!(t.get(c, r), -m.get(r, c));
            }
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let m: PayoffMatrix = serde_json::from_str("[[1.0, -1.0], [-1.0, 1.0]]").unwrap();
        assert_eq!(m.rows(), 2);
        assert!(serde_json::from_str::<PayoffMatrix>("[[1.0, -1.0], [1.0]]").is_err());
        assert_eq!(serde_json::to_string(&m).unwrap(), "[[1.0,-1.0],[-1.0,1.0]]");
    }

    #[test]
    fn test_player_pair_is_unordered() {
        let ab = PlayerPair::new("a", "b");
        let ba = PlayerPair::new("b", "a");
        assert_eq!(ab, ba);
        assert_eq!(ab.cmp(&ba), Ordering::Equal);

        let mut map = FxHashMap::default();
        map.insert(ba, 1);
        let (key, value) = map.get_key_value(&ab).unwrap();
        assert_eq!(*value, 1);
        // The stored key keeps its own orientation.
        assert_eq!(key.row_player(), "b");
        assert!(key.contains("a"));
        assert!(!key.contains("c"));
    }
}
