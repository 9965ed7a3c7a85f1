//! Storage for cumulative regrets and strategy sums.
//!
//! One slot per seat of a matrix game. A fresh storage is created for every
//! solve call, so nothing here is shared between calls or threads.

/// Cumulative regrets and strategy sums for each seat.
///
/// - **Regrets**: cumulative regret for each action of a seat
/// - **Strategy sums**: cumulative, weighted per-iteration strategies whose
///   normalisation is the average strategy
#[derive(Debug, Clone)]
pub struct RegretStorage {
    /// Cumulative regrets: seat -> [regret per action]
    regrets: Vec<Vec<f64>>,

    /// Cumulative strategy sums: seat -> [strategy weight per action]
    strategy_sums: Vec<Vec<f64>>,
}

impl RegretStorage {
    /// Create zeroed storage, one seat per entry of `action_counts`.
    pub fn new(action_counts: &[usize]) -> Self {
        Self {
            regrets: action_counts.iter().map(|&n| vec![0.0; n]).collect(),
            strategy_sums: action_counts.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }

    /// Number of seats.
    pub fn num_seats(&self) -> usize {
        self.regrets.len()
    }

    /// Number of actions available to a seat.
    pub fn num_actions(&self, seat: usize) -> usize {
        self.regrets[seat].len()
    }

    /// Current strategy for a seat using regret matching.
    ///
    /// The strategy is proportional to positive regrets. If all regrets are
    /// non-positive, returns a uniform strategy.
    pub fn current_strategy(&self, seat: usize) -> Vec<f64> {
        let regrets = &self.regrets[seat];
        let sum: f64 = regrets.iter().map(|&r| r.max(0.0)).sum();

        if sum > 0.0 {
            regrets.iter().map(|&r| r.max(0.0) / sum).collect()
        } else {
            uniform(regrets.len())
        }
    }

    /// Average strategy for a seat (Nash equilibrium approximation).
    pub fn average_strategy(&self, seat: usize) -> Vec<f64> {
        let sums = &self.strategy_sums[seat];
        let total: f64 = sums.iter().sum();

        if total > 0.0 {
            sums.iter().map(|&s| s / total).collect()
        } else {
            uniform(sums.len())
        }
    }

    /// Add regret deltas (action value minus realised value) to a seat.
    ///
    /// If `use_cfr_plus` is set, cumulative regrets are floored at 0.
    pub fn update_regrets(&mut self, seat: usize, regret_updates: &[f64], use_cfr_plus: bool) {
        let entry = &mut self.regrets[seat];
        debug_assert_eq!(entry.len(), regret_updates.len());

        for (r, &update) in entry.iter_mut().zip(regret_updates) {
            *r += update;
            if use_cfr_plus && *r < 0.0 {
                *r = 0.0;
            }
        }
    }

    /// Accumulate `weight * strategy` into a seat's strategy sum.
    pub fn update_strategy_sum(&mut self, seat: usize, strategy: &[f64], weight: f64) {
        let entry = &mut self.strategy_sums[seat];
        debug_assert_eq!(entry.len(), strategy.len());

        for (s, &prob) in entry.iter_mut().zip(strategy) {
            *s += prob * weight;
        }
    }

    /// Seed a seat from a prior strategy.
    ///
    /// Regrets become `prior * regret_scale`, so regret matching reproduces
    /// the prior on the first iteration, and the strategy sum becomes
    /// `prior * strategy_weight`.
    pub fn seed(&mut self, seat: usize, prior: &[f64], regret_scale: f64, strategy_weight: f64) {
        debug_assert_eq!(self.regrets[seat].len(), prior.len());

        for (r, &p) in self.regrets[seat].iter_mut().zip(prior) {
            *r = p * regret_scale;
        }
        for (s, &p) in self.strategy_sums[seat].iter_mut().zip(prior) {
            *s = p * strategy_weight;
        }
    }

    /// Multiply all regrets by `discount`.
    pub fn discount_regrets(&mut self, discount: f64) {
        for values in self.regrets.iter_mut() {
            for v in values.iter_mut() {
                *v *= discount;
            }
        }
    }

    /// Multiply all strategy sums by `discount`.
    pub fn discount_strategy_sums(&mut self, discount: f64) {
        for values in self.strategy_sums.iter_mut() {
            for v in values.iter_mut() {
                *v *= discount;
            }
        }
    }

    /// Read access to a seat's cumulative regrets.
    pub fn regrets(&self, seat: usize) -> &[f64] {
        &self.regrets[seat]
    }
}

fn uniform(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_strategies_are_uniform() {
        let storage = RegretStorage::new(&[3, 2]);
        assert_eq!(storage.num_seats(), 2);
        assert_eq!(storage.num_actions(0), 3);
        for &p in &storage.current_strategy(0) {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
        assert_eq!(storage.average_strategy(1), vec![0.5, 0.5]);
    }

    #[test]
    fn test_update_shifts_strategy() {
        let mut storage = RegretStorage::new(&[2]);
        // Action 0 worth 10, action 1 worth -5, realised value 2.5.
        storage.update_regrets(0, &[7.5, -7.5], true);
        assert_eq!(storage.current_strategy(0), vec![1.0, 0.0]);
        assert_eq!(storage.regrets(0), &[7.5, 0.0]);
    }

    #[test]
    fn test_cfr_plus_floors_regret_at_zero() {
        let mut storage = RegretStorage::new(&[2]);
        storage.update_regrets(0, &[-10.0, 5.0], true);
        storage.update_regrets(0, &[3.0, -20.0], true);
        assert_eq!(storage.regrets(0), &[3.0, 0.0]);

        let mut vanilla = RegretStorage::new(&[2]);
        vanilla.update_regrets(0, &[-10.0, 5.0], false);
        vanilla.update_regrets(0, &[3.0, -20.0], false);
        assert_eq!(vanilla.regrets(0), &[-7.0, -15.0]);
        // No positive regret left: uniform.
        assert_eq!(vanilla.current_strategy(0), vec![0.5, 0.5]);
    }

    #[test]
    fn test_average_strategy_accumulates_weights() {
        let mut storage = RegretStorage::new(&[2]);
        storage.update_strategy_sum(0, &[1.0, 0.0], 1.0);
        storage.update_strategy_sum(0, &[0.0, 1.0], 3.0);
        assert_eq!(storage.average_strategy(0), vec![0.25, 0.75]);
    }

    #[test]
    fn test_seed_reproduces_prior() {
        let mut storage = RegretStorage::new(&[3]);
        storage.seed(0, &[0.2, 0.3, 0.5], 4.0, 10.0);
        let current = storage.current_strategy(0);
        let average = storage.average_strategy(0);
        for (c, a) in current.iter().zip(&[0.2, 0.3, 0.5]) {
            assert!((c - a).abs() < 1e-12);
        }
        for (c, a) in average.iter().zip(&[0.2, 0.3, 0.5]) {
            assert!((c - a).abs() < 1e-12);
        }
    }

    #[test]
    fn test_discount() {
        let mut storage = RegretStorage::new(&[2]);
        storage.update_regrets(0, &[4.0, 2.0], true);
        storage.update_strategy_sum(0, &[0.5, 0.5], 2.0);
        storage.discount_regrets(0.5);
        assert_eq!(storage.regrets(0), &[2.0, 1.0]);
        storage.discount_strategy_sums(0.0);
        assert_eq!(storage.average_strategy(0), vec![0.5, 0.5]);
    }
}
