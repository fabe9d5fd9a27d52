use super::arm::{ArmStats, History, PolicyStats};
use super::policy::Policy;

use crate::errors::PolicyError;

use rand::{Rng, RngCore};
use std::fmt;

/// Scoring rule of an index policy.
pub trait IndexRule: fmt::Debug + Send {
    fn name(&self) -> String;
    /// Index of an arm pulled at least once, at round `t >= 1`. Must not be NaN.
    fn index(&self, arm: &ArmStats, t: u64) -> f64;
}

/// A policy exposing one index per arm, as needed by rank-based multi-player
/// policies.
pub trait IndexedPolicy: Policy {
    /// Current index of every arm, `+inf` for arms never pulled.
    fn indexes(&self) -> Vec<f64>;
    /// Index the rule would give an arm with the statistics `arm` at the
    /// current round.
    fn index_of(&self, arm: &ArmStats) -> f64;
}

/// Position of the maximal value, lowest position on ties.
pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0, |best, (k, value)| {
            if value.total_cmp(&values[best]).is_gt() {
                k
            } else {
                best
            }
        })
}

/// Position of the maximal value, drawn uniformly among ties.
pub fn argmax_random(values: &[f64], rng: &mut dyn RngCore) -> usize {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ties: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|&(_, &value)| value == max)
        .map(|(k, _)| k)
        .collect();
    match ties.len() {
        0 => argmax(values),
        1 => ties[0],
        n => ties[rng.random_range(0..n)],
    }
}

/// Arms ordered by decreasing value, ties by increasing arm.
pub fn ranked(values: &[f64]) -> Vec<usize> {
    let mut arms: Vec<usize> = (0..values.len()).collect();
    arms.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    arms
}

/// Arm holding rank `rank` (1 is the best). Ranks beyond the number of arms
/// map to the worst arm.
pub fn arm_with_rank(values: &[f64], rank: usize) -> usize {
    let arms = ranked(values);
    let position = rank.clamp(1, arms.len()) - 1;
    arms[position]
}

/// The `m` arms with the best values.
pub fn top_m(values: &[f64], m: usize) -> Vec<usize> {
    let mut arms = ranked(values);
    arms.truncate(m.max(1));
    arms
}

/// Index policy: forced exploration of untried arms in increasing order, then
/// the arm of maximal index, lowest arm on ties.
#[derive(Debug, Clone)]
pub struct IndexPolicy<R> {
    rule: R,
    history: History,
}

impl<R: IndexRule> IndexPolicy<R> {
    pub fn new(rule: R, n_arms: usize) -> Result<Self, PolicyError> {
        Ok(Self {
            rule,
            history: History::new(n_arms)?,
        })
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

impl<R: IndexRule> Policy for IndexPolicy<R> {
    fn name(&self) -> String {
        self.rule.name()
    }

    fn n_arms(&self) -> usize {
        self.history.n_arms()
    }

    fn choose(&mut self) -> Result<usize, PolicyError> {
        if let Some(arm) = self.history.first_untried() {
            return Ok(arm);
        }
        Ok(argmax(&self.indexes()))
    }

    fn update(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError> {
        self.history.record(arm, reward)
    }

    fn reset(&mut self) {
        self.history.reset();
    }

    fn stats(&self) -> PolicyStats {
        self.history.stats()
    }
}

impl<R: IndexRule> IndexedPolicy for IndexPolicy<R> {
    fn indexes(&self) -> Vec<f64> {
        self.history
            .arms()
            .iter()
            .map(|arm| self.index_of(arm))
            .collect()
    }

    fn index_of(&self, arm: &ArmStats) -> f64 {
        if arm.pulls == 0 {
            f64::INFINITY
        } else {
            let index = self.rule.index(arm, self.history.t());
            debug_assert!(!index.is_nan(), "{} produced a NaN index", self.rule.name());
            index
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::EmpiricalMeans;
    use rand::{rngs::SmallRng, SeedableRng};

    const SEED: u64 = 1234;

    #[test]
    fn argmax_prefers_lowest_on_ties() {
        assert_eq!(argmax(&[0.2, 0.7, 0.7, 0.1]), 1);
        assert_eq!(argmax(&[f64::INFINITY, 1.0, f64::INFINITY]), 0);
        assert_eq!(argmax(&[0.5]), 0);
    }

    #[test]
    fn argmax_random_stays_on_maxima() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let values = [0.2, 0.7, 0.1, 0.7];
        let picks: Vec<usize> = (0..200)
            .map(|_| argmax_random(&values, &mut rng))
            .collect();
        assert!(picks.iter().all(|&k| k == 1 || k == 3));
        assert!(picks.contains(&1) && picks.contains(&3));
    }

    #[test]
    fn ranking() {
        let values = [0.3, 0.9, 0.3, 0.5];
        assert_eq!(ranked(&values), vec![1, 3, 0, 2]);
        assert_eq!(arm_with_rank(&values, 1), 1);
        assert_eq!(arm_with_rank(&values, 3), 0);
        assert_eq!(arm_with_rank(&values, 10), 2);
        assert_eq!(top_m(&values, 2), vec![1, 3]);
    }

    #[test]
    fn forced_exploration_in_increasing_order() {
        let mut policy = IndexPolicy::new(EmpiricalMeans, 4).unwrap();
        for expected in 0..4 {
            let arm = policy.choose().unwrap();
            assert_eq!(arm, expected);
            policy.update(arm, 1.0 - expected as f64 / 4.0).unwrap();
        }
        // arm 0 got the best reward
        assert_eq!(policy.choose().unwrap(), 0);
    }

    #[test]
    fn untried_arms_have_infinite_index() {
        let mut policy = IndexPolicy::new(EmpiricalMeans, 2).unwrap();
        policy.update(0, 0.5).unwrap();
        assert_eq!(policy.indexes(), vec![0.5, f64::INFINITY]);
    }

    #[test]
    fn index_of_arbitrary_statistics() {
        let policy = IndexPolicy::new(EmpiricalMeans, 2).unwrap();
        let arm = ArmStats {
            pulls: 4,
            rewards: 3.0,
        };
        assert_eq!(policy.index_of(&arm), 0.75);
        assert_eq!(policy.index_of(&ArmStats::default()), f64::INFINITY);
    }
}
