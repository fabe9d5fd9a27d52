use crate::errors::PolicyError;

use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ArmStats {
    pub pulls: u64,
    pub rewards: f64,
}

impl ArmStats {
    pub fn mean(&self) -> f64 {
        if self.pulls == 0 {
            0.0
        } else {
            self.rewards / self.pulls as f64
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PolicyStats {
    pub t: u64,
    pub arms: Vec<ArmStats>,
}

impl PolicyStats {
    /// Checks that the pull counts add up to the round counter.
    pub fn check(&self) -> Result<(), String> {
        let pulls: u64 = self.arms.iter().map(|arm| arm.pulls).sum();
        if pulls == self.t {
            Ok(())
        } else {
            Err(format!("sum of pulls is {pulls} after {} rounds", self.t))
        }
    }
}

/// Round counter and per-arm pulls/rewards shared by every policy.
#[derive(Clone, Debug)]
pub struct History {
    arms: Vec<ArmStats>,
    t: u64,
}

impl History {
    pub fn new(n_arms: usize) -> Result<Self, PolicyError> {
        if n_arms == 0 {
            return Err(PolicyError::NoArmsAvailable);
        }
        Ok(Self {
            arms: vec![ArmStats::default(); n_arms],
            t: 0,
        })
    }

    pub fn n_arms(&self) -> usize {
        self.arms.len()
    }

    pub fn t(&self) -> u64 {
        self.t
    }

    pub fn arms(&self) -> &[ArmStats] {
        &self.arms
    }

    pub fn arm(&self, arm: usize) -> &ArmStats {
        &self.arms[arm]
    }

    pub fn check_arm(&self, arm: usize) -> Result<(), PolicyError> {
        if arm < self.arms.len() {
            Ok(())
        } else {
            Err(PolicyError::ArmOutOfRange {
                arm,
                n_arms: self.arms.len(),
            })
        }
    }

    pub fn record(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError> {
        self.check_arm(arm)?;
        if !reward.is_finite() {
            return Err(PolicyError::NonFiniteReward { arm, reward });
        }
        let stats = &mut self.arms[arm];
        stats.pulls += 1;
        stats.rewards += reward;
        self.t += 1;
        Ok(())
    }

    /// Lowest arm never pulled, if any.
    pub fn first_untried(&self) -> Option<usize> {
        self.arms.iter().position(|arm| arm.pulls == 0)
    }

    pub fn reset(&mut self) {
        self.arms.fill(ArmStats::default());
        self.t = 0;
    }

    pub fn stats(&self) -> PolicyStats {
        PolicyStats {
            t: self.t,
            arms: self.arms.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_counts_consistent() {
        let mut history = History::new(3).unwrap();
        history.record(1, 1.0).unwrap();
        history.record(1, 0.0).unwrap();
        history.record(2, 0.5).unwrap();

        assert_eq!(history.t(), 3);
        assert_eq!(history.arm(1).pulls, 2);
        assert_eq!(history.arm(1).mean(), 0.5);
        assert!(history.stats().check().is_ok());
        assert_eq!(history.first_untried(), Some(0));
    }

    #[test]
    fn record_rejects_out_of_range() {
        let mut history = History::new(2).unwrap();
        assert!(matches!(
            history.record(2, 1.0),
            Err(PolicyError::ArmOutOfRange { arm: 2, n_arms: 2 })
        ));
        assert!(history.record(0, f64::NAN).is_err());
        assert_eq!(history.t(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut history = History::new(2).unwrap();
        history.record(0, 1.0).unwrap();
        history.reset();
        assert_eq!(history.t(), 0);
        assert_eq!(history.arms(), &[ArmStats::default(); 2]);
    }

    #[test]
    fn zero_arms() {
        assert!(History::new(0).is_err());
    }

    #[test]
    fn detects_broken_invariant() {
        let stats = PolicyStats {
            t: 3,
            arms: vec![ArmStats {
                pulls: 2,
                rewards: 1.0,
            }],
        };
        assert!(stats.check().is_err());
    }
}
