use super::arm::{History, PolicyStats};
use super::policy::Policy;

use crate::errors::PolicyError;

/// Always plays the same arm.
#[derive(Debug, Clone)]
pub struct FixedArm {
    history: History,
    arm: usize,
}

impl FixedArm {
    pub fn new(n_arms: usize, arm: usize) -> Result<Self, PolicyError> {
        let history = History::new(n_arms)?;
        history.check_arm(arm)?;
        Ok(Self { history, arm })
    }
}

impl Policy for FixedArm {
    fn name(&self) -> String {
        format!("FixedArm({})", self.arm)
    }

    fn n_arms(&self) -> usize {
        self.history.n_arms()
    }

    fn choose(&mut self) -> Result<usize, PolicyError> {
        Ok(self.arm)
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
