use super::arm::{History, PolicyStats};
use super::policy::Policy;

use crate::errors::PolicyError;
use crate::rng::MaybeSeededRng;

use rand::Rng;

/// Plays an arm drawn uniformly at random every round.
#[derive(Debug, Clone)]
pub struct Uniform {
    history: History,
    rng: MaybeSeededRng,
}

impl Uniform {
    pub fn new(n_arms: usize, seed: Option<u64>) -> Result<Self, PolicyError> {
        Ok(Self {
            history: History::new(n_arms)?,
            rng: MaybeSeededRng::new(seed),
        })
    }
}

impl Policy for Uniform {
    fn name(&self) -> String {
        "Uniform".to_string()
    }

    fn n_arms(&self) -> usize {
        self.history.n_arms()
    }

    fn choose(&mut self) -> Result<usize, PolicyError> {
        let n_arms = self.history.n_arms();
        Ok(self.rng.get_rng().random_range(0..n_arms))
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
