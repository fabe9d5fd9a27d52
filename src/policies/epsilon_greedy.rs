use super::arm::{History, PolicyStats};
use super::index::argmax;
use super::policy::Policy;

use crate::errors::PolicyError;
use crate::rng::MaybeSeededRng;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    history: History,
    epsilon: f64,
    rng: MaybeSeededRng,
}

impl EpsilonGreedy {
    pub fn new(n_arms: usize, epsilon: f64, seed: Option<u64>) -> Result<Self, PolicyError> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(PolicyError::InvalidParameter(format!(
                "epsilon must lie in [0, 1], got {epsilon}"
            )));
        }

        Ok(Self {
            history: History::new(n_arms)?,
            epsilon,
            rng: MaybeSeededRng::new(seed),
        })
    }
}

impl Policy for EpsilonGreedy {
    fn name(&self) -> String {
        format!("EpsilonGreedy({})", self.epsilon)
    }

    fn n_arms(&self) -> usize {
        self.history.n_arms()
    }

    fn choose(&mut self) -> Result<usize, PolicyError> {
        if let Some(arm) = self.history.first_untried() {
            return Ok(arm);
        }

        let rng = self.rng.get_rng();
        if rng.random::<f64>() < self.epsilon {
            Ok(rng.random_range(0..self.history.n_arms()))
        } else {
            let means: Vec<f64> = self.history.arms().iter().map(|arm| arm.mean()).collect();
            Ok(argmax(&means))
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: Option<u64> = Some(1234);

    #[test]
    fn invalid_epsilon() {
        assert!(EpsilonGreedy::new(2, 1.5, SEED).is_err());
        assert!(EpsilonGreedy::new(0, 0.1, SEED).is_err());
    }

    #[test]
    fn draw_best() {
        let mut policy = EpsilonGreedy::new(2, 0.0, SEED).unwrap();
        policy.update(0, 0.0).unwrap();
        policy.update(1, 1.0).unwrap();
        for _ in 0..20 {
            assert_eq!(policy.choose().unwrap(), 1);
        }
    }

    #[test]
    fn explores_with_full_epsilon() {
        let mut policy = EpsilonGreedy::new(3, 1.0, SEED).unwrap();
        (0..3).for_each(|arm| policy.update(arm, 0.0).unwrap());
        let mut seen = [false; 3];
        for _ in 0..100 {
            seen[policy.choose().unwrap()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn update() {
        let mut policy = EpsilonGreedy::new(2, 0.1, SEED).unwrap();
        assert!(policy.update(1, 1.0).is_ok());
        assert!(policy.update(2, 1.0).is_err());
        assert_eq!(policy.stats().arms[1].rewards, 1.0);
    }
}
