use super::explore_untried;

use crate::errors::PolicyError;
use crate::policies::index::arm_with_rank;
use crate::policies::{IndexedPolicy, Policy, PolicyStats};
use crate::rng::MaybeSeededRng;

use rand::Rng;

/// Plays the arm of a random rank among the `n_players` best indexes, and
/// draws a new rank after every collision. Arms never pulled are tried first,
/// in random order.
#[derive(Debug)]
pub struct RhoRand {
    inner: Box<dyn IndexedPolicy>,
    n_players: usize,
    rank: usize,
    rng: MaybeSeededRng,
}

impl RhoRand {
    pub fn new(
        inner: Box<dyn IndexedPolicy>,
        n_players: usize,
        seed: Option<u64>,
    ) -> Result<Self, PolicyError> {
        if n_players == 0 {
            return Err(PolicyError::InvalidParameter(
                "rhoRand needs at least one player".to_string(),
            ));
        }
        let mut policy = Self {
            inner,
            n_players,
            rank: 1,
            rng: MaybeSeededRng::new(seed),
        };
        policy.draw_rank();
        Ok(policy)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    fn draw_rank(&mut self) {
        self.rank = self.rng.get_rng().random_range(1..=self.n_players);
    }
}

impl Policy for RhoRand {
    fn name(&self) -> String {
        format!("rhoRand-{}", self.inner.name())
    }

    fn n_arms(&self) -> usize {
        self.inner.n_arms()
    }

    fn choose(&mut self) -> Result<usize, PolicyError> {
        if let Some(arm) = explore_untried(self.inner.as_ref(), self.rng.get_rng()) {
            return Ok(arm);
        }
        Ok(arm_with_rank(&self.inner.indexes(), self.rank))
    }

    fn update(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError> {
        self.inner.update(arm, reward)
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.draw_rank();
    }

    fn stats(&self) -> PolicyStats {
        self.inner.stats()
    }

    fn observe_collision(&mut self, _arm: usize) {
        self.draw_rank();
    }
}
