use crate::errors::PolicyError;
use crate::policies::index::argmax_random;
use crate::policies::{ArmStats, IndexedPolicy, Policy, PolicyStats};
use crate::rng::MaybeSeededRng;

use serde::Deserialize;

/// Statistic a selfish player feeds to its index rule. With `N` pulls of an
/// arm, `S` the sum of the sensed samples, `S~` the sum of the received
/// rewards and `N~` the number of pulls without collision:
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfishFeedback {
    /// `S~ / N`.
    #[default]
    Reward,
    /// `S / N`, blind to collisions.
    Sensing,
    /// `(N~ / N) * (S / N)`.
    Ubar,
}

/// Single-player index policy breaking ties at random, unaware of the other
/// players.
#[derive(Debug)]
pub struct Selfish {
    inner: Box<dyn IndexedPolicy>,
    feedback: SelfishFeedback,
    sensed: Vec<f64>,
    clean_pulls: Vec<u64>,
    pending: Option<(usize, f64)>,
    collided: bool,
    rng: MaybeSeededRng,
}

impl Selfish {
    pub fn new(
        inner: Box<dyn IndexedPolicy>,
        feedback: SelfishFeedback,
        seed: Option<u64>,
    ) -> Self {
        let n_arms = inner.n_arms();
        Self {
            inner,
            feedback,
            sensed: vec![0.0; n_arms],
            clean_pulls: vec![0; n_arms],
            pending: None,
            collided: false,
            rng: MaybeSeededRng::new(seed),
        }
    }

    pub fn feedback(&self) -> SelfishFeedback {
        self.feedback
    }

    /// Index of every arm under the configured feedback.
    pub fn indexes(&self) -> Vec<f64> {
        if self.feedback == SelfishFeedback::Reward {
            return self.inner.indexes();
        }

        let stats = self.inner.stats();
        stats
            .arms
            .iter()
            .enumerate()
            .map(|(k, arm)| {
                let rewards = match self.feedback {
                    SelfishFeedback::Ubar if arm.pulls > 0 => {
                        self.clean_pulls[k] as f64 * self.sensed[k] / arm.pulls as f64
                    }
                    _ => self.sensed[k],
                };
                self.inner.index_of(&ArmStats {
                    pulls: arm.pulls,
                    rewards,
                })
            })
            .collect()
    }
}

impl Policy for Selfish {
    fn name(&self) -> String {
        match self.feedback {
            SelfishFeedback::Reward => format!("Selfish-{}", self.inner.name()),
            SelfishFeedback::Sensing => format!("Selfish(sensing)-{}", self.inner.name()),
            SelfishFeedback::Ubar => format!("Selfish(ubar)-{}", self.inner.name()),
        }
    }

    fn n_arms(&self) -> usize {
        self.inner.n_arms()
    }

    fn choose(&mut self) -> Result<usize, PolicyError> {
        let indexes = self.indexes();
        Ok(argmax_random(&indexes, self.rng.get_rng()))
    }

    fn update(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError> {
        self.inner.update(arm, reward)?;

        // without a sensing report, the reward is all the player saw
        let sensed = match self.pending.take() {
            Some((sensed_arm, sensed)) if sensed_arm == arm => sensed,
            _ => reward,
        };
        self.sensed[arm] += sensed;
        if !self.collided {
            self.clean_pulls[arm] += 1;
        }
        self.collided = false;
        Ok(())
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.sensed.fill(0.0);
        self.clean_pulls.fill(0);
        self.pending = None;
        self.collided = false;
    }

    fn stats(&self) -> PolicyStats {
        self.inner.stats()
    }

    fn observe_collision(&mut self, _arm: usize) {
        self.collided = true;
    }

    fn observe_sensed(&mut self, arm: usize, sensed: f64) {
        self.pending = Some((arm, sensed));
    }
}
