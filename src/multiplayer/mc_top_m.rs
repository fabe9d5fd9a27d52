use super::explore_untried;

use crate::errors::PolicyError;
use crate::policies::index::top_m;
use crate::policies::{IndexedPolicy, Policy, PolicyStats};
use crate::rng::MaybeSeededRng;

use rand::{Rng, RngCore};

fn pick(arms: &[usize], rng: &mut dyn RngCore) -> usize {
    arms[rng.random_range(0..arms.len())]
}

/// Musical chair on the `n_players` arms of best index. A player keeps its
/// arm once it played it without collision, and only leaves it when the arm
/// drops out of its estimated top arms. Arms never pulled are tried first, in
/// random order.
#[derive(Debug)]
pub struct McTopM {
    inner: Box<dyn IndexedPolicy>,
    n_players: usize,
    current: Option<usize>,
    sitting: bool,
    collided: bool,
    last_indexes: Vec<f64>,
    rng: MaybeSeededRng,
}

impl McTopM {
    pub fn new(
        inner: Box<dyn IndexedPolicy>,
        n_players: usize,
        seed: Option<u64>,
    ) -> Result<Self, PolicyError> {
        if n_players == 0 {
            return Err(PolicyError::InvalidParameter(
                "MCTopM needs at least one player".to_string(),
            ));
        }
        Ok(Self {
            inner,
            n_players,
            current: None,
            sitting: false,
            collided: false,
            last_indexes: Vec::new(),
            rng: MaybeSeededRng::new(seed),
        })
    }

    pub fn is_sitting(&self) -> bool {
        self.sitting
    }
}

impl Policy for McTopM {
    fn name(&self) -> String {
        format!("MCTopM-{}", self.inner.name())
    }

    fn n_arms(&self) -> usize {
        self.inner.n_arms()
    }

    fn choose(&mut self) -> Result<usize, PolicyError> {
        let indexes = self.inner.indexes();
        let best = top_m(&indexes, self.n_players);
        let rng = self.rng.get_rng();

        let arm = if let Some(arm) = explore_untried(self.inner.as_ref(), rng) {
            self.sitting = false;
            arm
        } else {
            match self.current {
                None => pick(&best, rng),
                Some(current) if !best.contains(&current) => {
                    let threshold = self.last_indexes[current];
                    let lower: Vec<usize> = best
                        .iter()
                        .copied()
                        .filter(|&k| self.last_indexes[k] <= threshold)
                        .collect();
                    self.sitting = false;
                    if lower.is_empty() {
                        pick(&best, rng)
                    } else {
                        pick(&lower, rng)
                    }
                }
                Some(_) if self.collided && !self.sitting => pick(&best, rng),
                Some(current) => {
                    self.sitting = true;
                    current
                }
            }
        };

        self.current = Some(arm);
        self.collided = false;
        self.last_indexes = indexes;
        Ok(arm)
    }

    fn update(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError> {
        self.inner.update(arm, reward)
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.current = None;
        self.sitting = false;
        self.collided = false;
        self.last_indexes.clear();
    }

    fn stats(&self) -> PolicyStats {
        self.inner.stats()
    }

    fn observe_collision(&mut self, _arm: usize) {
        self.collided = true;
    }
}
