use super::arm::{History, PolicyStats};
use super::policy::{Policy, WeightDecay};

use crate::errors::PolicyError;
use crate::rng::MaybeSeededRng;

use rand::Rng;

/// Meta-policy voting between child policies. Every child sees every
/// observation; the weight of a child grows with the reward earned by the arms
/// it proposed.
#[derive(Debug)]
pub struct Aggregator {
    children: Vec<Box<dyn Policy>>,
    weights: Vec<f64>,
    proposals: Vec<usize>,
    learning_rate: f64,
    decay: WeightDecay,
    history: History,
    rng: MaybeSeededRng,
}

impl Aggregator {
    pub fn new(
        children: Vec<Box<dyn Policy>>,
        learning_rate: f64,
        decay: WeightDecay,
        seed: Option<u64>,
    ) -> Result<Self, PolicyError> {
        let n_arms = children.first().map(|child| child.n_arms()).ok_or_else(|| {
            PolicyError::InvalidParameter("an aggregator needs at least one child".to_string())
        })?;
        if let Some(child) = children.iter().find(|child| child.n_arms() != n_arms) {
            return Err(PolicyError::InvalidParameter(format!(
                "child {} plays {} arms instead of {n_arms}",
                child.name(),
                child.n_arms()
            )));
        }
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(PolicyError::InvalidParameter(format!(
                "learning rate must be finite and positive, got {learning_rate}"
            )));
        }
        decay.validate()?;

        let n_children = children.len();
        Ok(Self {
            children,
            weights: vec![1.0 / n_children as f64; n_children],
            proposals: Vec::with_capacity(n_children),
            learning_rate,
            decay,
            history: History::new(n_arms)?,
            rng: MaybeSeededRng::new(seed),
        })
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn children(&self) -> &[Box<dyn Policy>] {
        &self.children
    }

    fn pick_child(&mut self) -> usize {
        let mut threshold = self.rng.get_rng().random::<f64>();
        for (j, weight) in self.weights.iter().enumerate() {
            if threshold < *weight {
                return j;
            }
            threshold -= weight;
        }
        self.weights.len() - 1
    }

    fn renormalize(&mut self) {
        let total: f64 = self.weights.iter().sum();
        if total.is_finite() && total > 0.0 {
            self.weights.iter_mut().for_each(|w| *w /= total);
        } else {
            let uniform = 1.0 / self.weights.len() as f64;
            self.weights.fill(uniform);
        }
    }
}

impl Policy for Aggregator {
    fn name(&self) -> String {
        let children: Vec<String> = self.children.iter().map(|child| child.name()).collect();
        format!("Aggregator[{}]", children.join(", "))
    }

    fn n_arms(&self) -> usize {
        self.history.n_arms()
    }

    fn choose(&mut self) -> Result<usize, PolicyError> {
        self.proposals = self
            .children
            .iter_mut()
            .map(|child| child.choose())
            .collect::<Result<Vec<_>, _>>()?;

        let j = self.pick_child();
        Ok(self.proposals[j])
    }

    fn update(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError> {
        self.history.record(arm, reward)?;
        for child in self.children.iter_mut() {
            child.update(arm, reward)?;
        }

        if self.proposals.len() == self.weights.len() {
            let gain = (self.learning_rate * reward).exp();
            let decay = self.decay.factor(gain);
            for (weight, proposal) in self.weights.iter_mut().zip(&self.proposals) {
                *weight *= if *proposal == arm { gain } else { decay };
            }
            self.renormalize();
        }
        self.proposals.clear();
        Ok(())
    }

    fn reset(&mut self) {
        self.children.iter_mut().for_each(|child| child.reset());
        let uniform = 1.0 / self.children.len() as f64;
        self.weights.fill(uniform);
        self.proposals.clear();
        self.history.reset();
    }

    fn stats(&self) -> PolicyStats {
        self.history.stats()
    }

    fn observe_collision(&mut self, arm: usize) {
        self.children
            .iter_mut()
            .for_each(|child| child.observe_collision(arm));
    }

    fn observe_sensed(&mut self, arm: usize, sensed: f64) {
        self.children
            .iter_mut()
            .for_each(|child| child.observe_sensed(arm, sensed));
    }
}
