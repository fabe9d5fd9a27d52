use super::arm::{History, PolicyStats};
use super::index::argmax;
use super::policy::Policy;

use crate::errors::PolicyError;
use crate::rng::MaybeSeededRng;

use rand_distr::{Beta, Distribution};

/// Posterior pseudo-counts on top of a Beta(1, 1) prior.
#[derive(Clone, Copy, Debug, Default)]
struct ThomsonSamplingArm {
    successes: f64,
    failures: f64,
}

impl ThomsonSamplingArm {
    fn alpha(&self) -> f64 {
        1.0 + self.successes
    }

    fn beta(&self) -> f64 {
        1.0 + self.failures
    }

    fn apply_discount(&mut self, discount: f64) {
        self.successes *= discount;
        self.failures *= discount;
    }

    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, PolicyError> {
        let s = Beta::new(self.alpha(), self.beta())
            .map_err(|e| PolicyError::SamplingError(e.to_string()))?
            .sample(rng);

        Ok(s)
    }

    fn update(&mut self, reward: f64) {
        let reward = reward.clamp(0.0, 1.0);
        self.successes += reward;
        self.failures += 1.0 - reward;
    }
}

/// Beta-Bernoulli posterior sampling. With a discount factor `gamma < 1`, past
/// evidence of every arm is multiplied by `gamma` at each update.
#[derive(Clone, Debug)]
pub struct ThomsonSampling {
    history: History,
    posteriors: Vec<ThomsonSamplingArm>,
    discount: Option<f64>,
    rng: MaybeSeededRng,
}

impl ThomsonSampling {
    pub fn new(n_arms: usize, discount: Option<f64>, seed: Option<u64>) -> Result<Self, PolicyError> {
        if let Some(gamma) = discount.filter(|g| !(g > &0.0 && g <= &1.0)) {
            return Err(PolicyError::InvalidParameter(format!(
                "discount must lie in (0, 1], got {gamma}"
            )));
        }

        Ok(Self {
            history: History::new(n_arms)?,
            posteriors: vec![ThomsonSamplingArm::default(); n_arms],
            discount,
            rng: MaybeSeededRng::new(seed),
        })
    }

    /// Mean of the Beta posterior of `arm`, `None` for an unknown arm.
    pub fn posterior_mean(&self, arm: usize) -> Option<f64> {
        self.posteriors
            .get(arm)
            .map(|posterior| posterior.alpha() / (posterior.alpha() + posterior.beta()))
    }
}

impl Policy for ThomsonSampling {
    fn name(&self) -> String {
        match self.discount {
            Some(gamma) => format!("DiscountedThompson({gamma})"),
            None => "Thompson".to_string(),
        }
    }

    fn n_arms(&self) -> usize {
        self.history.n_arms()
    }

    fn choose(&mut self) -> Result<usize, PolicyError> {
        let rng = self.rng.get_rng();
        let samples = self
            .posteriors
            .iter()
            .map(|posterior| posterior.sample(rng))
            .collect::<Result<Vec<f64>, PolicyError>>()?;

        Ok(argmax(&samples))
    }

    fn update(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError> {
        self.history.record(arm, reward)?;
        if let Some(gamma) = self.discount {
            self.posteriors
                .iter_mut()
                .for_each(|posterior| posterior.apply_discount(gamma));
        }
        self.posteriors[arm].update(reward);
        Ok(())
    }

    fn reset(&mut self) {
        self.history.reset();
        self.posteriors.fill(ThomsonSamplingArm::default());
    }

    fn stats(&self) -> PolicyStats {
        self.history.stats()
    }
}
