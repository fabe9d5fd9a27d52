use super::arm::Arm;

use crate::errors::ArmError;

use rand::RngCore;
use rand_distr::Distribution;

#[derive(Debug, Clone)]
pub struct Bernoulli {
    probability: f64,
    distribution: rand_distr::Bernoulli,
}

impl Bernoulli {
    pub fn new(probability: f64) -> Result<Self, ArmError> {
        let distribution =
            rand_distr::Bernoulli::new(probability).map_err(|_| ArmError::InvalidParameter {
                name: "probability",
                value: probability,
                reason: "must lie in [0, 1]",
            })?;

        Ok(Self {
            probability,
            distribution,
        })
    }
}

impl Arm for Bernoulli {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        if self.distribution.sample(rng) {
            1.0
        } else {
            0.0
        }
    }

    fn mean(&self) -> f64 {
        self.probability
    }
}
