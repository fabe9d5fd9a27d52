use super::arm::{finite, Arm};

use crate::errors::ArmError;

use rand::RngCore;
use rand_distr::{Distribution, Normal};

/// Gaussian arm whose samples are clamped into `[min, max]`. Use infinite
/// bounds for an unbounded arm.
///
/// `mean()` is `mu` and ignores the clamping, unlike the truncated
/// `Exponential` arm: with `sigma` small against the bounds the two agree.
#[derive(Debug, Clone)]
pub struct Gaussian {
    mu: f64,
    min: f64,
    max: f64,
    distribution: Normal<f64>,
}

impl Gaussian {
    pub fn new(mu: f64, sigma: f64, min: f64, max: f64) -> Result<Self, ArmError> {
        let mu = finite("mu", mu)?;
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(ArmError::InvalidParameter {
                name: "sigma",
                value: sigma,
                reason: "must be positive and finite",
            });
        }
        if min.is_nan() || max.is_nan() || min > max {
            return Err(ArmError::InvalidParameter {
                name: "min",
                value: min,
                reason: "must not exceed max",
            });
        }
        let distribution = Normal::new(mu, sigma).map_err(|_| ArmError::InvalidParameter {
            name: "sigma",
            value: sigma,
            reason: "rejected by the normal distribution",
        })?;

        Ok(Self {
            mu,
            min,
            max,
            distribution,
        })
    }
}

impl Arm for Gaussian {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.distribution.sample(rng).clamp(self.min, self.max)
    }

    fn mean(&self) -> f64 {
        self.mu
    }
}
