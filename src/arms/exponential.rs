use super::arm::{finite, Arm};

use crate::errors::ArmError;

use rand::RngCore;
use rand_distr::{Distribution, Exp};

/// Exponential arm truncated at `max`. `scale` is the mean of the
/// untruncated distribution; `mean()` reports the mean of the truncated
/// samples, `scale * (1 - exp(-max / scale))`.
#[derive(Debug, Clone)]
pub struct Exponential {
    scale: f64,
    mean: f64,
    max: f64,
    distribution: Exp<f64>,
}

impl Exponential {
    pub fn new(scale: f64, max: f64) -> Result<Self, ArmError> {
        let scale = finite("mean", scale)?;
        if scale <= 0.0 {
            return Err(ArmError::InvalidParameter {
                name: "mean",
                value: scale,
                reason: "must be positive",
            });
        }
        if max.is_nan() || max <= 0.0 {
            return Err(ArmError::InvalidParameter {
                name: "max",
                value: max,
                reason: "must be positive",
            });
        }
        let distribution = Exp::new(1.0 / scale).map_err(|_| ArmError::InvalidParameter {
            name: "mean",
            value: scale,
            reason: "rejected by the exponential distribution",
        })?;

        Ok(Self {
            scale,
            mean: scale * (1.0 - (-max / scale).exp()),
            max,
            distribution,
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl Arm for Exponential {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.distribution.sample(rng).min(self.max)
    }

    fn mean(&self) -> f64 {
        self.mean
    }
}
