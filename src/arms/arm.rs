use super::bernoulli::Bernoulli;
use super::constant::Constant;
use super::exponential::Exponential;
use super::gaussian::Gaussian;

use crate::errors::ArmError;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stochastic reward source. The mean is ground truth and is only read by
/// the evaluator for regret bookkeeping.
pub trait Arm: fmt::Debug + Send + Sync {
    fn sample(&self, rng: &mut dyn RngCore) -> f64;
    fn mean(&self) -> f64;
}

pub type Arms = Vec<Box<dyn Arm>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArmFamily {
    Bernoulli,
    Gaussian {
        #[serde(default = "default_sigma")]
        sigma: f64,
        #[serde(default)]
        min: f64,
        #[serde(default = "default_upper")]
        max: f64,
    },
    Exponential {
        #[serde(default = "default_upper")]
        max: f64,
    },
    Constant,
}

fn default_sigma() -> f64 {
    0.05
}

fn default_upper() -> f64 {
    1.0
}

impl ArmFamily {
    pub fn build(&self, mean: f64) -> Result<Box<dyn Arm>, ArmError> {
        Ok(match *self {
            ArmFamily::Bernoulli => Box::new(Bernoulli::new(mean)?),
            ArmFamily::Gaussian { sigma, min, max } => {
                Box::new(Gaussian::new(mean, sigma, min, max)?)
            }
            ArmFamily::Exponential { max } => Box::new(Exponential::new(mean, max)?),
            ArmFamily::Constant => Box::new(Constant::new(mean)?),
        })
    }

    pub fn build_all(&self, means: &[f64]) -> Result<Arms, ArmError> {
        means.iter().map(|&mean| self.build(mean)).collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ArmFamily::Bernoulli => "Bernoulli",
            ArmFamily::Gaussian { .. } => "Gaussian",
            ArmFamily::Exponential { .. } => "Exponential",
            ArmFamily::Constant => "Constant",
        }
    }
}

pub(super) fn finite(name: &'static str, value: f64) -> Result<f64, ArmError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ArmError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    const SEED: u64 = 1234;

    #[test]
    fn build_bernoulli() {
        let arm = ArmFamily::Bernoulli.build(0.3).unwrap();
        assert_eq!(arm.mean(), 0.3);
    }

    #[test]
    fn build_rejects_out_of_domain() {
        assert!(ArmFamily::Bernoulli.build(1.5).is_err());
        assert!(ArmFamily::Bernoulli.build(-0.1).is_err());
        assert!(ArmFamily::Gaussian {
            sigma: 0.0,
            min: 0.0,
            max: 1.0
        }
        .build(0.5)
        .is_err());
        assert!(ArmFamily::Exponential { max: 1.0 }.build(0.0).is_err());
        assert!(ArmFamily::Constant.build(f64::NAN).is_err());
    }

    #[test]
    fn build_all_keeps_order() {
        let arms = ArmFamily::Constant.build_all(&[0.1, 0.2, 0.3]).unwrap();
        let means: Vec<f64> = arms.iter().map(|arm| arm.mean()).collect();
        assert_eq!(means, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn sample_through_trait_object() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let arm = ArmFamily::Constant.build(0.7).unwrap();
        assert_eq!(arm.sample(&mut rng), 0.7);
    }

    #[test]
    fn deserialize_family() {
        let family: ArmFamily = serde_json::from_str(r#"{"type": "gaussian", "sigma": 0.1}"#).unwrap();
        assert_eq!(
            family,
            ArmFamily::Gaussian {
                sigma: 0.1,
                min: 0.0,
                max: 1.0
            }
        );
    }
}
