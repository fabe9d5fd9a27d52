use super::aggregator::Aggregator;
use super::arm::PolicyStats;
use super::empirical_means::EmpiricalMeans;
use super::epsilon_greedy::EpsilonGreedy;
use super::fixed::FixedArm;
use super::index::{IndexPolicy, IndexedPolicy};
use super::kl_ucb::KlUcb;
use super::thomson_sampling::ThomsonSampling;
use super::ucb::Ucb;
use super::uniform::Uniform;

use crate::errors::PolicyError;
use crate::multiplayer::{McTopM, RhoRand, Selfish, SelfishFeedback};
use crate::rng::derive_seed;

use serde::Deserialize;
use std::fmt;

/// A sequential decision rule over a fixed set of arms.
pub trait Policy: Send + fmt::Debug {
    fn name(&self) -> String;
    fn n_arms(&self) -> usize;
    fn choose(&mut self) -> Result<usize, PolicyError>;
    fn update(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError>;
    fn reset(&mut self);
    fn stats(&self) -> PolicyStats;
    /// Called before `update` when the last pull of `arm` collided.
    fn observe_collision(&mut self, _arm: usize) {}
    /// Called before `update` in multi-player rounds with the sample drawn
    /// from `arm`, whatever the collisions made of the reward.
    fn observe_sensed(&mut self, _arm: usize, _sensed: f64) {}
}

/// Everything a policy needs to know about the problem before the first round.
#[derive(Clone, Copy, Debug)]
pub struct PolicyContext {
    pub n_arms: usize,
    pub n_players: usize,
    pub seed: Option<u64>,
}

impl PolicyContext {
    pub fn new(n_arms: usize, seed: Option<u64>) -> Self {
        Self {
            n_arms,
            n_players: 1,
            seed,
        }
    }

    pub fn with_players(self, n_players: usize) -> Self {
        Self { n_players, ..self }
    }

    fn child(&self, index: u64) -> Self {
        Self {
            seed: self.seed.map(|seed| derive_seed(seed, &[index])),
            ..*self
        }
    }
}

fn default_alpha() -> f64 {
    4.0
}

fn default_c() -> f64 {
    1.0
}

fn default_learning_rate() -> f64 {
    0.1
}

/// Index rule underlying the rank-based policies.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexType {
    EmpiricalMeans,
    Ucb {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    KlUcb {
        #[serde(default = "default_c")]
        c: f64,
    },
}

impl IndexType {
    pub fn validate(&self) -> Result<(), PolicyError> {
        match self {
            IndexType::EmpiricalMeans => Ok(()),
            IndexType::Ucb { alpha } => positive("alpha", *alpha),
            IndexType::KlUcb { c } => positive("c", *c),
        }
    }

    pub fn build(&self, n_arms: usize) -> Result<Box<dyn IndexedPolicy>, PolicyError> {
        self.validate()?;
        let policy: Box<dyn IndexedPolicy> = match self {
            IndexType::EmpiricalMeans => Box::new(IndexPolicy::new(EmpiricalMeans, n_arms)?),
            IndexType::Ucb { alpha } => Box::new(IndexPolicy::new(Ucb::new(*alpha), n_arms)?),
            IndexType::KlUcb { c } => Box::new(IndexPolicy::new(KlUcb::new(*c), n_arms)?),
        };
        Ok(policy)
    }

    /// Same as `build`, for single-player use.
    fn build_policy(&self, n_arms: usize) -> Result<Box<dyn Policy>, PolicyError> {
        self.validate()?;
        let policy: Box<dyn Policy> = match self {
            IndexType::EmpiricalMeans => Box::new(IndexPolicy::new(EmpiricalMeans, n_arms)?),
            IndexType::Ucb { alpha } => Box::new(IndexPolicy::new(Ucb::new(*alpha), n_arms)?),
            IndexType::KlUcb { c } => Box::new(IndexPolicy::new(KlUcb::new(*c), n_arms)?),
        };
        Ok(policy)
    }
}

fn positive(name: &str, value: f64) -> Result<(), PolicyError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PolicyError::InvalidParameter(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}

/// How the Aggregator treats children that did not propose the played arm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WeightDecay {
    #[serde(rename = "none")]
    Disabled,
    /// Divide by the gain credited to the proposers.
    #[default]
    Exponential,
    /// Multiply by `1 - rate`.
    Linear { rate: f64 },
}

impl WeightDecay {
    pub fn validate(&self) -> Result<(), PolicyError> {
        match self {
            WeightDecay::Linear { rate } if !(0.0..1.0).contains(rate) => {
                Err(PolicyError::InvalidParameter(format!(
                    "decay rate must lie in [0, 1), got {rate}"
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn factor(&self, gain: f64) -> f64 {
        match self {
            WeightDecay::Disabled => 1.0,
            WeightDecay::Exponential => 1.0 / gain,
            WeightDecay::Linear { rate } => 1.0 - rate,
        }
    }
}

/// Policy definition as read from the configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyType {
    Uniform,
    FixedArm {
        arm: usize,
    },
    EpsilonGreedy {
        epsilon: f64,
    },
    EmpiricalMeans,
    Ucb {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    KlUcb {
        #[serde(default = "default_c")]
        c: f64,
    },
    ThompsonSampling {
        discount: Option<f64>,
    },
    Aggregator {
        #[serde(default = "default_learning_rate")]
        learning_rate: f64,
        #[serde(default)]
        decay: WeightDecay,
        children: Vec<PolicyType>,
    },
    Selfish {
        index: IndexType,
        #[serde(default)]
        feedback: SelfishFeedback,
    },
    RhoRand {
        index: IndexType,
    },
    McTopM {
        index: IndexType,
    },
}

impl PolicyType {
    /// Builds a fresh policy, rejecting parameters outside their domain.
    pub fn build(&self, ctx: &PolicyContext) -> Result<Box<dyn Policy>, PolicyError> {
        let policy: Box<dyn Policy> = match self {
            PolicyType::Uniform => Box::new(Uniform::new(ctx.n_arms, ctx.seed)?),
            PolicyType::FixedArm { arm } => Box::new(FixedArm::new(ctx.n_arms, *arm)?),
            PolicyType::EpsilonGreedy { epsilon } => {
                Box::new(EpsilonGreedy::new(ctx.n_arms, *epsilon, ctx.seed)?)
            }
            PolicyType::EmpiricalMeans => IndexType::EmpiricalMeans.build_policy(ctx.n_arms)?,
            PolicyType::Ucb { alpha } => IndexType::Ucb { alpha: *alpha }.build_policy(ctx.n_arms)?,
            PolicyType::KlUcb { c } => IndexType::KlUcb { c: *c }.build_policy(ctx.n_arms)?,
            PolicyType::ThompsonSampling { discount } => {
                Box::new(ThomsonSampling::new(ctx.n_arms, *discount, ctx.seed)?)
            }
            PolicyType::Aggregator {
                learning_rate,
                decay,
                children,
            } => {
                let children = children
                    .iter()
                    .enumerate()
                    .map(|(j, child)| child.build(&ctx.child(j as u64)))
                    .collect::<Result<Vec<_>, _>>()?;
                Box::new(Aggregator::new(
                    children,
                    *learning_rate,
                    *decay,
                    ctx.child(u64::MAX).seed,
                )?)
            }
            PolicyType::Selfish { index, feedback } => Box::new(Selfish::new(
                index.build(ctx.n_arms)?,
                *feedback,
                ctx.seed,
            )),
            PolicyType::RhoRand { index } => Box::new(RhoRand::new(
                index.build(ctx.n_arms)?,
                ctx.n_players,
                ctx.seed,
            )?),
            PolicyType::McTopM { index } => Box::new(McTopM::new(
                index.build(ctx.n_arms)?,
                ctx.n_players,
                ctx.seed,
            )?),
        };

        Ok(policy)
    }
}
