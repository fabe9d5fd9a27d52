mod aggregator;
pub mod arm;
mod empirical_means;
mod epsilon_greedy;
mod fixed;
pub mod index;
pub mod kl_ucb;
mod policy;
mod thomson_sampling;
mod ucb;
mod uniform;

pub use aggregator::Aggregator;
pub use arm::{ArmStats, History, PolicyStats};
pub use empirical_means::EmpiricalMeans;
pub use epsilon_greedy::EpsilonGreedy;
pub use fixed::FixedArm;
pub use index::{IndexPolicy, IndexRule, IndexedPolicy};
pub use kl_ucb::KlUcb;
pub use policy::{IndexType, Policy, PolicyContext, PolicyType, WeightDecay};
pub use thomson_sampling::ThomsonSampling;
pub use ucb::Ucb;
pub use uniform::Uniform;
