mod collision;
mod environment;
mod mc_top_m;
mod rho_rand;
mod selfish;
mod team;

pub use collision::{CollisionModel, Feedback};
pub use environment::MultiPlayerEnvironment;
pub use mc_top_m::McTopM;
pub use rho_rand::RhoRand;
pub use selfish::{Selfish, SelfishFeedback};
pub use team::TeamType;

use crate::policies::IndexedPolicy;

use rand::{Rng, RngCore};

/// Arm drawn uniformly among the arms `policy` never pulled, if any.
fn explore_untried(policy: &dyn IndexedPolicy, rng: &mut dyn RngCore) -> Option<usize> {
    let untried: Vec<usize> = policy
        .stats()
        .arms
        .iter()
        .enumerate()
        .filter(|(_, arm)| arm.pulls == 0)
        .map(|(k, _)| k)
        .collect();
    if untried.is_empty() {
        None
    } else {
        Some(untried[rng.random_range(0..untried.len())])
    }
}
