use crate::errors::{ConfigError, PolicyError};
use crate::policies::{Policy, PolicyContext, PolicyType};
use crate::rng::derive_seed;

use serde::Deserialize;

/// Team definition as read from the configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TeamType {
    /// One definition replicated for every player.
    Homogeneous { policy: PolicyType },
    /// One definition per player.
    Heterogeneous { players: Vec<PolicyType> },
}

impl TeamType {
    pub fn validate(&self, field: &str, n_players: usize) -> Result<(), ConfigError> {
        match self {
            TeamType::Heterogeneous { players } if players.len() != n_players => {
                Err(ConfigError::invalid(
                    format!("{field}.players"),
                    format!("expected {n_players} players, got {}", players.len()),
                ))
            }
            _ => Ok(()),
        }
    }

    pub fn definition(&self, player: usize) -> &PolicyType {
        match self {
            TeamType::Homogeneous { policy } => policy,
            TeamType::Heterogeneous { players } => &players[player],
        }
    }

    /// Builds the players, each with its own random stream.
    pub fn build(&self, ctx: &PolicyContext) -> Result<Vec<Box<dyn Policy>>, PolicyError> {
        (0..ctx.n_players)
            .map(|player| {
                let player_ctx = PolicyContext {
                    seed: ctx.seed.map(|seed| derive_seed(seed, &[player as u64])),
                    ..*ctx
                };
                self.definition(player).build(&player_ctx)
            })
            .collect()
    }

    pub fn label(players: &[Box<dyn Policy>]) -> String {
        let names: Vec<String> = players.iter().map(|player| player.name()).collect();
        match names.first() {
            Some(first) if names.iter().all(|name| name == first) => {
                format!("{} x {first}", names.len())
            }
            _ => names.join(" + "),
        }
    }
}
