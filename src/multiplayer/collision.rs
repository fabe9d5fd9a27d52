use crate::errors::ConfigError;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// What a player gets back after a round.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Feedback {
    pub arm: usize,
    pub collision: bool,
    /// Raw sample of the chosen arm, whatever the collision outcome.
    pub sensed: f64,
    pub reward: f64,
}

/// Rule deciding the rewards of players sharing an arm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollisionModel {
    #[default]
    RewardZero,
    RewardLower {
        fraction: f64,
    },
    OnlyOnePlayer,
    RewardUnselectedArm,
    NoCollision,
}

impl CollisionModel {
    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match self {
            CollisionModel::RewardLower { fraction } if !(0.0..=1.0).contains(fraction) => Err(
                ConfigError::invalid(format!("{field}.fraction"), "must lie in [0, 1]"),
            ),
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> String {
        match self {
            CollisionModel::RewardZero => "reward_zero".to_string(),
            CollisionModel::RewardLower { fraction } => format!("reward_lower({fraction})"),
            CollisionModel::OnlyOnePlayer => "only_one_player".to_string(),
            CollisionModel::RewardUnselectedArm => "reward_unselected_arm".to_string(),
            CollisionModel::NoCollision => "no_collision".to_string(),
        }
    }

    /// Turns the choices of every player and the raw samples of every arm into
    /// per-player feedback. Choices must be valid arms of `samples`.
    pub fn resolve(&self, choices: &[usize], samples: &[f64], rng: &mut dyn RngCore) -> Vec<Feedback> {
        let mut counts = vec![0usize; samples.len()];
        choices.iter().for_each(|&arm| counts[arm] += 1);

        let mut feedback: Vec<Feedback> = choices
            .iter()
            .map(|&arm| Feedback {
                arm,
                collision: counts[arm] > 1,
                sensed: samples[arm],
                reward: samples[arm],
            })
            .collect();

        match self {
            CollisionModel::NoCollision => {
                feedback.iter_mut().for_each(|f| f.collision = false);
            }
            CollisionModel::RewardZero => {
                feedback
                    .iter_mut()
                    .filter(|f| f.collision)
                    .for_each(|f| f.reward = 0.0);
            }
            CollisionModel::RewardLower { fraction } => {
                feedback
                    .iter_mut()
                    .filter(|f| f.collision)
                    .for_each(|f| f.reward = f.sensed * (1.0 - fraction));
            }
            CollisionModel::OnlyOnePlayer => {
                for (arm, _) in counts.iter().enumerate().filter(|&(_, &count)| count > 1) {
                    let players: Vec<usize> = (0..choices.len())
                        .filter(|&player| choices[player] == arm)
                        .collect();
                    let winner = players[rng.random_range(0..players.len())];
                    for player in players {
                        let f = &mut feedback[player];
                        if player == winner {
                            f.collision = false;
                        } else {
                            f.reward = 0.0;
                        }
                    }
                }
            }
            CollisionModel::RewardUnselectedArm => {
                let unselected: Vec<usize> = (0..samples.len()).filter(|&k| counts[k] == 0).collect();
                for f in feedback.iter_mut().filter(|f| f.collision) {
                    f.reward = if unselected.is_empty() {
                        0.0
                    } else {
                        samples[unselected[rng.random_range(0..unselected.len())]]
                    };
                }
            }
        }

        feedback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    const SEED: u64 = 1234;
    const SAMPLES: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

    fn resolve(model: CollisionModel, choices: &[usize]) -> Vec<Feedback> {
        let mut rng = SmallRng::seed_from_u64(SEED);
        model.resolve(choices, &SAMPLES, &mut rng)
    }

    fn rewards(feedback: &[Feedback]) -> Vec<f64> {
        feedback.iter().map(|f| f.reward).collect()
    }

    #[test]
    fn without_collision_every_model_pays_the_sample() {
        let models = [
            CollisionModel::RewardZero,
            CollisionModel::RewardLower { fraction: 0.5 },
            CollisionModel::OnlyOnePlayer,
            CollisionModel::RewardUnselectedArm,
            CollisionModel::NoCollision,
        ];
        for model in models {
            let feedback = resolve(model, &[0, 2, 3]);
            assert_eq!(rewards(&feedback), vec![0.2, 0.6, 0.8]);
            assert!(feedback.iter().all(|f| !f.collision));
        }
    }

    #[test]
    fn reward_zero() {
        let feedback = resolve(CollisionModel::RewardZero, &[1, 1, 3]);
        assert_eq!(rewards(&feedback), vec![0.0, 0.0, 0.8]);
        assert_eq!(feedback[0].sensed, 0.4);
        assert!(feedback[0].collision && feedback[1].collision && !feedback[2].collision);

        let paid: f64 = rewards(&feedback).iter().sum();
        assert!(paid <= 0.4 + 0.8);
    }

    #[test]
    fn reward_lower() {
        let feedback = resolve(CollisionModel::RewardLower { fraction: 0.25 }, &[2, 2]);
        assert!(feedback.iter().all(|f| (f.reward - 0.45).abs() < 1e-12));
    }

    #[test]
    fn only_one_player() {
        let feedback = resolve(CollisionModel::OnlyOnePlayer, &[1, 1, 1, 0]);
        let winners: Vec<&Feedback> = feedback[..3].iter().filter(|f| f.reward > 0.0).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].reward, 0.4);
        assert!(!winners[0].collision);
        assert_eq!(feedback.iter().filter(|f| f.collision).count(), 2);
        assert_eq!(feedback[3].reward, 0.2);
    }

    #[test]
    fn reward_unselected_arm() {
        let feedback = resolve(CollisionModel::RewardUnselectedArm, &[0, 0]);
        for f in &feedback {
            assert!(f.collision);
            assert!([0.4, 0.6, 0.8].contains(&f.reward));
        }
    }

    #[test]
    fn reward_unselected_arm_when_every_arm_is_taken() {
        let feedback = resolve(CollisionModel::RewardUnselectedArm, &[0, 1, 2, 3, 3]);
        assert_eq!(rewards(&feedback), vec![0.2, 0.4, 0.6, 0.0, 0.0]);
    }

    #[test]
    fn no_collision() {
        let feedback = resolve(CollisionModel::NoCollision, &[3, 3, 3]);
        assert_eq!(rewards(&feedback), vec![0.8; 3]);
        assert!(feedback.iter().all(|f| !f.collision));
    }

    #[test]
    fn total_for_more_players_than_arms() {
        let choices: Vec<usize> = (0..10).map(|p| p % 4).collect();
        let feedback = resolve(CollisionModel::RewardZero, &choices);
        assert_eq!(feedback.len(), 10);
        assert!(feedback.iter().all(|f| f.collision && f.reward == 0.0));
    }

    #[test]
    fn invalid_fraction() {
        assert!(CollisionModel::RewardLower { fraction: 1.5 }
            .validate("multiplayer.collision")
            .is_err());
        assert!(CollisionModel::RewardZero.validate("multiplayer.collision").is_ok());
    }
}
