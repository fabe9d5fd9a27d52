use super::collision::{CollisionModel, Feedback};

use crate::arms::ProblemSegment;
use crate::errors::{PlayerError, PolicyError};
use crate::policies::Policy;

use rand::RngCore;

/// M players sharing the same arms. Each round runs choose-all, sample,
/// resolve collisions, update-all, in that order. Players see the sensed
/// sample and the collision flag before their update.
#[derive(Debug)]
pub struct MultiPlayerEnvironment {
    players: Vec<Box<dyn Policy>>,
    collision: CollisionModel,
}

impl MultiPlayerEnvironment {
    pub fn new(players: Vec<Box<dyn Policy>>, collision: CollisionModel) -> Result<Self, PolicyError> {
        let n_arms = players
            .first()
            .map(|player| player.n_arms())
            .ok_or_else(|| PolicyError::InvalidParameter("a team needs at least one player".to_string()))?;
        if players.iter().any(|player| player.n_arms() != n_arms) {
            return Err(PolicyError::InvalidParameter(
                "every player must play the same arms".to_string(),
            ));
        }
        Ok(Self { players, collision })
    }

    pub fn players(&self) -> &[Box<dyn Policy>] {
        &self.players
    }

    pub fn n_players(&self) -> usize {
        self.players.len()
    }

    pub fn n_arms(&self) -> usize {
        self.players[0].n_arms()
    }

    pub fn collision(&self) -> CollisionModel {
        self.collision
    }

    pub fn reset(&mut self) {
        self.players.iter_mut().for_each(|player| player.reset());
    }

    pub fn play_round(
        &mut self,
        segment: &ProblemSegment,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Feedback>, PlayerError> {
        let n_arms = segment.arms.len();
        let choices = self
            .players
            .iter_mut()
            .enumerate()
            .map(|(player, policy)| {
                let arm = policy
                    .choose()
                    .map_err(|source| PlayerError { player, source })?;
                if arm >= n_arms {
                    return Err(PlayerError {
                        player,
                        source: PolicyError::ArmOutOfRange { arm, n_arms },
                    });
                }
                Ok(arm)
            })
            .collect::<Result<Vec<usize>, PlayerError>>()?;

        let samples = segment.samples(rng);
        let feedback = self.collision.resolve(&choices, &samples, rng);

        for (player, (policy, f)) in self.players.iter_mut().zip(&feedback).enumerate() {
            policy.observe_sensed(f.arm, f.sensed);
            if f.collision {
                policy.observe_collision(f.arm);
            }
            policy
                .update(f.arm, f.reward)
                .map_err(|source| PlayerError { player, source })?;
        }

        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arms::{ArmFamily, EnvironmentType};
    use crate::multiplayer::SelfishFeedback;
    use crate::policies::{FixedArm, IndexType, PolicyContext, PolicyType};
    use rand::{rngs::SmallRng, SeedableRng};

    const SEED: u64 = 1234;

    fn constant_problem(means: Vec<f64>) -> crate::arms::Problem {
        let mut rng = SmallRng::seed_from_u64(SEED);
        EnvironmentType::Static {
            family: ArmFamily::Constant,
            means,
        }
        .build("env")
        .unwrap()
        .instantiate(10, &mut rng)
        .unwrap()
    }

    fn fixed_players(arms: &[usize], n_arms: usize) -> Vec<Box<dyn Policy>> {
        arms.iter()
            .map(|&arm| Box::new(FixedArm::new(n_arms, arm).unwrap()) as Box<dyn Policy>)
            .collect()
    }

    #[test]
    fn collisions_zero_the_reward() {
        let problem = constant_problem(vec![0.2, 0.5, 0.9]);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut env =
            MultiPlayerEnvironment::new(fixed_players(&[2, 2, 1], 3), CollisionModel::RewardZero)
                .unwrap();

        let feedback = env.play_round(&problem.segments()[0], &mut rng).unwrap();
        let rewards: Vec<f64> = feedback.iter().map(|f| f.reward).collect();
        assert_eq!(rewards, vec![0.0, 0.0, 0.5]);
        assert_eq!(feedback.iter().filter(|f| f.collision).count(), 2);
        for player in env.players() {
            assert_eq!(player.stats().t, 1);
        }
        assert_eq!(env.players()[0].stats().arms[2].rewards, 0.0);
    }

    #[test]
    fn collisions_reach_the_players() {
        let problem = constant_problem(vec![0.2, 0.5, 0.9]);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let rho_rand = PolicyType::RhoRand {
            index: IndexType::EmpiricalMeans,
        };
        let players = (0..2)
            .map(|p| {
                let ctx = PolicyContext::new(3, Some(SEED + p)).with_players(2);
                rho_rand.build(&ctx).unwrap()
            })
            .collect();
        let mut env = MultiPlayerEnvironment::new(players, CollisionModel::RewardZero).unwrap();

        let mut separated = false;
        for _ in 0..50 {
            let feedback = env.play_round(&problem.segments()[0], &mut rng).unwrap();
            separated |= feedback.iter().all(|f| !f.collision);
        }
        assert!(separated);
        assert!(env.players().iter().all(|p| p.stats().check().is_ok()));
    }

    #[test]
    fn sensing_players_ignore_collisions() {
        let problem = constant_problem(vec![0.9, 0.8]);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let selfish = PolicyType::Selfish {
            index: IndexType::EmpiricalMeans,
            feedback: SelfishFeedback::Sensing,
        };
        let players = (0..2)
            .map(|p| selfish.build(&PolicyContext::new(2, Some(SEED + p))).unwrap())
            .collect();
        let mut env = MultiPlayerEnvironment::new(players, CollisionModel::RewardZero).unwrap();

        for round in 0..30 {
            let feedback = env.play_round(&problem.segments()[0], &mut rng).unwrap();
            if round >= 2 {
                // both players sense arm 0 as the best, collided or not
                assert!(feedback.iter().all(|f| f.arm == 0 && f.collision));
                assert!(feedback.iter().all(|f| f.sensed == 0.9 && f.reward == 0.0));
            }
        }
    }

    #[test]
    fn reports_failing_player() {
        #[derive(Debug)]
        struct Broken;

        impl Policy for Broken {
            fn name(&self) -> String {
                "Broken".to_string()
            }
            fn n_arms(&self) -> usize {
                2
            }
            fn choose(&mut self) -> Result<usize, PolicyError> {
                Ok(7)
            }
            fn update(&mut self, _: usize, _: f64) -> Result<(), PolicyError> {
                Ok(())
            }
            fn reset(&mut self) {}
            fn stats(&self) -> crate::policies::PolicyStats {
                crate::policies::PolicyStats {
                    t: 0,
                    arms: vec![],
                }
            }
        }

        let problem = constant_problem(vec![0.2, 0.5]);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut players = fixed_players(&[0], 2);
        players.push(Box::new(Broken));
        let mut env = MultiPlayerEnvironment::new(players, CollisionModel::RewardZero).unwrap();

        let err = env.play_round(&problem.segments()[0], &mut rng).unwrap_err();
        assert_eq!(err.player, 1);
        assert!(matches!(err.source, PolicyError::ArmOutOfRange { arm: 7, .. }));
    }

    #[test]
    fn rejects_mixed_arm_counts() {
        let mut players = fixed_players(&[0], 2);
        players.extend(fixed_players(&[0], 3));
        assert!(MultiPlayerEnvironment::new(players, CollisionModel::RewardZero).is_err());
        assert!(MultiPlayerEnvironment::new(vec![], CollisionModel::RewardZero).is_err());
    }
}
