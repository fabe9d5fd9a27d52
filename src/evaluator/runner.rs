use super::cancellation::CancellationToken;

use crate::arms::{Environment, Problem, ProblemSegment};
use crate::config::EvaluationConfig;
use crate::errors::{PolicyError, RepetitionError};
use crate::multiplayer::{MultiPlayerEnvironment, TeamType};
use crate::policies::{Policy, PolicyContext};
use crate::rng::{derive_seed, seeded};

use rand::RngCore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

const PROBLEM_STREAM: u64 = 0;
const REWARD_STREAM: u64 = 1;
const POLICY_STREAM: u64 = 2;
const TEAM_REWARD_STREAM: u64 = 3;
const TEAM_POLICY_STREAM: u64 = 4;

const EPS: f64 = 1e-12;

/// Per-round record of one policy (or one team) during one repetition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    pub rewards: Vec<f64>,
    pub regret: Vec<f64>,
    /// Best arm played, or optimal allocation for a team.
    pub best: Vec<bool>,
    pub collisions: Vec<u32>,
    /// Total reward of every player over the repetition.
    pub player_rewards: Vec<f64>,
}

impl Trajectory {
    fn with_capacity(horizon: u64, n_players: usize) -> Self {
        let horizon = horizon as usize;
        Self {
            rewards: Vec::with_capacity(horizon),
            regret: Vec::with_capacity(horizon),
            best: Vec::with_capacity(horizon),
            collisions: Vec::with_capacity(horizon),
            player_rewards: vec![0.0; n_players],
        }
    }

    fn push(&mut self, reward: f64, regret: f64, best: bool, collisions: u32) {
        self.rewards.push(reward);
        self.regret.push(regret);
        self.best.push(best);
        self.collisions.push(collisions);
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// Trajectories of every policy and team over one problem instance.
#[derive(Clone, Debug, PartialEq)]
pub struct RepetitionOutcome {
    pub environment: usize,
    pub repetition: usize,
    pub policies: Vec<Trajectory>,
    pub teams: Vec<Trajectory>,
}

/// Read-only state shared by every repetition of an evaluation.
#[derive(Clone, Debug)]
pub struct RunContext {
    pub config: Arc<EvaluationConfig>,
    pub environments: Arc<Vec<Environment>>,
    pub seed: u64,
    pub cancel: CancellationToken,
    pub abort: CancellationToken,
}

impl RunContext {
    fn stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.abort.is_cancelled()
    }

    fn check_stats(&self, policy: &dyn Policy, label: &str, round: u64) -> Result<(), RepetitionError> {
        if !self.config.check_invariants {
            return Ok(());
        }
        let stats = policy.stats();
        let detail = if stats.t != round + 1 {
            Some(format!("round counter is {} after {} rounds", stats.t, round + 1))
        } else {
            stats.check().err()
        };
        match detail {
            Some(detail) => Err(RepetitionError::InvariantViolation {
                policy: label.to_string(),
                round,
                detail,
            }),
            None => Ok(()),
        }
    }
}

/// Runs every policy and every team of the configuration on one fresh
/// problem instance of `environment`.
pub fn run_repetition(
    ctx: &RunContext,
    environment: usize,
    repetition: usize,
) -> Result<RepetitionOutcome, RepetitionError> {
    let config = &ctx.config;
    let env = &ctx.environments[environment];
    let path = [environment as u64, repetition as u64];

    let mut problem_rng = seeded(ctx.seed, &[path[0], path[1], PROBLEM_STREAM]);
    let problem = env.instantiate(config.horizon, &mut problem_rng)?;
    let n_arms = problem.n_arms();

    let mut policies = Vec::with_capacity(config.policies.len());
    for (p, definition) in config.policies.iter().enumerate() {
        let p = p as u64;
        let policy_ctx = PolicyContext::new(
            n_arms,
            Some(derive_seed(ctx.seed, &[path[0], path[1], POLICY_STREAM, p])),
        );
        let policy = definition
            .build(&policy_ctx)
            .map_err(|source| RepetitionError::Policy {
                policy: format!("policies[{p}]"),
                round: 0,
                source,
            })?;
        let mut rng = seeded(ctx.seed, &[path[0], path[1], REWARD_STREAM, p]);
        policies.push(run_single(ctx, &problem, policy, &mut rng)?);
    }

    let mut teams = Vec::with_capacity(config.teams().len());
    if let Some(mp) = &config.multiplayer {
        for (t, team) in mp.teams.iter().enumerate() {
            let t = t as u64;
            let team_ctx = PolicyContext::new(
                n_arms,
                Some(derive_seed(ctx.seed, &[path[0], path[1], TEAM_POLICY_STREAM, t])),
            )
            .with_players(mp.nb_players);
            let players = team
                .build(&team_ctx)
                .map_err(|source| RepetitionError::Policy {
                    policy: format!("multiplayer.teams[{t}]"),
                    round: 0,
                    source,
                })?;
            let label = TeamType::label(&players);
            let env = MultiPlayerEnvironment::new(players, mp.collision).map_err(|source| {
                RepetitionError::Policy {
                    policy: label,
                    round: 0,
                    source,
                }
            })?;
            let mut rng = seeded(ctx.seed, &[path[0], path[1], TEAM_REWARD_STREAM, t]);
            teams.push(run_team(ctx, &problem, env, &mut rng)?);
        }
    }

    debug!(environment, repetition, "Repetition done");
    Ok(RepetitionOutcome {
        environment,
        repetition,
        policies,
        teams,
    })
}

fn run_single(
    ctx: &RunContext,
    problem: &Problem,
    mut policy: Box<dyn Policy>,
    rng: &mut dyn RngCore,
) -> Result<Trajectory, RepetitionError> {
    let horizon = ctx.config.horizon;
    let label = policy.name();
    let n_arms = problem.n_arms();
    let mut cursor = problem.cursor();
    let mut trajectory = Trajectory::with_capacity(horizon, 1);
    policy.reset();

    for round in 0..horizon {
        if ctx.stopped() {
            return Err(RepetitionError::Cancelled);
        }
        let segment = cursor.at(round);
        let policy_error = |source| RepetitionError::Policy {
            policy: label.clone(),
            round,
            source,
        };

        let arm = policy.choose().map_err(policy_error)?;
        if arm >= n_arms {
            return Err(policy_error(PolicyError::ArmOutOfRange { arm, n_arms }));
        }
        let reward = segment.arms[arm].sample(rng);
        policy.update(arm, reward).map_err(policy_error)?;
        ctx.check_stats(policy.as_ref(), &label, round)?;

        trajectory.player_rewards[0] += reward;
        trajectory.push(reward, segment.best_mean() - reward, segment.is_best(arm), 0);
    }

    Ok(trajectory)
}

/// Distinct arms covering the best means, without collision.
fn is_optimal_allocation(segment: &ProblemSegment, choices: &[usize]) -> bool {
    let distinct: BTreeSet<usize> = choices.iter().copied().collect();
    let n_slots = choices.len().min(segment.arms.len());
    let value: f64 = distinct.iter().map(|&arm| segment.means()[arm]).sum();
    distinct.len() == n_slots && value >= segment.top_sum(choices.len()) - EPS
}

fn run_team(
    ctx: &RunContext,
    problem: &Problem,
    mut env: MultiPlayerEnvironment,
    rng: &mut dyn RngCore,
) -> Result<Trajectory, RepetitionError> {
    let horizon = ctx.config.horizon;
    let n_players = env.n_players();
    let label = TeamType::label(env.players());
    let mut cursor = problem.cursor();
    let mut trajectory = Trajectory::with_capacity(horizon, n_players);
    env.reset();

    for round in 0..horizon {
        if ctx.stopped() {
            return Err(RepetitionError::Cancelled);
        }
        let segment = cursor.at(round);
        let feedback = env
            .play_round(segment, rng)
            .map_err(|err| RepetitionError::Policy {
                policy: format!("{label}#{}", err.player),
                round,
                source: err.source,
            })?;
        for (player, policy) in env.players().iter().enumerate() {
            ctx.check_stats(policy.as_ref(), &format!("{label}#{player}"), round)?;
        }

        let choices: Vec<usize> = feedback.iter().map(|f| f.arm).collect();
        let reward: f64 = feedback.iter().map(|f| f.reward).sum();
        let collisions = feedback.iter().filter(|f| f.collision).count() as u32;
        for (total, f) in trajectory.player_rewards.iter_mut().zip(&feedback) {
            *total += f.reward;
        }
        trajectory.push(
            reward,
            segment.top_sum(n_players) - reward,
            is_optimal_allocation(segment, &choices),
            collisions,
        );
    }

    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arms::{ArmFamily, EnvironmentType};
    use crate::config::{FailurePolicy, MultiPlayerConfig};
    use crate::multiplayer::CollisionModel;
    use crate::policies::{IndexType, PolicyType};

    const SEED: u64 = 1234;

    fn context(policies: Vec<PolicyType>, teams: Vec<TeamType>) -> RunContext {
        let environment = EnvironmentType::Static {
            family: ArmFamily::Constant,
            means: vec![0.1, 0.5, 0.9],
        };
        context_with(environment, policies, teams)
    }

    fn context_with(
        environment: EnvironmentType,
        policies: Vec<PolicyType>,
        teams: Vec<TeamType>,
    ) -> RunContext {
        let config = EvaluationConfig {
            horizon: 50,
            repetitions: 2,
            workers: 1,
            seed: Some(SEED),
            on_failure: FailurePolicy::Skip,
            check_invariants: true,
            environments: vec![environment],
            policies,
            multiplayer: Some(MultiPlayerConfig {
                nb_players: 2,
                collision: CollisionModel::RewardZero,
                teams,
            }),
        };
        let (environments, _) = config.validate().unwrap();
        RunContext {
            config: Arc::new(config),
            environments: Arc::new(environments),
            seed: SEED,
            cancel: CancellationToken::never(),
            abort: CancellationToken::never(),
        }
    }

    #[test]
    fn fixed_arm_regret() {
        let ctx = context(vec![PolicyType::FixedArm { arm: 1 }], vec![]);
        let outcome = run_repetition(&ctx, 0, 0).unwrap();
        let trajectory = &outcome.policies[0];
        assert_eq!(trajectory.len(), 50);
        assert!(trajectory.regret.iter().all(|r| (r - 0.4).abs() < EPS));
        assert!(trajectory.best.iter().all(|b| !b));
        assert!((trajectory.player_rewards[0] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn regret_follows_the_markov_chain() {
        let environment = EnvironmentType::Markovian {
            family: ArmFamily::Constant,
            states: vec![vec![0.2, 0.8], vec![0.8, 0.2]],
            transitions: vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            initial_state: Some(0),
        };
        let ctx = context_with(
            environment,
            vec![PolicyType::FixedArm { arm: 0 }, PolicyType::FixedArm { arm: 1 }],
            vec![],
        );
        let outcome = run_repetition(&ctx, 0, 0).unwrap();

        for (round, (first, second)) in outcome.policies[0]
            .regret
            .iter()
            .zip(&outcome.policies[1].regret)
            .enumerate()
        {
            // the chain flips state every round
            let (expected_first, expected_second) = if round % 2 == 0 {
                (0.6, 0.0)
            } else {
                (0.0, 0.6)
            };
            assert!((first - expected_first).abs() < EPS, "round {round}");
            assert!((second - expected_second).abs() < EPS, "round {round}");
        }
        let best = &outcome.policies[0].best;
        assert!(best.iter().enumerate().all(|(round, &b)| b == (round % 2 == 1)));
        assert!((outcome.policies[0].player_rewards[0] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn bayesian_means_change_between_repetitions() {
        let environment = EnvironmentType::Bayesian {
            family: ArmFamily::Constant,
            n_arms: 3,
            lower: 0.0,
            amplitude: 1.0,
            min_gap: 0.0,
        };
        let ctx = context_with(environment, vec![PolicyType::FixedArm { arm: 0 }], vec![]);

        let first = run_repetition(&ctx, 0, 0).unwrap();
        let second = run_repetition(&ctx, 0, 1).unwrap();
        assert_ne!(first.policies[0].rewards, second.policies[0].rewards);
        assert_eq!(first, run_repetition(&ctx, 0, 0).unwrap());

        // means hold for the whole repetition
        for outcome in [&first, &second] {
            let trajectory = &outcome.policies[0];
            assert!(trajectory.rewards.iter().all(|&r| r == trajectory.rewards[0]));
            assert!(trajectory.regret.iter().all(|&r| r >= 0.0 && r == trajectory.regret[0]));
        }
    }

    #[test]
    fn team_regret_counts_collisions() {
        let team = TeamType::Heterogeneous {
            players: vec![PolicyType::FixedArm { arm: 2 }, PolicyType::FixedArm { arm: 2 }],
        };
        let ctx = context(vec![], vec![team]);
        let outcome = run_repetition(&ctx, 0, 0).unwrap();
        let trajectory = &outcome.teams[0];
        assert!(trajectory.collisions.iter().all(|&c| c == 2));
        assert!(trajectory.regret.iter().all(|r| (r - 1.4).abs() < EPS));
        assert!(trajectory.best.iter().all(|b| !b));
        assert_eq!(trajectory.player_rewards, vec![0.0, 0.0]);
    }

    #[test]
    fn optimal_team_allocation() {
        let team = TeamType::Heterogeneous {
            players: vec![PolicyType::FixedArm { arm: 2 }, PolicyType::FixedArm { arm: 1 }],
        };
        let ctx = context(vec![], vec![team]);
        let trajectory = &run_repetition(&ctx, 0, 0).unwrap().teams[0];
        assert!(trajectory.best.iter().all(|&b| b));
        assert!(trajectory.regret.iter().all(|r| r.abs() < EPS));
        assert!(trajectory.collisions.iter().all(|&c| c == 0));
    }

    #[test]
    fn same_seed_same_outcome() {
        let ctx = context(
            vec![PolicyType::ThompsonSampling { discount: None }],
            vec![TeamType::Homogeneous {
                policy: PolicyType::RhoRand {
                    index: IndexType::Ucb { alpha: 4.0 },
                },
            }],
        );
        assert_eq!(
            run_repetition(&ctx, 0, 1).unwrap(),
            run_repetition(&ctx, 0, 1).unwrap()
        );
    }

    #[test]
    fn cancelled_repetition() {
        let (handle, token) = super::super::cancellation::cancellation();
        let ctx = RunContext {
            cancel: token,
            ..context(vec![PolicyType::Uniform], vec![])
        };
        handle.cancel();
        assert!(matches!(
            run_repetition(&ctx, 0, 0),
            Err(RepetitionError::Cancelled)
        ));
    }

    #[test]
    fn out_of_range_choice_fails_the_repetition() {
        #[derive(Debug)]
        struct Wild(crate::policies::History);

        impl Policy for Wild {
            fn name(&self) -> String {
                "Wild".to_string()
            }
            fn n_arms(&self) -> usize {
                self.0.n_arms()
            }
            fn choose(&mut self) -> Result<usize, PolicyError> {
                Ok(self.0.n_arms())
            }
            fn update(&mut self, arm: usize, reward: f64) -> Result<(), PolicyError> {
                self.0.record(arm, reward)
            }
            fn reset(&mut self) {
                self.0.reset();
            }
            fn stats(&self) -> crate::policies::PolicyStats {
                self.0.stats()
            }
        }

        let ctx = context(vec![PolicyType::Uniform], vec![]);
        let problem = ctx.environments[0]
            .instantiate(50, &mut seeded(SEED, &[0]))
            .unwrap();
        let policy = Box::new(Wild(crate::policies::History::new(3).unwrap()));
        let err = run_single(&ctx, &problem, policy, &mut seeded(SEED, &[1])).unwrap_err();
        assert!(matches!(
            err,
            RepetitionError::Policy {
                round: 0,
                source: PolicyError::ArmOutOfRange { arm: 3, n_arms: 3 },
                ..
            }
        ));
    }

    #[test]
    fn broken_invariant_fails_the_repetition() {
        #[derive(Debug)]
        struct Forgetful(crate::policies::History);

        impl Policy for Forgetful {
            fn name(&self) -> String {
                "Forgetful".to_string()
            }
            fn n_arms(&self) -> usize {
                self.0.n_arms()
            }
            fn choose(&mut self) -> Result<usize, PolicyError> {
                Ok(0)
            }
            fn update(&mut self, _: usize, _: f64) -> Result<(), PolicyError> {
                Ok(())
            }
            fn reset(&mut self) {}
            fn stats(&self) -> crate::policies::PolicyStats {
                self.0.stats()
            }
        }

        let ctx = context(vec![PolicyType::Uniform], vec![]);
        let problem = ctx.environments[0]
            .instantiate(50, &mut seeded(SEED, &[0]))
            .unwrap();
        let policy = Box::new(Forgetful(crate::policies::History::new(3).unwrap()));
        let err = run_single(&ctx, &problem, policy, &mut seeded(SEED, &[1])).unwrap_err();
        assert!(matches!(
            err,
            RepetitionError::InvariantViolation { round: 0, .. }
        ));
        assert!(err.to_string().contains("Forgetful"));
    }
}
