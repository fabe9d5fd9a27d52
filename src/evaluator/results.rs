use crate::errors::FailedRepetition;

use serde::Serialize;

/// Statistics over the completed repetitions at one round.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundStatistics {
    pub round: u64,
    pub mean_regret: f64,
    pub regret_std_err: f64,
    pub mean_cumulative_regret: f64,
    pub cumulative_std_err: f64,
    /// 95% Student-t confidence band of the cumulative regret.
    pub cumulative_ci_low: f64,
    pub cumulative_ci_high: f64,
    pub best_arm_rate: f64,
    pub mean_reward: f64,
    pub mean_collisions: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PolicyResults {
    pub label: String,
    pub n_players: usize,
    pub completed: usize,
    pub final_cumulative_regret: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_rewards: Option<Vec<f64>>,
    pub rounds: Vec<RoundStatistics>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnvironmentResults {
    pub environment: usize,
    pub n_arms: usize,
    pub completed: usize,
    pub policies: Vec<PolicyResults>,
    pub teams: Vec<PolicyResults>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationResults {
    pub seed: u64,
    pub horizon: u64,
    pub repetitions: usize,
    pub cancelled: bool,
    pub failed: Vec<FailedRepetition>,
    pub environments: Vec<EnvironmentResults>,
}
