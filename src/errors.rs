use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArmError {
    #[error("Invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Arm {arm} out of range for a policy over {n_arms} arms")]
    ArmOutOfRange { arm: usize, n_arms: usize },
    #[error("Reward {reward} observed on arm {arm} is not finite")]
    NonFiniteReward { arm: usize, reward: f64 },
    #[error("Policy needs at least one arm")]
    NoArmsAvailable,
    #[error("Sampling error: {0}")]
    SamplingError(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Debug, Error)]
#[error("Player {player} failed: {source}")]
pub struct PlayerError {
    pub player: usize,
    #[source]
    pub source: PolicyError,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for `{field}`: {message}")]
    InvalidParameter { field: String, message: String },
    #[error("Cannot load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RepetitionError {
    #[error("Invariant violated by `{policy}` at round {round}: {detail}")]
    InvariantViolation {
        policy: String,
        round: u64,
        detail: String,
    },
    #[error("Policy `{policy}` failed at round {round}: {source}")]
    Policy {
        policy: String,
        round: u64,
        #[source]
        source: PolicyError,
    },
    #[error("Cannot build the problem instance: {0}")]
    Problem(#[from] ArmError),
    #[error("Repetition panicked: {0}")]
    Panicked(String),
    #[error("Repetition cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{} repetition(s) failed", .0.len())]
    RepetitionsFailed(Vec<FailedRepetition>),
    #[error("No repetition completed")]
    NoCompletedRepetitions,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FailedRepetition {
    pub environment: usize,
    pub repetition: usize,
    pub reason: String,
}
