use crate::arms::{Environment, EnvironmentType};
use crate::errors::ConfigError;
use crate::multiplayer::{CollisionModel, TeamType};
use crate::policies::{Policy, PolicyContext, PolicyType};

use config::{Config, Environment as EnvSource, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn default_check_invariants() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// What to do with the statistics when some repetitions fail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Reduce over the successful repetitions and report the failed ones.
    #[default]
    Skip,
    /// Fail the whole evaluation.
    Abort,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MultiPlayerConfig {
    pub nb_players: usize,
    #[serde(default)]
    pub collision: CollisionModel,
    pub teams: Vec<TeamType>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EvaluationConfig {
    pub horizon: u64,
    pub repetitions: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Base seed; drawn at random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    #[serde(default = "default_check_invariants")]
    pub check_invariants: bool,
    pub environments: Vec<EnvironmentType>,
    #[serde(default)]
    pub policies: Vec<PolicyType>,
    #[serde(default)]
    pub multiplayer: Option<MultiPlayerConfig>,
}

/// Labels of the evaluated policies and teams, in configuration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Labels {
    pub policies: Vec<String>,
    pub teams: Vec<String>,
}

impl EvaluationConfig {
    pub fn n_players(&self) -> usize {
        self.multiplayer.as_ref().map_or(1, |mp| mp.nb_players)
    }

    pub fn teams(&self) -> &[TeamType] {
        self.multiplayer.as_ref().map_or(&[], |mp| mp.teams.as_slice())
    }

    /// Checks every field and builds the environments, so that errors surface
    /// before any repetition starts.
    pub fn validate(&self) -> Result<(Vec<Environment>, Labels), ConfigError> {
        if self.horizon == 0 {
            return Err(ConfigError::invalid("horizon", "must be positive"));
        }
        if self.repetitions == 0 {
            return Err(ConfigError::invalid("repetitions", "must be positive"));
        }
        if self.workers == 0 {
            return Err(ConfigError::invalid("workers", "must be positive"));
        }
        if self.environments.is_empty() {
            return Err(ConfigError::invalid(
                "environments",
                "at least one environment is required",
            ));
        }
        if self.policies.is_empty() && self.teams().is_empty() {
            return Err(ConfigError::invalid(
                "policies",
                "nothing to evaluate: no policy and no team",
            ));
        }

        let environments = self
            .environments
            .iter()
            .enumerate()
            .map(|(i, env)| env.build(&format!("environments[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;

        let mut labels = Labels::default();
        for (i, definition) in self.policies.iter().enumerate() {
            let field = format!("policies[{i}]");
            let mut label = String::new();
            for env in &environments {
                let ctx = PolicyContext::new(env.n_arms(), Some(0));
                let policy = definition
                    .build(&ctx)
                    .map_err(|err| ConfigError::invalid(field.as_str(), err.to_string()))?;
                label = policy.name();
            }
            labels.policies.push(label);
        }

        if let Some(mp) = &self.multiplayer {
            if mp.nb_players == 0 {
                return Err(ConfigError::invalid(
                    "multiplayer.nb_players",
                    "must be positive",
                ));
            }
            mp.collision.validate("multiplayer.collision")?;
            for (i, team) in mp.teams.iter().enumerate() {
                let field = format!("multiplayer.teams[{i}]");
                team.validate(&field, mp.nb_players)?;
                let mut label = String::new();
                for env in &environments {
                    let ctx = PolicyContext::new(env.n_arms(), Some(0)).with_players(mp.nb_players);
                    let players: Vec<Box<dyn Policy>> = team
                        .build(&ctx)
                        .map_err(|err| ConfigError::invalid(field.as_str(), err.to_string()))?;
                    label = TeamType::label(&players);
                }
                labels.teams.push(label);
            }
        }

        Ok((environments, labels))
    }
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub evaluation: EvaluationConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(File::with_name("config"))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(File::from(path.as_ref()))
    }

    fn load<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let builder = Config::builder()
            .add_source(file)
            .add_source(
                EnvSource::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(builder.try_deserialize()?)
    }
}
