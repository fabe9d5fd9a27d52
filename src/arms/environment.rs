use super::arm::{ArmFamily, Arms};
use super::generator::{BayesianMeans, MarkovianMeans, MeanGenerator, StaticMeans};

use crate::errors::{ArmError, ConfigError};

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Environment definition as read from the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvironmentType {
    Static {
        family: ArmFamily,
        means: Vec<f64>,
    },
    Bayesian {
        family: ArmFamily,
        n_arms: usize,
        #[serde(default)]
        lower: f64,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
        #[serde(default)]
        min_gap: f64,
    },
    Markovian {
        family: ArmFamily,
        states: Vec<Vec<f64>>,
        transitions: Vec<Vec<f64>>,
        initial_state: Option<usize>,
    },
}

fn default_amplitude() -> f64 {
    1.0
}

const STOCHASTIC_TOLERANCE: f64 = 1e-9;

impl EnvironmentType {
    pub fn build(&self, field: &str) -> Result<Environment, ConfigError> {
        let (family, generator): (&ArmFamily, Box<dyn MeanGenerator>) = match self {
            EnvironmentType::Static { family, means } => {
                if means.is_empty() {
                    return Err(ConfigError::invalid(
                        format!("{field}.means"),
                        "at least one arm is required",
                    ));
                }
                (family, Box::new(StaticMeans::new(means.clone())))
            }
            EnvironmentType::Bayesian {
                family,
                n_arms,
                lower,
                amplitude,
                min_gap,
            } => {
                if *n_arms == 0 {
                    return Err(ConfigError::invalid(
                        format!("{field}.n_arms"),
                        "at least one arm is required",
                    ));
                }
                if !lower.is_finite() {
                    return Err(ConfigError::invalid(format!("{field}.lower"), "must be finite"));
                }
                if !amplitude.is_finite() || *amplitude < 0.0 {
                    return Err(ConfigError::invalid(
                        format!("{field}.amplitude"),
                        "must be finite and non-negative",
                    ));
                }
                if !min_gap.is_finite() || *min_gap < 0.0 {
                    return Err(ConfigError::invalid(
                        format!("{field}.min_gap"),
                        "must be finite and non-negative",
                    ));
                }
                (
                    family,
                    Box::new(BayesianMeans::new(*n_arms, *lower, *amplitude, *min_gap)),
                )
            }
            EnvironmentType::Markovian {
                family,
                states,
                transitions,
                initial_state,
            } => {
                validate_chain(field, states, transitions, *initial_state)?;
                (
                    family,
                    Box::new(MarkovianMeans::new(
                        states.clone(),
                        transitions.clone(),
                        *initial_state,
                    )),
                )
            }
        };

        generator
            .validate(family)
            .map_err(|err| ConfigError::invalid(format!("{field}.family"), err.to_string()))?;

        Ok(Environment {
            family: family.clone(),
            generator,
        })
    }
}

fn validate_chain(
    field: &str,
    states: &[Vec<f64>],
    transitions: &[Vec<f64>],
    initial_state: Option<usize>,
) -> Result<(), ConfigError> {
    let n_arms = states.first().map_or(0, Vec::len);
    if n_arms == 0 {
        return Err(ConfigError::invalid(
            format!("{field}.states"),
            "at least one non-empty state is required",
        ));
    }
    if let Some(k) = states.iter().position(|s| s.len() != n_arms) {
        return Err(ConfigError::invalid(
            format!("{field}.states[{k}]"),
            format!("expected {n_arms} means"),
        ));
    }
    if transitions.len() != states.len() {
        return Err(ConfigError::invalid(
            format!("{field}.transitions"),
            format!("expected a {0}x{0} matrix", states.len()),
        ));
    }
    for (i, row) in transitions.iter().enumerate() {
        if row.len() != states.len() {
            return Err(ConfigError::invalid(
                format!("{field}.transitions[{i}]"),
                format!("expected {} probabilities", states.len()),
            ));
        }
        if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ConfigError::invalid(
                format!("{field}.transitions[{i}]"),
                "probabilities must be finite and non-negative",
            ));
        }
        if (row.iter().sum::<f64>() - 1.0).abs() > STOCHASTIC_TOLERANCE {
            return Err(ConfigError::invalid(
                format!("{field}.transitions[{i}]"),
                "probabilities must sum to 1",
            ));
        }
    }
    if let Some(state) = initial_state.filter(|&s| s >= states.len()) {
        return Err(ConfigError::invalid(
            format!("{field}.initial_state"),
            format!("state {state} does not exist"),
        ));
    }
    Ok(())
}

/// A validated environment: an arm family plus a mean generator.
#[derive(Debug)]
pub struct Environment {
    family: ArmFamily,
    generator: Box<dyn MeanGenerator>,
}

impl Environment {
    pub fn new(family: ArmFamily, generator: Box<dyn MeanGenerator>) -> Self {
        Self { family, generator }
    }

    pub fn n_arms(&self) -> usize {
        self.generator.n_arms()
    }

    pub fn is_dynamic(&self) -> bool {
        self.generator.is_dynamic()
    }

    pub fn family(&self) -> &ArmFamily {
        &self.family
    }

    /// Draws the problem faced during one repetition.
    pub fn instantiate(&self, horizon: u64, rng: &mut dyn RngCore) -> Result<Problem, ArmError> {
        let segments = self
            .generator
            .schedule(horizon, rng)
            .into_segments()
            .into_iter()
            .map(|segment| {
                let arms = self.family.build_all(&segment.means)?;
                Ok(ProblemSegment::new(segment.start, arms))
            })
            .collect::<Result<Vec<_>, ArmError>>()?;

        Ok(Problem { segments })
    }
}

/// Arms in force over a range of rounds, with the oracle quantities regret
/// needs.
#[derive(Debug)]
pub struct ProblemSegment {
    pub start: u64,
    pub arms: Arms,
    means: Vec<f64>,
    sorted_means: Vec<f64>,
}

impl ProblemSegment {
    fn new(start: u64, arms: Arms) -> Self {
        let means: Vec<f64> = arms.iter().map(|arm| arm.mean()).collect();
        let mut sorted_means = means.clone();
        sorted_means.sort_by(|a, b| b.total_cmp(a));
        Self {
            start,
            arms,
            means,
            sorted_means,
        }
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn best_mean(&self) -> f64 {
        self.sorted_means[0]
    }

    pub fn is_best(&self, arm: usize) -> bool {
        self.means[arm] >= self.best_mean()
    }

    /// Expected reward of the best collision-free allocation of `players` arms.
    pub fn top_sum(&self, players: usize) -> f64 {
        self.sorted_means.iter().take(players).sum()
    }

    pub fn samples(&self, rng: &mut dyn RngCore) -> Vec<f64> {
        self.arms.iter().map(|arm| arm.sample(rng)).collect()
    }
}

/// The per-repetition problem: piecewise-constant arms over the horizon.
#[derive(Debug)]
pub struct Problem {
    segments: Vec<ProblemSegment>,
}

impl Problem {
    pub fn n_arms(&self) -> usize {
        self.segments[0].arms.len()
    }

    pub fn segments(&self) -> &[ProblemSegment] {
        &self.segments
    }

    pub fn cursor(&self) -> ProblemCursor<'_> {
        ProblemCursor {
            problem: self,
            index: 0,
        }
    }
}

/// Walks the segments of a problem in increasing round order.
pub struct ProblemCursor<'a> {
    problem: &'a Problem,
    index: usize,
}

impl<'a> ProblemCursor<'a> {
    pub fn at(&mut self, round: u64) -> &'a ProblemSegment {
        let problem: &'a Problem = self.problem;
        let segments = &problem.segments;
        while self.index + 1 < segments.len() && segments[self.index + 1].start <= round {
            self.index += 1;
        }
        &segments[self.index]
    }
}
