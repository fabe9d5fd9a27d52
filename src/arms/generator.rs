use super::arm::ArmFamily;

use crate::errors::ArmError;

use rand::{seq::SliceRandom, Rng, RngCore};
use std::fmt;

const MAX_REJECTIONS: usize = 1_000;

/// Means in force from round `start` until the next segment begins.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanSegment {
    pub start: u64,
    pub means: Vec<f64>,
}

/// Piecewise-constant means over one repetition.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanSchedule {
    segments: Vec<MeanSegment>,
}

impl MeanSchedule {
    pub fn constant(means: Vec<f64>) -> Self {
        Self {
            segments: vec![MeanSegment { start: 0, means }],
        }
    }

    pub fn segments(&self) -> &[MeanSegment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<MeanSegment> {
        self.segments
    }
}

/// Strategy producing the ground-truth means of a repetition.
pub trait MeanGenerator: fmt::Debug + Send + Sync {
    fn n_arms(&self) -> usize;
    fn schedule(&self, horizon: u64, rng: &mut dyn RngCore) -> MeanSchedule;
    /// Checks that every mean this generator may emit is valid for `family`.
    fn validate(&self, family: &ArmFamily) -> Result<(), ArmError>;
    fn is_dynamic(&self) -> bool {
        true
    }
}

/// `n_arms` evenly spaced means in `[lower + amplitude * delta, lower + amplitude * (1 - delta)]`,
/// sorted increasingly.
pub fn uniform_means(n_arms: usize, delta: f64, lower: f64, amplitude: f64) -> Vec<f64> {
    match n_arms {
        0 => Vec::new(),
        1 => vec![lower + amplitude * 0.5],
        n => {
            let step = (1.0 - 2.0 * delta) / (n - 1) as f64;
            (0..n)
                .map(|k| lower + amplitude * (delta + step * k as f64))
                .collect()
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaticMeans {
    means: Vec<f64>,
}

impl StaticMeans {
    pub fn new(means: Vec<f64>) -> Self {
        Self { means }
    }
}

impl MeanGenerator for StaticMeans {
    fn n_arms(&self) -> usize {
        self.means.len()
    }

    fn schedule(&self, _: u64, _: &mut dyn RngCore) -> MeanSchedule {
        MeanSchedule::constant(self.means.clone())
    }

    fn validate(&self, family: &ArmFamily) -> Result<(), ArmError> {
        family.build_all(&self.means).map(|_| ())
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}

/// Redraws the means uniformly in `[lower, lower + amplitude]` at every
/// repetition, keeping at least `min_gap` between any two of them.
#[derive(Debug, Clone)]
pub struct BayesianMeans {
    n_arms: usize,
    lower: f64,
    amplitude: f64,
    min_gap: f64,
}

impl BayesianMeans {
    pub fn new(n_arms: usize, lower: f64, amplitude: f64, min_gap: f64) -> Self {
        Self {
            n_arms,
            lower,
            amplitude,
            min_gap,
        }
    }

    fn well_separated(&self, means: &[f64]) -> bool {
        let mut sorted = means.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted.windows(2).all(|w| w[1] - w[0] >= self.min_gap)
    }
}

impl MeanGenerator for BayesianMeans {
    fn n_arms(&self) -> usize {
        self.n_arms
    }

    fn schedule(&self, _: u64, rng: &mut dyn RngCore) -> MeanSchedule {
        let upper = self.lower + self.amplitude;
        for _ in 0..MAX_REJECTIONS {
            let means: Vec<f64> = (0..self.n_arms)
                .map(|_| rng.random_range(self.lower..=upper))
                .collect();
            if self.well_separated(&means) {
                return MeanSchedule::constant(means);
            }
        }

        // too tight a gap for rejection, fall back to evenly spaced means
        let mut means = uniform_means(
            self.n_arms,
            1.0 / (1.0 + self.n_arms as f64),
            self.lower,
            self.amplitude,
        );
        means.shuffle(rng);
        MeanSchedule::constant(means)
    }

    fn validate(&self, family: &ArmFamily) -> Result<(), ArmError> {
        family.build(self.lower)?;
        family.build(self.lower + self.amplitude)?;
        Ok(())
    }
}

/// Means switching between `states` along a Markov chain, one transition
/// between every pair of consecutive rounds.
#[derive(Debug, Clone)]
pub struct MarkovianMeans {
    states: Vec<Vec<f64>>,
    transitions: Vec<Vec<f64>>,
    initial_state: Option<usize>,
}

impl MarkovianMeans {
    pub fn new(
        states: Vec<Vec<f64>>,
        transitions: Vec<Vec<f64>>,
        initial_state: Option<usize>,
    ) -> Self {
        Self {
            states,
            transitions,
            initial_state,
        }
    }

    fn next_state(&self, current: usize, rng: &mut dyn RngCore) -> usize {
        let row = &self.transitions[current];
        let u: f64 = rng.random();
        let mut cumulative = 0.0;
        for (state, &p) in row.iter().enumerate() {
            cumulative += p;
            if u < cumulative {
                return state;
            }
        }
        // rounding left the tail uncovered
        row.iter().rposition(|&p| p > 0.0).unwrap_or(current)
    }
}

impl MeanGenerator for MarkovianMeans {
    fn n_arms(&self) -> usize {
        self.states.first().map_or(0, Vec::len)
    }

    fn schedule(&self, horizon: u64, rng: &mut dyn RngCore) -> MeanSchedule {
        let mut current = self
            .initial_state
            .unwrap_or_else(|| rng.random_range(0..self.states.len()));
        let mut segments = vec![MeanSegment {
            start: 0,
            means: self.states[current].clone(),
        }];

        for round in 1..horizon {
            let next = self.next_state(current, rng);
            if next != current {
                segments.push(MeanSegment {
                    start: round,
                    means: self.states[next].clone(),
                });
                current = next;
            }
        }

        MeanSchedule { segments }
    }

    fn validate(&self, family: &ArmFamily) -> Result<(), ArmError> {
        self.states
            .iter()
            .try_for_each(|means| family.build_all(means).map(|_| ()))
    }
}
