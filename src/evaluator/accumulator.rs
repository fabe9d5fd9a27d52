use super::results::EnvironmentResults;
use super::runner::RepetitionOutcome;
use super::statistics::summarize;
use super::worker::RepetitionReport;

use crate::config::Labels;
use crate::errors::{FailedRepetition, RepetitionError};

use tracing::warn;

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Pending,
    Completed(RepetitionOutcome),
    Failed(String),
    Cancelled,
}

/// One slot per (environment, repetition), filled in any order. Reduction
/// always reads the slots in index order.
#[derive(Debug)]
pub struct Accumulator {
    n_environments: usize,
    repetitions: usize,
    slots: Vec<Slot>,
}

impl Accumulator {
    pub fn new(n_environments: usize, repetitions: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(n_environments * repetitions, Slot::default);
        Self {
            n_environments,
            repetitions,
            slots,
        }
    }

    pub fn record(&mut self, report: RepetitionReport) {
        let RepetitionReport {
            environment,
            repetition,
            result,
        } = report;
        if environment >= self.n_environments || repetition >= self.repetitions {
            warn!(environment, repetition, "Dropping report of an unknown repetition");
            return;
        }

        self.slots[environment * self.repetitions + repetition] = match result {
            Ok(outcome) => Slot::Completed(outcome),
            Err(RepetitionError::Cancelled) => Slot::Cancelled,
            Err(err) => Slot::Failed(err.to_string()),
        };
    }

    pub fn completed(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Completed(_)))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Cancelled | Slot::Pending))
            .count()
    }

    pub fn failures(&self) -> Vec<FailedRepetition> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Slot::Failed(reason) => Some(FailedRepetition {
                    environment: i / self.repetitions,
                    repetition: i % self.repetitions,
                    reason: reason.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    fn outcomes(&self, environment: usize) -> Vec<&RepetitionOutcome> {
        let start = environment * self.repetitions;
        self.slots[start..start + self.repetitions]
            .iter()
            .filter_map(|slot| match slot {
                Slot::Completed(outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }

    /// Reduces the completed repetitions of every environment.
    pub fn reduce(&self, labels: &Labels, n_arms: &[usize], n_players: usize) -> Vec<EnvironmentResults> {
        (0..self.n_environments)
            .map(|environment| {
                let outcomes = self.outcomes(environment);
                let policies = labels
                    .policies
                    .iter()
                    .enumerate()
                    .map(|(p, label)| {
                        let trajectories: Vec<_> =
                            outcomes.iter().map(|outcome| &outcome.policies[p]).collect();
                        summarize(label, 1, &trajectories)
                    })
                    .collect();
                let teams = labels
                    .teams
                    .iter()
                    .enumerate()
                    .map(|(t, label)| {
                        let trajectories: Vec<_> =
                            outcomes.iter().map(|outcome| &outcome.teams[t]).collect();
                        summarize(label, n_players, &trajectories)
                    })
                    .collect();

                EnvironmentResults {
                    environment,
                    n_arms: n_arms.get(environment).copied().unwrap_or_default(),
                    completed: outcomes.len(),
                    policies,
                    teams,
                }
            })
            .collect()
    }
}
