mod accumulator;
mod cancellation;
mod results;
mod runner;
mod statistics;
mod worker;

pub use accumulator::Accumulator;
pub use cancellation::{cancellation, CancellationHandle, CancellationToken};
pub use results::{EnvironmentResults, EvaluationResults, PolicyResults, RoundStatistics};
pub use runner::{RepetitionOutcome, Trajectory};
pub use statistics::{mean_std_err, student_quantile};
pub use worker::RepetitionReport;

use runner::RunContext;
use worker::{run_guarded, RepetitionWorker, RunRepetition};

use crate::arms::Environment;
use crate::config::{EvaluationConfig, FailurePolicy, Labels};
use crate::errors::{ConfigError, EvaluationError, RepetitionError};

use actix::prelude::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Runs every repetition of an evaluation over a pool of worker threads and
/// reduces the trajectories into per-round statistics.
#[derive(Debug)]
pub struct Evaluator {
    config: Arc<EvaluationConfig>,
    environments: Arc<Vec<Environment>>,
    labels: Labels,
    seed: u64,
}

impl Evaluator {
    pub fn new(config: EvaluationConfig) -> Result<Self, ConfigError> {
        let (environments, labels) = config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);

        Ok(Self {
            config: Arc::new(config),
            environments: Arc::new(environments),
            labels,
            seed,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    fn context(&self, cancel: CancellationToken, abort: CancellationToken) -> RunContext {
        RunContext {
            config: self.config.clone(),
            environments: self.environments.clone(),
            seed: self.seed,
            cancel,
            abort,
        }
    }

    /// Runs one repetition on the current thread.
    pub fn run_repetition(
        &self,
        environment: usize,
        repetition: usize,
    ) -> Result<RepetitionOutcome, RepetitionError> {
        let ctx = self.context(CancellationToken::never(), CancellationToken::never());
        run_guarded(&ctx, environment, repetition)
    }

    pub fn accumulator(&self) -> Accumulator {
        Accumulator::new(self.environments.len(), self.config.repetitions)
    }

    /// Final pass over the accumulated repetitions.
    pub fn reduce(
        &self,
        accumulator: &Accumulator,
        cancelled: bool,
    ) -> Result<EvaluationResults, EvaluationError> {
        let failed = accumulator.failures();
        if !failed.is_empty() && self.config.on_failure == FailurePolicy::Abort {
            return Err(EvaluationError::RepetitionsFailed(failed));
        }
        if accumulator.completed() == 0 {
            return Err(EvaluationError::NoCompletedRepetitions);
        }

        let n_arms: Vec<usize> = self.environments.iter().map(|env| env.n_arms()).collect();
        let environments = accumulator.reduce(&self.labels, &n_arms, self.config.n_players());
        for env in &environments {
            info!(
                environment = env.environment,
                completed = env.completed,
                "Reduced environment"
            );
        }

        Ok(EvaluationResults {
            seed: self.seed,
            horizon: self.config.horizon,
            repetitions: self.config.repetitions,
            cancelled,
            failed,
            environments,
        })
    }

    /// Runs the whole evaluation. Must be called from within a running actix
    /// system.
    pub async fn run(&self, cancel: CancellationToken) -> Result<EvaluationResults, EvaluationError> {
        let n_jobs = self.environments.len() * self.config.repetitions;
        let workers = self.config.workers.min(n_jobs).max(1);
        info!(
            seed = self.seed,
            horizon = self.config.horizon,
            repetitions = self.config.repetitions,
            environments = self.environments.len(),
            workers,
            "Starting evaluation"
        );

        let (abort, abort_token) = cancellation();
        let ctx = self.context(cancel.clone(), abort_token);
        let pool = SyncArbiter::start(workers, move || RepetitionWorker::new(ctx.clone()));

        let (reports, mut received) = mpsc::unbounded_channel();
        for environment in 0..self.environments.len() {
            for repetition in 0..self.config.repetitions {
                pool.do_send(RunRepetition {
                    environment,
                    repetition,
                    reports: reports.clone(),
                });
            }
        }
        drop(reports);

        let mut accumulator = self.accumulator();
        while let Some(report) = received.recv().await {
            match &report.result {
                Err(RepetitionError::Cancelled) | Ok(_) => {}
                Err(err) => {
                    warn!(
                        environment = report.environment,
                        repetition = report.repetition,
                        "Repetition failed: {err}"
                    );
                    if self.config.on_failure == FailurePolicy::Abort {
                        abort.cancel();
                    }
                }
            }
            accumulator.record(report);
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!(
                completed = accumulator.completed(),
                skipped = accumulator.cancelled(),
                "Evaluation cancelled"
            );
        }

        let results = self.reduce(&accumulator, cancelled)?;
        info!(
            completed = accumulator.completed(),
            failed = results.failed.len(),
            "Evaluation finished"
        );
        Ok(results)
    }

    /// Runs the evaluation on a fresh actix system.
    pub fn run_blocking(&self) -> Result<EvaluationResults, EvaluationError> {
        System::new().block_on(self.run(CancellationToken::never()))
    }
}
