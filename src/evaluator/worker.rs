use super::runner::{run_repetition, RepetitionOutcome, RunContext};

use crate::errors::RepetitionError;

use actix::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Result of one repetition, sent back to the evaluator.
#[derive(Debug)]
pub struct RepetitionReport {
    pub environment: usize,
    pub repetition: usize,
    pub result: Result<RepetitionOutcome, RepetitionError>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct RunRepetition {
    pub environment: usize,
    pub repetition: usize,
    pub reports: UnboundedSender<RepetitionReport>,
}

/// Runs repetitions on its own thread of a `SyncArbiter`.
pub struct RepetitionWorker {
    ctx: RunContext,
}

impl RepetitionWorker {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }
}

impl Actor for RepetitionWorker {
    type Context = SyncContext<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        debug!("Started repetition worker");
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs a repetition, turning a panic into a failed repetition.
pub fn run_guarded(
    ctx: &RunContext,
    environment: usize,
    repetition: usize,
) -> Result<RepetitionOutcome, RepetitionError> {
    catch_unwind(AssertUnwindSafe(|| run_repetition(ctx, environment, repetition)))
        .unwrap_or_else(|payload| Err(RepetitionError::Panicked(panic_message(payload))))
}

impl Handler<RunRepetition> for RepetitionWorker {
    type Result = ();

    fn handle(&mut self, msg: RunRepetition, _: &mut Self::Context) -> Self::Result {
        let result = if self.ctx.cancel.is_cancelled() || self.ctx.abort.is_cancelled() {
            Err(RepetitionError::Cancelled)
        } else {
            run_guarded(&self.ctx, msg.environment, msg.repetition)
        };

        // the evaluator only drops its receiver once it gave up on the batch
        let _ = msg.reports.send(RepetitionReport {
            environment: msg.environment,
            repetition: msg.repetition,
            result,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(3)), "unknown panic payload");
    }
}
