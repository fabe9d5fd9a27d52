use bandit_sim::config::AppConfig;
use bandit_sim::evaluator::{cancellation, Evaluator};

use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[actix::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Cannot read config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let evaluator = match Evaluator::new(config.evaluation) {
        Ok(evaluator) => evaluator,
        Err(err) => {
            error!("Invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let (handle, token) = cancellation();
    actix::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing running repetitions");
            handle.cancel();
        }
    });

    let results = match evaluator.run(token).await {
        Ok(results) => results,
        Err(err) => {
            error!("Evaluation failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&results) {
        Ok(json) => {
            println!("{json}");
            info!(seed = results.seed, "Results written");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Cannot serialize results: {err}");
            ExitCode::FAILURE
        }
    }
}
