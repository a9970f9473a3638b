use std::process::ExitCode;

use freerecall_cli::config::Config;
use freerecall_cli::{logging, pipeline};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let _log_guard = logging::init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config.with_args(std::env::args().skip(1)),
        Err(err) => {
            tracing::error!(error = %err, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };

    match pipeline::run(&config) {
        Ok(report) => {
            tracing::info!(
                records = report.records,
                subjects = report.lag_rank.len(),
                "analysis complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "analysis failed");
            ExitCode::FAILURE
        }
    }
}
