use clap::Parser;
use kinder_ops::cli::{Cli, run};
use kinder_ops::config::AppConfig;
use kinder_ops::env::load_environment;
use kinder_ops::error::AppError;
use kinder_ops::telemetry::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Environment files feed both the log filter and the config.
    if let Err(e) = load_environment() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    let guard = init_tracing(cli.verbose);

    let result = match AppConfig::from_env() {
        Ok(config) => run(cli.command, &config).await,
        Err(e) => Err(e),
    };

    let code = match result {
        Ok(()) => {
            info!("Done");
            0
        }
        Err(e) => {
            report_failure(&e);
            1
        }
    };

    drop(guard);
    std::process::exit(code);
}

fn report_failure(error: &AppError) {
    error.log_and_record("kinder-ops");
    eprintln!("Error: {}", error);
}
