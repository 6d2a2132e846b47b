mod cli;
mod config;
mod logging;
mod report;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use harvest_logging::harvest_error;
use permit_engine::{HarvestError, Harvester, ReqwestFetcher, S3Publisher};

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::report::ConsoleProgress;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(&cli.log_destination(), cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            harvest_error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = AppConfig::load(cli).context("invalid configuration")?;
    report::print_banner(&config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let _runtime_guard = runtime.enter();

    let harvester = Harvester::new(
        config.harvest_config(),
        ReqwestFetcher::default(),
        S3Publisher::new(config.storage.clone()),
    );

    match runtime.block_on(harvester.run(&ConsoleProgress)) {
        Ok(report) => {
            report::print_summary(&config, &report);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if !logged_by_run(&err) {
                harvest_error!("{err}");
            }
            eprintln!("Error: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Listing failures are logged by the run itself when it aborts.
fn logged_by_run(err: &HarvestError) -> bool {
    !matches!(err, HarvestError::OutputDir(_))
}
