use anyhow::Context;
use clap::Parser;
use colored::*;
use std::process::ExitCode;

use forcerm::cli::Cli;
use forcerm::commands::execute_remove;
use forcerm::config::Config;
use forcerm::logging::init_tracing;

const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    if cli.debug {
        eprintln!("{} {:?}", "DEBUG:".yellow(), cli);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "[X] Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.init_config {
        let path = Config::init().context("failed to write default config")?;
        eprintln!("{} Config written to {}", "[OK]".green(), path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load().context("failed to load config")?;

    let code = match execute_remove(&cli, &config).await? {
        None => ExitCode::SUCCESS,
        Some(result) if result.cancelled => ExitCode::from(EXIT_CANCELLED),
        Some(result) if result.failed > 0 => ExitCode::FAILURE,
        Some(_) => ExitCode::SUCCESS,
    };

    Ok(code)
}
