mod attributes;
mod catalog;
mod cli;
mod database;
mod download;
mod dump;
mod error;
mod forecast;
mod output;
mod settings;
mod visualize;

#[cfg(test)]
mod fixtures;

use std::{process::ExitCode, time::Duration};

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, overwrite_flag, Cli, Commands};
use error::SpatialError;
use output::Output;
use settings::{Knobs, Settings};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, output: &Output) -> Result<ExitCode> {
    let mut knobs = Knobs::new();
    let mut settings = Settings::load(&mut knobs)?;
    if let Some(cache) = cli.cache_path {
        settings.cache = cache;
    }
    debug!("{:?}", settings);

    match cli.command.unwrap_or_default() {
        Commands::Forecast { town } => command::forecast(&town, &settings, output).await,
        Commands::Knobs => {
            command::knobs(&knobs, output)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Spatial {
            overwrite,
            no_overwrite,
            ftp_timeout,
            command,
        } => {
            if let Some(overwrite) = overwrite_flag(overwrite, no_overwrite) {
                settings.overwrite = overwrite;
            }
            if let Some(secs) = ftp_timeout {
                settings.ftp_timeout = Duration::from_secs(secs);
            }
            command::spatial(&command, settings, output).await
        }
    }
}

fn report(e: &Error, output: &Output) {
    match e.downcast_ref::<SpatialError>() {
        Some(spatial) if spatial.is_user_facing() => output.error(spatial),
        _ => output.error(format!("Error: {:#}", e)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = Output::new(cli.json);

    match run(cli, &output).await {
        Ok(code) => code,
        Err(e) => {
            report(&e, &output);
            ExitCode::FAILURE
        }
    }
}
