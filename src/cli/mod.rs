//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Parser, Subcommand};
use indicatif::ProgressBar;

use crate::output::Output;

pub const DEFAULT_TOWN: &str = "Roleystone";

#[derive(Debug, Parser)]
#[command(
    name = "bomshell",
    version,
    about = "Retrieve weather data from the Australian Bureau of Meteorology",
    long_about = None
)]
pub struct Cli {
    /// Level of verbosity of logs
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// BOM data cache path
    #[arg(short, long)]
    pub cache_path: Option<PathBuf>,

    /// Emit JSON output (for widgets / scripting)
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the 7-day weather forecast for a town
    Forecast {
        /// Town name to get forecast for
        #[arg(default_value = DEFAULT_TOWN)]
        town: String,
    },
    /// Print all known settings and their defaults
    Knobs,
    /// Spatial database management
    Spatial {
        /// Overwrite existing spatial data
        #[arg(short, long, overrides_with = "no_overwrite")]
        overwrite: bool,

        /// Keep existing spatial data
        #[arg(long, overrides_with = "overwrite")]
        no_overwrite: bool,

        /// FTP timeout in seconds
        #[arg(long, value_name = "SECS")]
        ftp_timeout: Option<u64>,

        #[command(subcommand)]
        command: SpatialCommands,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Forecast {
            town: DEFAULT_TOWN.to_string(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum SpatialCommands {
    /// Fetch spatial data
    Fetch,
    /// Fetch spatial data, overwriting existing files
    Sync,
    /// Build the local spatial database
    Build,
    /// Dump spatial data to csv
    Csvdump {
        /// Choose a spatial type
        #[arg(short, long)]
        spatial_type: Option<String>,
    },
    /// Dump spatial data to a table
    Tabledump {
        /// Choose a spatial type
        #[arg(short, long)]
        spatial_type: Option<String>,
    },
    /// Generate an interactive map of spatial data
    ///
    /// Combine multiple layers by specifying -s multiple times:
    ///
    ///     bomshell spatial map -s forecast_districts -s radar_location
    Map {
        /// Spatial type(s) to visualize, can be given more than once
        #[arg(short, long = "spatial-type")]
        spatial_types: Vec<String>,

        /// Output HTML file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Don't open the map in a browser
        #[arg(long)]
        no_open: bool,
    },
}

/// `Some(true)` for `--overwrite`, `Some(false)` for `--no-overwrite`, else `None`.
pub fn overwrite_flag(overwrite: bool, no_overwrite: bool) -> Option<bool> {
    match (overwrite, no_overwrite) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Creates a spinner, hidden when stdout carries JSON.
pub fn create_spinner(message: String, output: &Output) -> ProgressBar {
    if output.is_json() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

// -- Tests -------------------------------------------------------------------
