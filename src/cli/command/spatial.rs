//! Fetch, pack, dump and map the BOM spatial data.

use std::{io, path::Path, process::ExitCode};

use anyhow::Result;
use serde_json::json;

use crate::{
    catalog::get_gis_types,
    cli::{create_spinner, SpatialCommands},
    database::build_spatial_database,
    download::{fetch_from_bom, FetchSummary},
    dump::{dump_to_csv, dump_to_table},
    output::Output,
    settings::Settings,
    visualize::{create_map, get_visualizable_types, open_in_browser},
};

pub async fn spatial(command: &SpatialCommands, mut settings: Settings, output: &Output) -> Result<ExitCode> {
    match command {
        SpatialCommands::Fetch => fetch(settings, output).await?,
        SpatialCommands::Sync => {
            settings.overwrite = true;
            fetch(settings, output).await?
        }
        SpatialCommands::Build => build(&settings, output)?,
        SpatialCommands::Csvdump { spatial_type } => match spatial_type {
            Some(name) => dump_to_csv(name, &settings, io::stdout().lock())?,
            None => list_types(&get_gis_types(), "--spatial-type", output),
        },
        SpatialCommands::Tabledump { spatial_type } => match spatial_type {
            Some(name) => dump_to_table(name, &settings, output)?,
            None => list_types(&get_gis_types(), "--spatial-type", output),
        },
        SpatialCommands::Map {
            spatial_types,
            output: path,
            no_open,
        } => {
            if spatial_types.is_empty() {
                list_types(&get_visualizable_types(), "  -s", output);
                output.cyan("\nCombine layers: -s forecast_districts -s radar_location");
            } else {
                map(spatial_types, path.as_deref(), !no_open, &settings, output)?;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn list_types(types: &[&str], flag: &str, output: &Output) {
    output.warning("Select one of the spatial types:");
    for name in types {
        output.warning(format!("{} {}", flag, name));
    }
}

async fn fetch(settings: Settings, output: &Output) -> Result<()> {
    let spinner = create_spinner("Fetching spatial data from ftp.bom.gov.au".to_string(), output);
    let summary = fetch_from_bom(settings).await;
    spinner.finish_and_clear();
    report_fetch(&summary?, output)
}

fn report_fetch(summary: &FetchSummary, output: &Output) -> Result<()> {
    if output.is_json() {
        return output.emit_json(summary);
    }

    for path in &summary.skipped {
        output.warning(format!(
            "{} already exists. Use the --overwrite option to re-download",
            path.display()
        ));
    }
    output.success(format!(
        "Downloaded {} files, skipped {}",
        summary.downloaded.len(),
        summary.skipped.len()
    ));
    Ok(())
}

fn build(settings: &Settings, output: &Output) -> Result<()> {
    let spinner = create_spinner("Packing spatial data into local DB".to_string(), output);
    let summary = build_spatial_database(settings);
    spinner.finish_and_clear();
    let summary = summary?;

    if output.is_json() {
        return output.emit_json(&summary);
    }

    for table in &summary.tables {
        output.info(format!("{}: {} rows", table.name, table.rows));
        if table.failed > 0 {
            output.error(format!("{}: {} records could not be inserted", table.name, table.failed));
        }
    }
    for name in &summary.missing {
        output.warning(format!("{}: no data, run 'bomshell spatial fetch' first", name));
    }
    output.success(format!("Database written to {}", summary.path.display()));
    Ok(())
}

fn map(
    types: &[String],
    path: Option<&Path>,
    open: bool,
    settings: &Settings,
    output: &Output,
) -> Result<()> {
    let saved = create_map(types, path, settings)?;

    if output.is_json() {
        output.emit_json(&json!({ "map": saved }))?;
    } else {
        output.success(format!("Map saved to: {}", saved.display()));
        if types.len() > 1 {
            output.cyan("Use layer control (top-right) to toggle layers");
        }
    }

    if open {
        open_in_browser(&saved);
    }
    Ok(())
}
