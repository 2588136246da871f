//! Look up a town and print its 7-day forecast.

use std::process::ExitCode;

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::{
    cli::create_spinner,
    forecast::{format_forecast, BomClient},
    output::Output,
    settings::Settings,
};

pub async fn forecast(town: &str, settings: &Settings, output: &Output) -> Result<ExitCode> {
    let client = BomClient::new(settings.http_timeout)?;

    let spinner = create_spinner(format!("Searching for {}", town), output);
    let locations = client.search_location(town).await;
    spinner.finish_and_clear();

    let locations = match locations {
        Ok(locations) => locations,
        Err(e) => {
            output.error(format!("Error searching for '{}': {}", town, e));
            return Ok(ExitCode::FAILURE);
        }
    };

    let Some(location) = locations.first() else {
        output.warning(format!("No locations found for '{}'", town));
        return Ok(ExitCode::FAILURE);
    };

    if locations.len() > 1 {
        output.cyan(format!("Found {} matches (using first):", locations.len()));
        for (i, loc) in locations.iter().enumerate() {
            output.info(format!("  {}. {}, {} {}", i + 1, loc.name, loc.state, loc.postcode));
        }
        output.info("");
    }

    info!("Using {} ({})", location.name, location.geohash);
    let spinner = create_spinner(format!("Fetching forecast for {}", location.name), output);
    let forecast = client.get_daily_forecast(&location.geohash).await;
    spinner.finish_and_clear();

    let forecast = match forecast {
        Ok(forecast) => forecast,
        Err(e) => {
            output.error(format!("Error fetching forecast: {}", e));
            return Ok(ExitCode::FAILURE);
        }
    };

    if output.is_json() {
        output.emit_json(&json!({ "location": location, "forecast": forecast }))?;
    } else {
        output.info(format_forecast(location, &forecast));
    }

    Ok(ExitCode::SUCCESS)
}
