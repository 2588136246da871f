//! Location search and daily forecasts from the BOM weather API.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    Client, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Number;
use thiserror::Error;
use tracing::debug;

pub const BOM_API_BASE: &str = "https://api.weather.bom.gov.au/v1";

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub geohash: String,
    pub name: String,
    pub postcode: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct LocationRecord {
    geohash: String,
    name: String,
    postcode: Option<String>,
    state: Option<String>,
}

impl From<LocationRecord> for Location {
    fn from(record: LocationRecord) -> Self {
        Location {
            geohash: record.geohash,
            name: record.name,
            postcode: record.postcode.unwrap_or_default(),
            state: record.state.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rain {
    pub chance: Option<Number>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Uv {
    pub category: Option<String>,
    pub max_index: Option<Number>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: Option<String>,
    pub short_text: Option<String>,
    pub extended_text: Option<String>,
    pub temp_max: Option<Number>,
    pub temp_min: Option<Number>,
    pub rain: Option<Rain>,
    pub uv: Option<Uv>,
    pub fire_danger: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub data: Vec<DailyForecast>,
}

/// Client for the public BOM weather API.
#[derive(Debug, Clone)]
pub struct BomClient {
    http: Client,
    base_url: String,
}

impl BomClient {
    pub fn new(timeout: Duration) -> Result<Self, ForecastError> {
        Self::with_base_url(BOM_API_BASE, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ForecastError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|source| ForecastError::Request {
                url: base_url.to_string(),
                source,
            })?;

        Ok(BomClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn locations_url(&self) -> String {
        format!("{}/locations", self.base_url)
    }

    pub fn daily_forecast_url(&self, geohash: &str) -> String {
        format!("{}/locations/{}/forecasts/daily", self.base_url, geohash)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, &str)],
    ) -> Result<T, ForecastError> {
        debug!("GET {} {:?}", url, query);
        let request_error = |source| ForecastError::Request {
            url: url.clone(),
            source,
        };

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForecastError::Status {
                url: url.clone(),
                status,
            });
        }

        response.json().await.map_err(request_error)
    }

    /// Locations matching `query`, best match first.
    pub async fn search_location(&self, query: &str) -> Result<Vec<Location>, ForecastError> {
        let envelope: Envelope<LocationRecord> = self
            .get_json(self.locations_url(), &[("search", query)])
            .await?;

        Ok(envelope.data.into_iter().map(Location::from).collect())
    }

    /// The 7-day daily forecast for a location geohash.
    pub async fn get_daily_forecast(&self, geohash: &str) -> Result<Forecast, ForecastError> {
        self.get_json(self.daily_forecast_url(geohash), &[]).await
    }
}

fn day_label(date: &str) -> String {
    let parsed = DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(date, "%Y-%m-%d"));

    match parsed {
        Ok(day) => day.format("%a %d %b").to_string(),
        Err(_) => date.to_string(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn headline(day: &DailyForecast) -> String {
    let label = day_label(day.date.as_deref().unwrap_or_default());

    let Some(short_text) = non_empty(&day.short_text) else {
        return label;
    };

    let temps = match (&day.temp_max, &day.temp_min) {
        (Some(max), Some(min)) => format!(" ({}°/{}°)", max, min),
        (Some(max), None) => format!(" ({}°)", max),
        _ => String::new(),
    };

    format!("{} — {}{}", label, short_text, temps)
}

fn details(day: &DailyForecast) -> Vec<String> {
    let mut details = Vec::new();

    if let Some(chance) = day.rain.as_ref().and_then(|r| r.chance.as_ref()) {
        details.push(format!("Rain: {}% chance", chance));
    }

    if let Some(uv) = &day.uv {
        if let Some(category) = non_empty(&uv.category) {
            match &uv.max_index {
                Some(index) => details.push(format!("UV: {} ({})", category, index)),
                None => details.push(format!("UV: {}", category)),
            }
        }
    }

    if let Some(fire) = non_empty(&day.fire_danger) {
        details.push(format!("Fire: {}", fire));
    }

    details
}

/// Renders a multi-day forecast for the terminal.
pub fn format_forecast(location: &Location, forecast: &Forecast) -> String {
    let mut header = location.name.clone();
    if !location.state.is_empty() {
        header.push_str(&format!(", {}", location.state));
    }
    if !location.postcode.is_empty() {
        header.push_str(&format!(" {}", location.postcode));
    }

    let mut lines = vec![header, String::new()];

    for day in &forecast.data {
        lines.push(headline(day));

        let details = details(day);
        if !details.is_empty() {
            lines.push(format!("  {}", details.join(" | ")));
        }

        if let Some(extended) = non_empty(&day.extended_text) {
            lines.push(format!("  {}", extended));
        }

        lines.push(String::new());
    }

    lines.join("\n")
}

// -- Tests -------------------------------------------------------------------
