/// Core data types for the air quality crawler service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O — only types, the fixed CSV column schemas, and the
/// crawler error type.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Sentinels and fixed messages
// ---------------------------------------------------------------------------

/// Sentinel written for any sub-measurement the provider did not report.
/// A missing `iaqi` map, a missing pollutant entry, and a missing `v` field
/// all collapse into this one value — downstream consumers do not distinguish
/// the three cases.
pub const NOT_AVAILABLE: &str = "N/A";

/// Error recorded when the provider answers with a non-200 HTTP status.
pub const ERR_API_CONNECTION: &str = "API connection error";

/// Error recorded when the provider answers 200 but its payload status
/// field is not "ok" (or the data object is absent).
pub const ERR_NO_DATA: &str = "could not retrieve data";

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A fully populated observation from one WAQI station feed.
///
/// Field order here is the CSV column order. `aqi` and the nine
/// sub-measurements are kept as strings because the provider reports `"-"`
/// or omits them entirely for stale stations; absent values carry the
/// [`NOT_AVAILABLE`] sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationReport {
    pub timestamp: String, // provider-local, "YYYY-MM-DD HH:MM:SS"
    pub station_id: i64,
    pub city_name: String,
    pub url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub aqi: String,
    pub co: String,
    pub temperature: String,
    pub wind: String,
    pub atmospheric_pressure: String,
    pub humidity: String,
    pub pm25: String,
    pub pm10: String,
    pub o3: String,
    pub no2: String,
}

/// Recorded in place of a [`StationReport`] when a fetch did not yield data.
/// Carries only enough to identify the station and the moment of failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    pub timestamp: String, // crawler-local time at classification
    pub error: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One fetch result, success or failure. Every station fetch produces
/// exactly one `Reading`; fetch-side errors never propagate as `Err`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Success(StationReport),
    Failure(FetchFailure),
}

/// CSV columns for the success variant, in `StationReport` field order.
pub const SUCCESS_COLUMNS: &[&str] = &[
    "timestamp",
    "station_id",
    "city_name",
    "url",
    "latitude",
    "longitude",
    "aqi",
    "co",
    "temperature",
    "wind",
    "atmospheric_pressure",
    "humidity",
    "pm25",
    "pm10",
    "o3",
    "no2",
];

/// CSV columns for the failure variant.
pub const FAILURE_COLUMNS: &[&str] = &["timestamp", "error", "latitude", "longitude"];

impl Reading {
    /// The fixed column schema for this variant. The record writer derives
    /// the header of a new file from the first reading of the batch, so a
    /// batch must not mix variants if the columns are to line up — see
    /// `records::append_readings`.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Reading::Success(_) => SUCCESS_COLUMNS,
            Reading::Failure(_) => FAILURE_COLUMNS,
        }
    }

    /// One CSV row matching [`Reading::columns`].
    pub fn row(&self) -> Vec<String> {
        match self {
            Reading::Success(r) => vec![
                r.timestamp.clone(),
                r.station_id.to_string(),
                r.city_name.clone(),
                r.url.clone(),
                r.latitude.to_string(),
                r.longitude.to_string(),
                r.aqi.clone(),
                r.co.clone(),
                r.temperature.clone(),
                r.wind.clone(),
                r.atmospheric_pressure.clone(),
                r.humidity.clone(),
                r.pm25.clone(),
                r.pm10.clone(),
                r.o3.clone(),
                r.no2.clone(),
            ],
            Reading::Failure(f) => vec![
                f.timestamp.clone(),
                f.error.clone(),
                f.latitude.to_string(),
                f.longitude.to_string(),
            ],
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reading::Success(_))
    }

    /// The error message for failure readings, `None` for successes.
    pub fn error(&self) -> Option<&str> {
        match self {
            Reading::Success(_) => None,
            Reading::Failure(f) => Some(&f.error),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort a crawl run. Fetch-side problems never appear here —
/// they are converted into failure `Reading`s. Only configuration problems
/// and write-side I/O failures propagate.
#[derive(Debug)]
pub enum CrawlError {
    /// The cities configuration file could not be read or parsed.
    Config(String),
    /// The per-city record file could not be created or appended to.
    Write { city: String, source: std::io::Error },
}

impl std::fmt::Display for CrawlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrawlError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CrawlError::Write { city, source } => {
                write!(f, "Write error for city {}: {}", city, source)
            }
        }
    }
}

impl std::error::Error for CrawlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrawlError::Config(_) => None,
            CrawlError::Write { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
