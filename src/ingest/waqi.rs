/// WAQI (World Air Quality Index) feed client
///
/// Retrieves the nearest-station feed for a geographic point from the WAQI
/// API and normalizes it into a `Reading`. One synchronous GET per station,
/// no retries — every outcome, including transport failure, is folded into
/// a success or failure `Reading` so a single bad station never aborts a run.
///
/// API documentation: https://aqicn.org/json-api/doc/
/// Feed endpoint: https://api.waqi.info/feed/geo:{lat};{lon}/?token=...

use chrono::{FixedOffset, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::model::{
    ERR_API_CONNECTION, ERR_NO_DATA, FetchFailure, NOT_AVAILABLE, Reading, StationReport,
};
use crate::stations::{CrawlerConfig, Station};

// ============================================================================
// WAQI API Response Structures
// ============================================================================

/// Top-level feed response. `data` is only present when `status` is "ok";
/// on error responses the field holds a bare message string instead, which
/// deserializes as `None` here.
#[derive(Debug, Deserialize)]
pub struct FeedResponse {
    pub status: String,
    #[serde(default, deserialize_with = "feed_data_or_none")]
    pub data: Option<FeedData>,
}

/// Station feed payload.
#[derive(Debug, Deserialize)]
pub struct FeedData {
    /// Station id ("idx" in the payload).
    pub idx: i64,
    /// Overall AQI. A number normally, the string "-" for stale stations.
    pub aqi: serde_json::Value,
    pub time: FeedTime,
    pub city: FeedCity,
    /// Individual AQI per pollutant/weather code. Any entry may be absent.
    #[serde(default)]
    pub iaqi: HashMap<String, IaqiEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FeedTime {
    /// Station-local observation time, "YYYY-MM-DD HH:MM:SS".
    pub s: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedCity {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct IaqiEntry {
    /// Measured value. A number normally, occasionally a string.
    #[serde(default)]
    pub v: Option<serde_json::Value>,
}

/// Tolerates the error-shape `data` (a plain string) without failing the
/// whole deserialization; the caller treats `None` as a not-ok payload.
fn feed_data_or_none<'de, D>(deserializer: D) -> Result<Option<FeedData>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Builds the geo-feed URL for a station.
pub fn build_feed_url(base_url: &str, latitude: f64, longitude: f64, token: &str) -> String {
    format!(
        "{}/feed/geo:{};{}/?token={}",
        base_url.trim_end_matches('/'),
        latitude,
        longitude,
        token
    )
}

/// Fetches the feed for one station and classifies the outcome.
///
/// Never returns an error: transport failures, non-200 statuses, and not-ok
/// payloads all become failure `Reading`s carrying the configured local time.
pub fn fetch_station(
    client: &reqwest::blocking::Client,
    station: &Station,
    cfg: &CrawlerConfig,
) -> Reading {
    let url = build_feed_url(
        &cfg.base_url,
        station.latitude,
        station.longitude,
        &cfg.api_token,
    );
    let stamp = local_stamp(cfg.tz_offset());

    let response = match client.get(&url).send() {
        Ok(r) => r,
        Err(e) => return failure(station, &stamp, e.to_string()),
    };

    if !response.status().is_success() {
        return failure(station, &stamp, ERR_API_CONNECTION.to_string());
    }

    let body = match response.text() {
        Ok(b) => b,
        Err(e) => return failure(station, &stamp, e.to_string()),
    };

    reading_from_body(&body, station, &stamp)
}

/// Classifies a 200-status response body into a `Reading`.
///
/// Split out from `fetch_station` so payload handling is testable without a
/// network. `failure_stamp` is the timestamp recorded on failure variants;
/// success variants carry the provider's own observation time.
pub fn reading_from_body(body: &str, station: &Station, failure_stamp: &str) -> Reading {
    let payload: FeedResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => return failure(station, failure_stamp, e.to_string()),
    };

    if payload.status != "ok" {
        return failure(station, failure_stamp, ERR_NO_DATA.to_string());
    }

    let Some(data) = payload.data else {
        // "ok" status with an unusable data object gets the same message:
        // the provider said yes but delivered nothing.
        return failure(station, failure_stamp, ERR_NO_DATA.to_string());
    };

    Reading::Success(StationReport {
        timestamp: data.time.s,
        station_id: data.idx,
        city_name: data.city.name,
        url: data.city.url,
        latitude: station.latitude,
        longitude: station.longitude,
        aqi: scalar_string(&data.aqi),
        co: measurement(&data.iaqi, "co"),
        temperature: measurement(&data.iaqi, "t"),
        wind: measurement(&data.iaqi, "w"),
        atmospheric_pressure: measurement(&data.iaqi, "p"),
        humidity: measurement(&data.iaqi, "h"),
        pm25: measurement(&data.iaqi, "pm25"),
        pm10: measurement(&data.iaqi, "pm10"),
        o3: measurement(&data.iaqi, "o3"),
        no2: measurement(&data.iaqi, "no2"),
    })
}

/// Current time in the configured zone, "YYYY-MM-DD HH:MM:SS".
pub fn local_stamp(offset: FixedOffset) -> String {
    Utc::now()
        .with_timezone(&offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn failure(station: &Station, stamp: &str, error: String) -> Reading {
    Reading::Failure(FetchFailure {
        timestamp: stamp.to_string(),
        error,
        latitude: station.latitude,
        longitude: station.longitude,
    })
}

/// Looks up one pollutant code in the `iaqi` map. A missing entry, a missing
/// `v` field, and a non-scalar `v` all yield the same sentinel.
fn measurement(iaqi: &HashMap<String, IaqiEntry>, code: &str) -> String {
    iaqi.get(code)
        .and_then(|entry| entry.v.as_ref())
        .map(scalar_string)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Renders a scalar JSON value as the string stored in the record.
fn scalar_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
