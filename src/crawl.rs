/// Run orchestrator: one full crawl over the configured cities.
///
/// Strictly sequential — one request in flight at a time, stations visited
/// in configuration order within each city, cities in configuration order.
/// Insertion order into the record files and per-city batch grouping are
/// externally observable, so no parallelism is introduced here.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::path::Path;

use crate::ingest::waqi;
use crate::logging::{self, DataSource};
use crate::model::{CrawlError, Reading};
use crate::records;
use crate::stations::{CrawlerConfig, Station};

/// All readings collected for one city in one run, in fetch order.
#[derive(Debug, Clone, Serialize)]
pub struct CityBatch {
    pub city_key: String,
    pub display_name: String,
    pub readings: Vec<Reading>,
}

/// Current time in the configured zone.
pub fn local_now(cfg: &CrawlerConfig) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&cfg.tz_offset())
}

/// Crawls every configured station against the live WAQI API and appends
/// each city's batch to its monthly record file.
pub fn crawl_all_cities(
    cfg: &CrawlerConfig,
    client: &reqwest::blocking::Client,
) -> Result<Vec<CityBatch>, CrawlError> {
    let now = local_now(cfg);
    run_with_fetcher(cfg, now, |station| waqi::fetch_station(client, station, cfg))
}

/// The crawl loop with the fetch function injected, so tests can drive it
/// without a network. Fetch failures are recorded and the run continues;
/// a write failure aborts the run and propagates.
pub fn run_with_fetcher<F>(
    cfg: &CrawlerConfig,
    now: DateTime<FixedOffset>,
    mut fetch: F,
) -> Result<Vec<CityBatch>, CrawlError>
where
    F: FnMut(&Station) -> Reading,
{
    let root = Path::new(&cfg.result_dir);
    let mut results = Vec::with_capacity(cfg.cities.len());

    for city in &cfg.cities {
        let mut readings = Vec::with_capacity(city.stations.len());
        for station in &city.stations {
            let reading = fetch(station);
            if let Some(err) = reading.error() {
                logging::log_waqi_failure(&city.key, station, err);
            }
            readings.push(reading);
        }

        let written = records::append_readings(root, &city.key, &readings, now).map_err(
            |source| CrawlError::Write {
                city: city.key.clone(),
                source,
            },
        )?;
        if let Some(path) = &written {
            logging::debug(
                DataSource::Csv,
                Some(&city.key),
                &format!("appended {} rows to {}", readings.len(), path.display()),
            );
        }

        let ok = readings.iter().filter(|r| r.is_success()).count();
        logging::info(
            DataSource::Sys,
            Some(&city.key),
            &format!("{}/{} stations reported", ok, readings.len()),
        );

        results.push(CityBatch {
            city_key: city.key.clone(),
            display_name: city.display_name.clone(),
            readings,
        });
    }

    Ok(results)
}

/// Renders the run's results as a pretty-printed `city_key → readings`
/// JSON mapping, cities in crawl order.
pub fn render_report(batches: &[CityBatch]) -> serde_json::Result<String> {
    let mut map = serde_json::Map::new();
    for batch in batches {
        map.insert(
            batch.city_key.clone(),
            serde_json::to_value(&batch.readings)?,
        );
    }
    serde_json::to_string_pretty(&serde_json::Value::Object(map))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
