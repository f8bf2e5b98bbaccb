/// Air quality crawler for Vietnamese cities.
///
/// Periodically invoked (typically from cron) to fetch the WAQI feed for a
/// fixed set of station coordinates and append the normalized readings to
/// monthly per-city CSV files.

pub mod crawl;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod records;
pub mod stations;
