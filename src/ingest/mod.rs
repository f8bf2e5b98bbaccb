/// Ingest clients for external air quality data providers.
///
/// Submodules:
/// - `waqi` — World Air Quality Index project feed (api.waqi.info).

pub mod waqi;
