/// City and station registry for the air quality crawler.
///
/// Defines the canonical list of monitored cities and their station
/// coordinates, along with the crawler-wide settings (API token, provider
/// base URL, local-time offset, output root). This is the single source of
/// truth for what gets crawled — the orchestrator receives a `CrawlerConfig`
/// value and never reaches for module-level globals.
///
/// The built-in registry covers the three Vietnamese cities the service was
/// stood up for; a TOML file with the same shape can replace or extend it.

use chrono::FixedOffset;
use serde::Deserialize;
use std::path::Path;

use crate::model::CrawlError;

/// Default provider endpoint. The feed path and token are appended per
/// station by `ingest::waqi::build_feed_url`.
pub const DEFAULT_BASE_URL: &str = "https://api.waqi.info";

/// Default output root for the monthly record files.
pub const DEFAULT_RESULT_DIR: &str = "result";

/// Default local-time offset: GMT+7 (Indochina Time, no DST).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

// ---------------------------------------------------------------------------
// Registry types
// ---------------------------------------------------------------------------

/// One fixed geographic point queried for air quality data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Station {
    /// WGS84 latitude, signed decimal degrees.
    pub latitude: f64,
    /// WGS84 longitude, signed decimal degrees.
    pub longitude: f64,
}

/// A named group of stations sharing one monthly output file series.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct City {
    /// Machine name, unique across the registry. Used as a path segment, so
    /// it must stay filesystem-safe (ASCII, no separators).
    pub key: String,
    /// Human-readable name, shown in reports only.
    pub display_name: String,
    /// Stations queried for this city, in crawl order.
    pub stations: Vec<Station>,
}

/// Everything a crawl run needs, loaded once at startup and passed by
/// reference from there on.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// WAQI API token. Usually overridden from the environment; an empty
    /// token is accepted here and rejected by the provider.
    #[serde(default)]
    pub api_token: String,
    /// Provider base URL, swappable for tests.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Offset from UTC, in whole hours, used for failure timestamps and
    /// monthly file rotation.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
    /// Root directory for the per-city record files.
    #[serde(default = "default_result_dir")]
    pub result_dir: String,
    /// Cities in crawl order.
    pub cities: Vec<City>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_utc_offset() -> i32 {
    DEFAULT_UTC_OFFSET_HOURS
}

fn default_result_dir() -> String {
    DEFAULT_RESULT_DIR.to_string()
}

impl CrawlerConfig {
    /// The registry the service shipped with: Hà Nội (8 stations),
    /// Thừa Thiên Huế (1), Đà Nẵng (2).
    pub fn builtin() -> Self {
        let station = |latitude: f64, longitude: f64| Station {
            latitude,
            longitude,
        };
        CrawlerConfig {
            api_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            result_dir: DEFAULT_RESULT_DIR.to_string(),
            cities: vec![
                City {
                    key: "hanoi".to_string(),
                    display_name: "Hà Nội".to_string(),
                    stations: vec![
                        station(21.0811211, 105.8180306),
                        station(21.01525, 105.80013),
                        station(21.0491, 105.8831),
                        station(21.0215063, 105.8188748),
                        station(21.035584, 105.852771),
                        station(21.04975, 105.74187),
                        station(21.148273, 105.913306),
                        station(21.002383, 105.718038),
                    ],
                },
                City {
                    key: "hue".to_string(),
                    display_name: "Thừa Thiên Huế".to_string(),
                    stations: vec![station(16.46226, 107.596351)],
                },
                City {
                    key: "danang".to_string(),
                    display_name: "Đà Nẵng".to_string(),
                    stations: vec![
                        station(16.043252, 108.206826),
                        station(16.074, 108.217),
                    ],
                },
            ],
        }
    }

    /// Loads a registry from a TOML file with the same shape as the builtin.
    pub fn load(path: &Path) -> Result<Self, CrawlError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CrawlError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    /// Parses a registry from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self, CrawlError> {
        toml::from_str(raw).map_err(|e| CrawlError::Config(e.to_string()))
    }

    /// The configured offset as a chrono `FixedOffset`.
    pub fn tz_offset(&self) -> FixedOffset {
        // Clamped rather than rejected: a nonsense offset in the config file
        // should not take the whole crawl down.
        let hours = self.utc_offset_hours.clamp(-23, 23);
        FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }

    /// Total station count across all cities.
    pub fn station_count(&self) -> usize {
        self.cities.iter().map(|c| c.stations.len()).sum()
    }

    /// Looks up a city by key. Returns `None` if not found.
    pub fn find_city(&self, key: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.key == key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_city_keys_are_filesystem_safe() {
        // City keys become path segments; anything outside [a-z0-9_-]
        // would produce surprising paths or fail on some filesystems.
        for city in CrawlerConfig::builtin().cities {
            assert!(
                city.key
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'),
                "city key '{}' is not filesystem-safe",
                city.key
            );
        }
    }

    #[test]
    fn test_builtin_registry_has_no_duplicate_keys() {
        let mut seen = std::collections::HashSet::new();
        for city in CrawlerConfig::builtin().cities {
            assert!(
                seen.insert(city.key.clone()),
                "duplicate city key '{}' in builtin registry",
                city.key
            );
        }
    }

    #[test]
    fn test_builtin_registry_contains_expected_cities() {
        let cfg = CrawlerConfig::builtin();
        let keys: Vec<_> = cfg.cities.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["hanoi", "hue", "danang"]);
        assert_eq!(cfg.find_city("hanoi").unwrap().stations.len(), 8);
        assert_eq!(cfg.find_city("hue").unwrap().stations.len(), 1);
        assert_eq!(cfg.find_city("danang").unwrap().stations.len(), 2);
        assert_eq!(cfg.station_count(), 11);
    }

    #[test]
    fn test_builtin_coordinates_are_plausible_for_vietnam() {
        for city in CrawlerConfig::builtin().cities {
            for s in &city.stations {
                assert!(
                    (8.0..=24.0).contains(&s.latitude),
                    "latitude {} out of range for '{}'",
                    s.latitude,
                    city.key
                );
                assert!(
                    (102.0..=110.0).contains(&s.longitude),
                    "longitude {} out of range for '{}'",
                    s.longitude,
                    city.key
                );
            }
        }
    }

    #[test]
    fn test_find_city_returns_none_for_unknown_key() {
        assert!(CrawlerConfig::builtin().find_city("saigon").is_none());
    }

    #[test]
    fn test_tz_offset_defaults_to_gmt_plus_7() {
        let cfg = CrawlerConfig::builtin();
        assert_eq!(cfg.tz_offset().local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn test_tz_offset_clamps_nonsense_values() {
        let mut cfg = CrawlerConfig::builtin();
        cfg.utc_offset_hours = 500;
        assert_eq!(cfg.tz_offset().local_minus_utc(), 23 * 3600);
    }

    #[test]
    fn test_config_parses_from_toml() {
        let raw = r#"
            api_token = "secret"
            utc_offset_hours = 7

            [[cities]]
            key = "hanoi"
            display_name = "Hà Nội"

            [[cities.stations]]
            latitude = 21.0811211
            longitude = 105.8180306

            [[cities.stations]]
            latitude = 21.01525
            longitude = 105.80013
        "#;
        let cfg = CrawlerConfig::from_toml(raw).expect("valid config should parse");
        assert_eq!(cfg.api_token, "secret");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL); // defaulted
        assert_eq!(cfg.result_dir, DEFAULT_RESULT_DIR); // defaulted
        assert_eq!(cfg.cities.len(), 1);
        assert_eq!(cfg.cities[0].stations.len(), 2);
        assert_eq!(cfg.cities[0].display_name, "Hà Nội");
    }

    #[test]
    fn test_config_rejects_malformed_toml() {
        let err = CrawlerConfig::from_toml("cities = 3").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
