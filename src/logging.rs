/// Structured logging for the air quality crawler.
///
/// Provides context-rich logging with city identifiers, timestamps, and
/// severity levels. Supports both console output and file-based logging
/// for cron-driven runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::{ERR_API_CONNECTION, ERR_NO_DATA};
use crate::stations::Station;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Waqi,
    Csv,
    Sys,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Waqi => write!(f, "WAQI"),
            DataSource::Csv => write!(f, "CSV"),
            DataSource::Sys => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - station may be offline, out of coverage, or the provider
    /// is having a bad day; cannot tell from one fetch
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        *LOGGER.lock().unwrap() = Some(logger);
    }

    /// Log a message with the global logger
    fn log(&self, level: LogLevel, source: &DataSource, city_key: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

        // Format the log entry
        let city_part = city_key.map(|c| format!(" [{}]", c)).unwrap_or_default();
        let log_entry = format!("{} {} {}{}: {}", timestamp, level, source, city_part, message);

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, city_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, city_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

/// Log a general informational message
pub fn info(source: DataSource, city_key: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Info, &source, city_key, message);
    }
}

/// Log a warning message
pub fn warn(source: DataSource, city_key: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Warning, &source, city_key, message);
    }
}

/// Log an error message
pub fn error(source: DataSource, city_key: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Error, &source, city_key, message);
    }
}

/// Log a debug message
pub fn debug(source: DataSource, city_key: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Debug, &source, city_key, message);
    }
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a WAQI fetch failure based on the recorded error message
pub fn classify_waqi_failure(error_message: &str) -> FailureType {
    // Provider answered but reported no data - the station may simply be
    // offline or out of coverage
    if error_message == ERR_NO_DATA {
        FailureType::Unknown
    }
    // Non-200 statuses suggest provider or credential issues
    else if error_message == ERR_API_CONNECTION {
        FailureType::Unexpected
    }
    // Transport and decode errors carry the underlying message
    else if error_message.contains("error decoding")
        || error_message.contains("expected")
        || error_message.contains("dns")
        || error_message.contains("connect")
    {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a station fetch failure with automatic classification
pub fn log_waqi_failure(city_key: &str, station: &Station, error_message: &str) {
    let failure_type = classify_waqi_failure(error_message);

    let message = format!(
        "fetch geo:{};{} failed [{}]: {}",
        station.latitude, station.longitude, failure_type, error_message
    );

    match failure_type {
        FailureType::Unexpected => error(DataSource::Waqi, Some(city_key), &message),
        FailureType::Unknown => warn(DataSource::Waqi, Some(city_key), &message),
    }
}

// ---------------------------------------------------------------------------
// Crawl Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a completed crawl run
pub fn log_crawl_summary(total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Crawl complete: {}/{} stations successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(DataSource::Sys, None, &message);
    } else if successful == 0 {
        error(DataSource::Sys, None, &message);
    } else {
        warn(DataSource::Sys, None, &message);
    }
}
