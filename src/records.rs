/// Monthly-rotating CSV record writer.
///
/// One physical file per (city, year, month), header written on creation,
/// rows appended on every run within the month. The file is never truncated
/// or rewritten — append only, no deduplication between runs. The caller
/// supplies the current local time explicitly so rotation is testable
/// against arbitrary clocks.

use chrono::{DateTime, Datelike, FixedOffset};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::model::Reading;

/// Destination file for a city in the month of `now`:
/// `<root>/<city_key>/air_quality_<city_key>_<MM>_<YYYY>.csv`.
pub fn monthly_path(root: &Path, city_key: &str, now: DateTime<FixedOffset>) -> PathBuf {
    root.join(city_key).join(format!(
        "air_quality_{}_{:02}_{}.csv",
        city_key,
        now.month(),
        now.year()
    ))
}

/// Appends a batch of readings to the city's file for the current month,
/// creating directories, the file, and its header row as needed.
///
/// The header is derived from the first reading's variant, so a batch must
/// be variant-homogeneous for the columns to line up; the orchestrator
/// produces batches in fetch order and this writer does not reorder them.
/// An empty batch is a no-op and returns `Ok(None)`.
pub fn append_readings(
    root: &Path,
    city_key: &str,
    readings: &[Reading],
    now: DateTime<FixedOffset>,
) -> io::Result<Option<PathBuf>> {
    let Some(first) = readings.first() else {
        return Ok(None);
    };

    let path = monthly_path(root, city_key, now);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Existence decides header emission only; the open below creates the
    // file either way.
    let existed = path.exists();

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    // Flexible: a failure reading inside a success-headed batch writes a
    // shorter row rather than aborting the run mid-write.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(file);

    if !existed {
        writer.write_record(first.columns()).map_err(io::Error::other)?;
    }

    for reading in readings {
        writer.write_record(reading.row()).map_err(io::Error::other)?;
    }

    writer.flush()?;
    Ok(Some(path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ERR_API_CONNECTION, FAILURE_COLUMNS, FetchFailure, StationReport};
    use chrono::TimeZone;

    fn at(year: i32, month: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(year, month, 15, 12, 0, 0)
            .unwrap()
    }

    fn success(ts: &str) -> Reading {
        Reading::Success(StationReport {
            timestamp: ts.to_string(),
            station_id: 1,
            city_name: "Hanoi".to_string(),
            url: "http://x".to_string(),
            latitude: 21.0,
            longitude: 105.8,
            aqi: "42".to_string(),
            co: "N/A".to_string(),
            temperature: "28".to_string(),
            wind: "N/A".to_string(),
            atmospheric_pressure: "1012".to_string(),
            humidity: "80".to_string(),
            pm25: "15".to_string(),
            pm10: "N/A".to_string(),
            o3: "N/A".to_string(),
            no2: "N/A".to_string(),
        })
    }

    fn failure(ts: &str) -> Reading {
        Reading::Failure(FetchFailure {
            timestamp: ts.to_string(),
            error: ERR_API_CONNECTION.to_string(),
            latitude: 21.0,
            longitude: 105.8,
        })
    }

    #[test]
    fn test_monthly_path_zero_pads_month() {
        let path = monthly_path(Path::new("result"), "hanoi", at(2024, 3));
        assert_eq!(
            path,
            Path::new("result/hanoi/air_quality_hanoi_03_2024.csv")
        );
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let written = append_readings(dir.path(), "hanoi", &[], at(2024, 1)).unwrap();
        assert!(written.is_none());
        assert!(!dir.path().join("hanoi").exists());
    }

    #[test]
    fn test_two_appends_same_month_write_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let batch1 = vec![success("2024-01-01 10:00:00"), success("2024-01-01 10:01:00")];
        let batch2 = vec![success("2024-01-01 11:00:00")];

        let path = append_readings(dir.path(), "hanoi", &batch1, at(2024, 1))
            .unwrap()
            .unwrap();
        append_readings(dir.path(), "hanoi", &batch2, at(2024, 1)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1 + batch1.len() + batch2.len());
        assert!(lines[0].starts_with("timestamp,station_id,"));
        // Rows land in call order.
        assert!(lines[1].starts_with("2024-01-01 10:00:00,"));
        assert!(lines[3].starts_with("2024-01-01 11:00:00,"));
        // Exactly one header.
        assert_eq!(
            lines.iter().filter(|l| l.starts_with("timestamp,")).count(),
            1
        );
    }

    #[test]
    fn test_different_months_rotate_to_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let jan = append_readings(dir.path(), "hue", &[success("a")], at(2024, 1))
            .unwrap()
            .unwrap();
        let feb = append_readings(dir.path(), "hue", &[success("b")], at(2024, 2))
            .unwrap()
            .unwrap();

        assert_ne!(jan, feb);
        for path in [&jan, &feb] {
            let contents = fs::read_to_string(path).unwrap();
            assert_eq!(contents.lines().count(), 2); // own header + one row
            assert!(contents.starts_with("timestamp,"));
        }
    }

    #[test]
    fn test_failure_first_batch_writes_failure_schema_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = append_readings(dir.path(), "danang", &[failure("2024-01-01 10:00:00")], at(2024, 1))
            .unwrap()
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], FAILURE_COLUMNS.join(","));
        assert_eq!(lines[1].split(',').count(), 4);
    }

    #[test]
    fn test_mixed_batch_appends_failure_rows_under_success_header() {
        // One dead station in a multi-station city is the normal case: the
        // batch leads with a success reading and carries a short failure row.
        // The write must go through in full, not error after a partial write.
        let dir = tempfile::tempdir().unwrap();
        let batch = vec![
            success("2024-01-01 10:00:00"),
            failure("2024-01-01 10:00:05"),
            success("2024-01-01 10:00:10"),
        ];
        let path = append_readings(dir.path(), "hanoi", &batch, at(2024, 1))
            .unwrap()
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4); // header + all three rows
        assert!(lines[0].starts_with("timestamp,station_id,"));
        assert_eq!(lines[1].split(',').count(), 16);
        assert_eq!(lines[2].split(',').count(), 4);
        assert!(lines[2].contains(ERR_API_CONNECTION));
        assert_eq!(lines[3].split(',').count(), 16);
    }

    #[test]
    fn test_append_never_truncates_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        append_readings(dir.path(), "hanoi", &[success("first")], at(2024, 1)).unwrap();
        let path = append_readings(dir.path(), "hanoi", &[success("second")], at(2024, 1))
            .unwrap()
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("first"));
        assert!(contents.contains("second"));
    }

    #[test]
    fn test_duplicate_batches_produce_duplicate_rows() {
        // Re-running within the month appends without deduplication.
        let dir = tempfile::tempdir().unwrap();
        let batch = vec![success("2024-01-01 10:00:00")];
        append_readings(dir.path(), "hanoi", &batch, at(2024, 1)).unwrap();
        let path = append_readings(dir.path(), "hanoi", &batch, at(2024, 1))
            .unwrap()
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents
                .lines()
                .filter(|l| l.starts_with("2024-01-01 10:00:00,"))
                .count(),
            2
        );
    }
}
