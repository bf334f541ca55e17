//! Append-only CSV log of sampled records, including the raw hex register
//! words so each float decode can be validated offline.

use anyhow::{Context, Result};
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::measure::reading::{CompensationResult, SensorReading};

const CSV_HEADER: &str =
    "Timestamp,Temperature,Hex_Temp,Raw_EC,Hex_Raw_EC,Sensor_Default_EC,Smart_Calc_EC,Deviation";

pub struct CsvLogger {
    file: File,
    path: PathBuf,
}

impl CsvLogger {
    /// Open (or create) the log file, writing the header only when the file
    /// is new.
    pub fn open(path: &Path) -> Result<Self> {
        let exists = path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open CSV log {}", path.display()))?;
        if !exists {
            writeln!(file, "{CSV_HEADER}").context("Failed to write CSV header")?;
        }
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record row and flush it to disk.
    pub fn append(&mut self, reading: &SensorReading, result: &CompensationResult) -> Result<()> {
        let deviation = reading.sensor_ec as f64 - result.smart_ec;
        writeln!(
            self.file,
            "{},{:.4},{},{:.4},{},{:.4},{:.4},{:.4}",
            reading.timestamp.format("%Y-%m-%d %H:%M:%S"),
            reading.temperature,
            reading.raw_hex_temp,
            reading.raw_ec,
            reading.raw_hex_ec,
            reading.sensor_ec,
            result.smart_ec,
            deviation,
        )
        .context("Failed to append CSV row")?;
        self.file.flush().context("Failed to flush CSV log")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn sample() -> (SensorReading, CompensationResult) {
        (
            SensorReading {
                temperature: 10.0,
                raw_ec: 13.0,
                sensor_ec: 14.5,
                timestamp: Local::now(),
                raw_hex_temp: "41200000".to_string(),
                raw_hex_ec: "41500000".to_string(),
            },
            CompensationResult {
                smart_ec: 17.9558,
                k_used: 0.0184,
            },
        )
    }

    #[test]
    fn header_written_once_and_rows_appended() {
        let path = std::env::temp_dir().join(format!("ecmon_csv_test_{}.csv", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let (reading, result) = sample();
        {
            let mut log = CsvLogger::open(&path).unwrap();
            log.append(&reading, &result).unwrap();
        }
        {
            // reopening an existing file must not repeat the header
            let mut log = CsvLogger::open(&path).unwrap();
            log.append(&reading, &result).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Timestamp,"));
        assert!(lines[1].contains("41200000"));
        assert!(lines[1].contains("41500000"));
        // deviation = sensor_ec - smart_ec
        assert!(lines[1].ends_with("-3.4558"));
    }
}
