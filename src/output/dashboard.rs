//! Full-screen terminal dashboard: one redraw per record, showing the
//! decoded values, the live formula substitution, and validation of both
//! EC outputs against a reference standard solution.

use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};

use crate::measure::{
    compensation::{self, SENSOR_FIXED_K},
    reading::{CompensationResult, SensorReading},
};

/// Reference standard the readings are scored against, in mS/cm. The
/// correct value is deployment-specific, so it is a parameter with a CLI
/// override rather than a constant of the measurement core.
pub const DEFAULT_STANDARD: f64 = 12.88;
/// Pass/fail tolerance around the standard, in mS/cm.
pub const TOLERANCE: f64 = 0.10;

/// Validation of both EC outputs against the reference standard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationMetrics {
    pub sensor_error: f64,
    pub smart_error: f64,
    /// Positive when the compensated value sits closer to the standard
    /// than the sensor's own output.
    pub improvement: f64,
    pub sensor_pass: bool,
    pub smart_pass: bool,
}

impl ValidationMetrics {
    pub fn compute(sensor_ec: f64, smart_ec: f64, standard: f64) -> Self {
        let sensor_error = (sensor_ec - standard).abs();
        let smart_error = (smart_ec - standard).abs();
        Self {
            sensor_error,
            smart_error,
            improvement: sensor_error - smart_error,
            sensor_pass: sensor_error <= TOLERANCE,
            smart_pass: smart_error <= TOLERANCE,
        }
    }
}

pub struct Dashboard {
    port_name: String,
    standard: f64,
    csv_path: String,
    samples: u64,
}

impl Dashboard {
    pub fn new(port_name: String, standard: f64, csv_path: String) -> Self {
        Self {
            port_name,
            standard,
            csv_path,
            samples: 0,
        }
    }

    pub fn render(&mut self, reading: &SensorReading, result: &CompensationResult) -> Result<()> {
        self.samples += 1;

        let temp = reading.temperature as f64;
        let raw_ec = reading.raw_ec as f64;
        let sensor_ec = reading.sensor_ec as f64;
        let metrics = ValidationMetrics::compute(sensor_ec, result.smart_ec, self.standard);

        let mut stdout = io::stdout();
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;

        println!("╔═══════════════════════════════════════════════════════════════════╗");
        println!("║              EC SMART LOGGER — LIVE VALIDATION                    ║");
        println!("╚═══════════════════════════════════════════════════════════════════╝");
        println!();
        println!(
            "  Port: {} | Samples: {} | Time: {}",
            self.port_name,
            self.samples,
            reading.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
        println!(
            "  Temperature: {temp:.2}°C (0x{})  →  {}",
            reading.raw_hex_temp,
            compensation::temp_condition(temp)
        );
        println!(
            "  Dynamic k = {:.4} ({:.2}%) — sensor's fixed k = {SENSOR_FIXED_K:.4}",
            result.k_used,
            result.k_used * 100.0
        );
        println!();
        println!("  C₂₅ = Raw_EC / (1 + k × (Temp - 25))");
        println!(
            "  Sensor: {sensor_ec:.2} = {raw_ec:.2} / {:.4}   (fixed k)",
            1.0 + SENSOR_FIXED_K * (temp - 25.0)
        );
        println!(
            "  Smart:  {:.2} = {raw_ec:.2} / {:.4}   (dynamic k)",
            result.smart_ec,
            1.0 + result.k_used * (temp - 25.0)
        );
        println!();
        println!(
            "  Standard: {:.2} mS/cm @ 25°C, tolerance ±{TOLERANCE:.2}",
            self.standard
        );
        println!(
            "  Sensor error: {:>8.4} mS/cm  {}",
            metrics.sensor_error,
            pass_label(metrics.sensor_pass)
        );
        println!(
            "  Smart error:  {:>8.4} mS/cm  {}",
            metrics.smart_error,
            pass_label(metrics.smart_pass)
        );
        println!(
            "  Error reduction: {:.4} mS/cm ({:.1}%)",
            metrics.improvement,
            if metrics.sensor_error > 0.0 {
                metrics.improvement / metrics.sensor_error * 100.0
            } else {
                0.0
            }
        );
        println!();
        println!("  ┌─────────────────────────────────────────────────────────────┐");
        println!(
            "  │ Temperature: {temp:>9.2} °C     [hex {}]               │",
            reading.raw_hex_temp
        );
        println!(
            "  │ Raw EC:      {raw_ec:>9.2} mS/cm  [hex {}]               │",
            reading.raw_hex_ec
        );
        println!(
            "  │ Sensor EC:   {sensor_ec:>9.2} mS/cm  {}                       │",
            pass_label(metrics.sensor_pass)
        );
        println!(
            "  │ Smart EC:    {:>9.2} mS/cm  {}                       │",
            result.smart_ec,
            pass_label(metrics.smart_pass)
        );
        println!("  └─────────────────────────────────────────────────────────────┘");
        println!();
        println!("  Logging to {} — press Ctrl+C to stop", self.csv_path);
        stdout.flush()?;
        Ok(())
    }
}

fn pass_label(pass: bool) -> &'static str {
    if pass {
        "✅ PASS"
    } else {
        "❌ FAIL"
    }
}
