//! Temperature compensation of raw EC readings.
//!
//! The sensor firmware compensates with a fixed 2%/degC coefficient, which
//! over-corrects at low temperatures. This module applies a coefficient
//! chosen from calibration data per temperature band instead.

use anyhow::{anyhow, Result};

/// The fixed coefficient the sensor itself uses, kept for comparison.
pub const SENSOR_FIXED_K: f64 = 0.0200;

/// Per-degree compensation coefficient for the given temperature.
/// Piecewise-constant over ascending bands, first match wins.
pub fn dynamic_k(temp: f64) -> f64 {
    if temp <= 5.0 {
        0.0180
    } else if temp <= 10.0 {
        0.0184
    } else if temp <= 15.0 {
        0.0190
    } else if temp <= 25.0 {
        0.0190
    } else if temp <= 30.0 {
        0.0192
    } else {
        0.0194
    }
}

/// Normalize a raw EC reading to its 25 degC equivalent:
/// `raw_ec / (1 + k(temp) * (temp - 25))`.
///
/// The denominator cannot reach zero for realistic sensor temperatures, but
/// a degenerate value must not silently propagate as infinity or NaN.
pub fn compensate(raw_ec: f64, temp: f64) -> Result<f64> {
    let denominator = 1.0 + dynamic_k(temp) * (temp - 25.0);
    if denominator <= 0.0 {
        return Err(anyhow!(
            "Degenerate compensation denominator {denominator:.4} at {temp:.2} degC"
        ));
    }
    Ok(raw_ec / denominator)
}

/// Humane label for the temperature band, used by the dashboard.
pub fn temp_condition(temp: f64) -> &'static str {
    if temp <= 5.0 {
        "Very Cold Range (≤5°C)"
    } else if temp <= 10.0 {
        "Cold Range (5-10°C)"
    } else if temp <= 15.0 {
        "Cool Range (10-15°C)"
    } else if temp <= 25.0 {
        "Normal Range (15-25°C)"
    } else {
        "Warm Range (>25°C)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_table_boundaries() {
        assert_eq!(dynamic_k(5.0), 0.0180);
        assert_eq!(dynamic_k(5.01), 0.0184);
        assert_eq!(dynamic_k(25.0), 0.0190);
        assert_eq!(dynamic_k(25.01), 0.0192);
        assert_eq!(dynamic_k(31.0), 0.0194);
    }

    #[test]
    fn k_is_non_decreasing_in_temperature() {
        let mut last = f64::MIN;
        let mut temp = -10.0;
        while temp <= 40.0 {
            let k = dynamic_k(temp);
            assert!(k >= last, "k decreased at {temp} degC");
            last = k;
            temp += 0.25;
        }
    }

    #[test]
    fn reference_temperature_is_identity() {
        assert_eq!(compensate(12.0, 25.0).unwrap(), 12.0);
        assert_eq!(compensate(0.5, 25.0).unwrap(), 0.5);
    }

    #[test]
    fn worked_example_at_ten_degrees() {
        // k = 0.0184 → 13.0 / (1 + 0.0184 * (10 - 25)) = 13.0 / 0.724
        let smart = compensate(13.0, 10.0).unwrap();
        assert!((smart - 13.0 / 0.724).abs() < 1e-9);
        assert!((smart - 17.9558).abs() < 1e-3);
    }

    #[test]
    fn degenerate_denominator_is_rejected() {
        // far below any realistic reading the denominator goes negative
        assert!(compensate(10.0, -60.0).is_err());
    }
}
