use chrono::{DateTime, Local};

/// One full read cycle from the sensor, captured before compensation.
/// Produced once per sampling cycle and handed straight to collaborators.
#[derive(Debug, Clone)]
pub struct SensorReading {
    pub temperature: f32,
    pub raw_ec: f32,
    /// The sensor's own compensated EC, read for comparison.
    pub sensor_ec: f32,
    pub timestamp: DateTime<Local>,
    /// Raw register words behind `temperature`, hex-rendered before the
    /// float conversion so collaborators can validate the decode bit level.
    pub raw_hex_temp: String,
    /// Raw register words behind `raw_ec`.
    pub raw_hex_ec: String,
}

/// Derived compensation output for one reading.
#[derive(Debug, Clone, Copy)]
pub struct CompensationResult {
    pub smart_ec: f64,
    pub k_used: f64,
}
