//! ecmon — Modbus RTU logger for EC sensors.
//!
//! This crate discovers the serial port an EC sensor answers on, runs an
//! optional calibration sequence with a write/verify discipline, then
//! samples temperature and conductivity once per second, computing a
//! temperature-compensated "smart" EC reading. Each record is handed to
//! collaborator modules for CSV persistence and a live terminal dashboard.
//!
//! The protocol layer (`protocol`) owns discovery, the register channel,
//! the float codec and calibration; the measurement layer (`measure`) owns
//! compensation and the sampling loop; `output` holds the collaborators
//! that consume records.

pub mod cli;
pub mod config;
pub mod measure;
pub mod output;
pub mod protocol;
pub mod registers;
