//! Sensor port discovery: probe each candidate serial device in priority
//! order with a short-lived connection and a handshake read.

use anyhow::{anyhow, Result};
use std::time::Duration;

use crate::{
    config::{DeviceEndpoint, LinkParams},
    protocol::channel::{RegisterChannel, SerialChannel},
    registers::REG_TEMPERATURE,
};

/// Probe connections use a much shorter timeout than the steady-state
/// session so a full scan stays fast.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Default candidate ports, highest priority first: legacy/WSL1 serial
/// names, then USB adapters, then CDC-ACM devices.
pub fn candidate_ports() -> Vec<String> {
    let mut ports = Vec::new();
    for i in 0..=20 {
        ports.push(format!("/dev/ttyS{i}"));
    }
    for i in 0..5 {
        ports.push(format!("/dev/ttyUSB{i}"));
    }
    for i in 0..5 {
        ports.push(format!("/dev/ttyACM{i}"));
    }
    ports
}

/// Try each candidate in order and return the first whose device answers a
/// handshake read of the temperature register pair. Any successful read
/// confirms a responding device; the content does not matter.
///
/// Every probe channel, winner included, is dropped (closing the port)
/// before the next candidate is tried and before this function returns;
/// the caller opens a fresh session connection afterwards.
pub fn discover_with<C, F>(candidates: &[String], mut open_probe: F) -> Result<String>
where
    C: RegisterChannel,
    F: FnMut(&str) -> Result<C>,
{
    log::info!("Scanning {} candidate ports for the sensor", candidates.len());

    for name in candidates {
        let mut channel = match open_probe(name) {
            Ok(channel) => channel,
            Err(err) => {
                log::debug!("Cannot open {name}: {err}");
                continue;
            }
        };
        match channel.read_registers(REG_TEMPERATURE, 2) {
            Ok(_) => {
                log::info!("Found sensor at {name}");
                return Ok(name.clone());
            }
            Err(err) => log::debug!("No handshake on {name}: {err}"),
        }
    }

    Err(anyhow!(
        "No responding sensor on any of {} candidate ports",
        candidates.len()
    ))
}

/// Serial-port discovery over the given link parameters and bus unit id.
pub fn discover(
    candidates: &[String],
    link: &LinkParams,
    unit_id: u8,
) -> Result<DeviceEndpoint> {
    let port_name = discover_with(candidates, |name| {
        SerialChannel::open(&link.endpoint(name, unit_id), PROBE_TIMEOUT)
    })?;
    Ok(link.endpoint(port_name, unit_id))
}
