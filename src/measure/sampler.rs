//! The steady-state sampling loop: three register reads per cycle, one
//! record per successful cycle, retry forever on failure.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use crate::{
    measure::{
        compensation,
        reading::{CompensationResult, SensorReading},
    },
    protocol::{channel::RegisterChannel, codec},
    registers::{REG_RAW_EC, REG_SENSOR_EC, REG_TEMPERATURE},
};

pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Every this many consecutive failed cycles, escalate the log noise.
const FAILURE_ESCALATION_EVERY: u32 = 10;

/// A live sampling session: the open channel plus the cycle counter.
/// Dropping the session closes the connection.
pub struct Session<C: RegisterChannel> {
    channel: C,
    interval: Duration,
    cycles: u64,
}

impl<C: RegisterChannel> Session<C> {
    pub fn new(channel: C) -> Self {
        Self::with_interval(channel, SAMPLE_INTERVAL)
    }

    pub fn with_interval(channel: C, interval: Duration) -> Self {
        Self {
            channel,
            interval,
            cycles: 0,
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run cycles until `running` is cleared. A cycle in which any read
    /// fails emits nothing; the loop waits the fixed interval and retries,
    /// indefinitely. Only a sink error terminates the loop early.
    pub fn run<F>(&mut self, running: &AtomicBool, mut sink: F) -> Result<()>
    where
        F: FnMut(&SensorReading, &CompensationResult) -> Result<()>,
    {
        let mut consecutive_failures = 0u32;

        while running.load(Ordering::SeqCst) {
            self.cycles += 1;
            match self.read_cycle() {
                Ok((reading, result)) => {
                    consecutive_failures = 0;
                    sink(&reading, &result)?;
                }
                Err(err) => {
                    consecutive_failures += 1;
                    log::warn!("Sampling cycle {} abandoned: {err:#}", self.cycles);
                    if consecutive_failures % FAILURE_ESCALATION_EVERY == 0 {
                        log::error!(
                            "{consecutive_failures} consecutive failed cycles, still retrying"
                        );
                    }
                }
            }
            thread::sleep(self.interval);
        }

        Ok(())
    }

    fn read_cycle(&mut self) -> Result<(SensorReading, CompensationResult)> {
        let (temp_hi, temp_lo) = self
            .read_pair(REG_TEMPERATURE)
            .context("Failed to read temperature")?;
        let raw_hex_temp = codec::words_to_hex(temp_hi, temp_lo);
        let temperature = codec::decode_float(temp_hi, temp_lo);

        let (ec_hi, ec_lo) = self.read_pair(REG_RAW_EC).context("Failed to read raw EC")?;
        let raw_hex_ec = codec::words_to_hex(ec_hi, ec_lo);
        let raw_ec = codec::decode_float(ec_hi, ec_lo);

        let (sec_hi, sec_lo) = self
            .read_pair(REG_SENSOR_EC)
            .context("Failed to read sensor EC")?;
        let sensor_ec = codec::decode_float(sec_hi, sec_lo);

        let smart_ec = compensation::compensate(raw_ec as f64, temperature as f64)?;
        let k_used = compensation::dynamic_k(temperature as f64);

        let reading = SensorReading {
            temperature,
            raw_ec,
            sensor_ec,
            timestamp: Local::now(),
            raw_hex_temp,
            raw_hex_ec,
        };
        Ok((reading, CompensationResult { smart_ec, k_used }))
    }

    fn read_pair(&mut self, addr: u16) -> Result<(u16, u16)> {
        let words = self.channel.read_registers(addr, 2)?;
        if words.len() < 2 {
            return Err(anyhow!("Short register response at {addr}"));
        }
        Ok((words[0], words[1]))
    }
}
