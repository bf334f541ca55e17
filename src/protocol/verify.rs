//! Write-then-verify discipline for configuration registers.
//!
//! The sensor firmware may round a value or apply it asynchronously, so a
//! read-back mismatch is reported but never treated as failure; only an
//! outright transport failure means the write did not happen at all.

use std::{thread, time::Duration};

use crate::protocol::{channel::RegisterChannel, codec};

/// Tolerance for float read-back comparison.
pub const FLOAT_EPSILON: f32 = 0.001;
/// Settle delay before reading back a float: the firmware needs a moment to
/// commit both words of the pair.
pub const FLOAT_SETTLE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterValue {
    Integer(u16),
    Float(f32),
}

/// Outcome of one verified write. `accepted` is false only when the raw
/// write itself failed; a read-back mismatch leaves it true.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteReport {
    pub accepted: bool,
    pub read_back: Option<RegisterValue>,
    pub matched: bool,
}

impl WriteReport {
    fn rejected() -> Self {
        Self {
            accepted: false,
            read_back: None,
            matched: false,
        }
    }

    fn unverified() -> Self {
        Self {
            accepted: true,
            read_back: None,
            matched: false,
        }
    }
}

pub struct VerifiedWriter<'a, C: RegisterChannel> {
    channel: &'a mut C,
    settle: Duration,
}

impl<'a, C: RegisterChannel> VerifiedWriter<'a, C> {
    pub fn new(channel: &'a mut C) -> Self {
        Self {
            channel,
            settle: FLOAT_SETTLE,
        }
    }

    /// Same as `new` but with an explicit settle delay; tests pass zero.
    pub fn with_settle(channel: &'a mut C, settle: Duration) -> Self {
        Self { channel, settle }
    }

    pub fn write_and_verify(&mut self, addr: u16, value: RegisterValue) -> WriteReport {
        match value {
            RegisterValue::Integer(value) => self.write_integer(addr, value),
            RegisterValue::Float(value) => self.write_float(addr, value),
        }
    }

    fn write_integer(&mut self, addr: u16, value: u16) -> WriteReport {
        log::info!("Writing register {addr} = {value} (0x{value:04X})");
        if let Err(err) = self.channel.write_register(addr, value) {
            log::error!("Failed to write register {addr}: {err}");
            return WriteReport::rejected();
        }

        match self.channel.read_registers(addr, 1) {
            Ok(words) => match words.first().copied() {
                Some(read_back) => {
                    let matched = read_back == value;
                    if matched {
                        log::info!("Register {addr} verified: {read_back}");
                    } else {
                        log::warn!(
                            "Register {addr} read-back differs: wrote {value}, got {read_back}"
                        );
                    }
                    WriteReport {
                        accepted: true,
                        read_back: Some(RegisterValue::Integer(read_back)),
                        matched,
                    }
                }
                None => {
                    log::warn!("Register {addr} read-back returned no data");
                    WriteReport::unverified()
                }
            },
            Err(err) => {
                log::warn!("Could not verify register {addr} (read-back failed): {err}");
                WriteReport::unverified()
            }
        }
    }

    fn write_float(&mut self, addr: u16, value: f32) -> WriteReport {
        let (word0, word1) = codec::encode_float(value);
        log::info!(
            "Writing float {value:.3} to registers {addr}-{} (hex {})",
            addr + 1,
            codec::words_to_hex(word0, word1)
        );
        if let Err(err) = self.channel.write_registers(addr, &[word0, word1]) {
            log::error!("Failed to write float to register {addr}: {err}");
            return WriteReport::rejected();
        }

        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }

        match self.channel.read_registers(addr, 2) {
            Ok(words) if words.len() >= 2 => {
                let read_back = codec::decode_float(words[0], words[1]);
                let matched = (read_back - value).abs() < FLOAT_EPSILON;
                if matched {
                    log::info!("Register {addr} verified: {read_back:.3}");
                } else {
                    log::warn!(
                        "Register {addr} read-back differs: wrote {value:.3}, got {read_back:.3} (hex {})",
                        codec::words_to_hex(words[0], words[1])
                    );
                }
                WriteReport {
                    accepted: true,
                    read_back: Some(RegisterValue::Float(read_back)),
                    matched,
                }
            }
            Ok(_) => {
                log::warn!("Register {addr} read-back returned too few words");
                WriteReport::unverified()
            }
            Err(err) => {
                log::warn!("Could not verify register {addr} (read-back failed): {err}");
                WriteReport::unverified()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use std::collections::HashMap;

    #[derive(Default)]
    struct ScriptedChannel {
        registers: HashMap<u16, u16>,
        fail_writes: bool,
        fail_reads: bool,
        read_back_override: Option<Vec<u16>>,
        writes: Vec<(u16, Vec<u16>)>,
        reads: usize,
    }

    impl RegisterChannel for ScriptedChannel {
        fn read_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>> {
            self.reads += 1;
            if self.fail_reads {
                return Err(anyhow!("read timed out"));
            }
            if let Some(words) = &self.read_back_override {
                return Ok(words.clone());
            }
            Ok((0..count)
                .map(|i| *self.registers.get(&(addr + i)).unwrap_or(&0))
                .collect())
        }

        fn write_register(&mut self, addr: u16, value: u16) -> Result<()> {
            self.write_registers(addr, &[value])
        }

        fn write_registers(&mut self, addr: u16, words: &[u16]) -> Result<()> {
            if self.fail_writes {
                return Err(anyhow!("write timed out"));
            }
            self.writes.push((addr, words.to_vec()));
            for (i, &word) in words.iter().enumerate() {
                self.registers.insert(addr + i as u16, word);
            }
            Ok(())
        }
    }

    fn writer(channel: &mut ScriptedChannel) -> VerifiedWriter<'_, ScriptedChannel> {
        VerifiedWriter::with_settle(channel, Duration::ZERO)
    }

    #[test]
    fn integer_write_verifies_exactly() {
        let mut channel = ScriptedChannel::default();
        let report = writer(&mut channel).write_and_verify(13, RegisterValue::Integer(2));

        assert!(report.accepted);
        assert!(report.matched);
        assert_eq!(report.read_back, Some(RegisterValue::Integer(2)));
    }

    #[test]
    fn integer_read_back_mismatch_is_not_fatal() {
        let mut channel = ScriptedChannel {
            read_back_override: Some(vec![3]),
            ..Default::default()
        };
        let report = writer(&mut channel).write_and_verify(13, RegisterValue::Integer(2));

        assert!(report.accepted);
        assert!(!report.matched);
        assert_eq!(report.read_back, Some(RegisterValue::Integer(3)));
    }

    #[test]
    fn float_mismatch_beyond_epsilon_is_reported_not_raised() {
        let (word0, word1) = codec::encode_float(12880.5);
        let mut channel = ScriptedChannel {
            read_back_override: Some(vec![word0, word1]),
            ..Default::default()
        };
        let report = writer(&mut channel).write_and_verify(28, RegisterValue::Float(12880.0));

        assert!(report.accepted);
        assert!(!report.matched);
        assert_eq!(report.read_back, Some(RegisterValue::Float(12880.5)));
    }

    #[test]
    fn float_within_epsilon_matches() {
        let (word0, word1) = codec::encode_float(2.5004);
        let mut channel = ScriptedChannel {
            read_back_override: Some(vec![word0, word1]),
            ..Default::default()
        };
        let report = writer(&mut channel).write_and_verify(28, RegisterValue::Float(2.5));

        assert!(report.accepted);
        assert!(report.matched);
    }

    #[test]
    fn raw_write_failure_skips_read_back() {
        let mut channel = ScriptedChannel {
            fail_writes: true,
            ..Default::default()
        };
        let report = writer(&mut channel).write_and_verify(13, RegisterValue::Integer(2));

        assert!(!report.accepted);
        assert_eq!(report.read_back, None);
        assert_eq!(channel.reads, 0);
    }

    #[test]
    fn read_back_failure_still_accepts_the_write() {
        let mut channel = ScriptedChannel {
            fail_reads: true,
            ..Default::default()
        };
        let report = writer(&mut channel).write_and_verify(13, RegisterValue::Integer(2));

        assert!(report.accepted);
        assert!(!report.matched);
        assert_eq!(report.read_back, None);
        assert_eq!(channel.writes, vec![(13, vec![2])]);
    }
}
