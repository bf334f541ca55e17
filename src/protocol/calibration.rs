//! Calibration sequences: each mode is a fixed, ordered list of register
//! writes executed with the write/verify discipline. A raw write failure
//! aborts the rest of the sequence; steps already applied stay applied.

use anyhow::{anyhow, Result};
use std::fmt;

use crate::{
    protocol::{
        channel::RegisterChannel,
        verify::{RegisterValue, VerifiedWriter},
    },
    registers::{
        CAL_COEFF_VALUE, CAL_MODE_1_VALUE, CAL_MODE_2_VALUE, REG_CAL_COEFF, REG_CAL_MODE,
        REG_TEST_COEFF, TEST_K_SCALED,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationMode {
    /// Skip calibration, keep the sensor's existing settings.
    None,
    /// Write the calibration mode register only.
    Mode1,
    /// Write the standard-solution coefficient, then the mode register.
    Mode2,
    /// Diagnostic probe: write a K value in x10000 integer encoding to the
    /// test register to see whether the firmware accepts that format.
    Mode3Test,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationStep {
    pub register: u16,
    pub value: RegisterValue,
}

impl CalibrationMode {
    pub fn from_arg(value: u8) -> Option<Self> {
        match value {
            0 => Some(CalibrationMode::None),
            1 => Some(CalibrationMode::Mode1),
            2 => Some(CalibrationMode::Mode2),
            3 => Some(CalibrationMode::Mode3Test),
            _ => None,
        }
    }

    pub fn steps(&self) -> Vec<CalibrationStep> {
        match self {
            CalibrationMode::None => Vec::new(),
            CalibrationMode::Mode1 => vec![CalibrationStep {
                register: REG_CAL_MODE,
                value: RegisterValue::Integer(CAL_MODE_1_VALUE),
            }],
            CalibrationMode::Mode2 => vec![
                CalibrationStep {
                    register: REG_CAL_COEFF,
                    value: RegisterValue::Float(CAL_COEFF_VALUE),
                },
                CalibrationStep {
                    register: REG_CAL_MODE,
                    value: RegisterValue::Integer(CAL_MODE_2_VALUE),
                },
            ],
            CalibrationMode::Mode3Test => vec![CalibrationStep {
                register: REG_TEST_COEFF,
                value: RegisterValue::Integer(TEST_K_SCALED),
            }],
        }
    }
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationMode::None => write!(f, "mode 0 (skip)"),
            CalibrationMode::Mode1 => write!(f, "mode 1"),
            CalibrationMode::Mode2 => write!(f, "mode 2"),
            CalibrationMode::Mode3Test => write!(f, "mode 3 (K-format probe)"),
        }
    }
}

/// Run the calibration sequence for `mode`. Err means some raw write in the
/// sequence failed; read-back mismatches never count as failure. On error
/// the sensor keeps whatever configuration the partial sequence produced —
/// nothing is rolled back — and the caller is expected to continue.
pub fn execute<C: RegisterChannel>(channel: &mut C, mode: CalibrationMode) -> Result<()> {
    let steps = mode.steps();
    if steps.is_empty() {
        log::info!("Calibration skipped ({mode})");
        return Ok(());
    }

    log::info!("Executing calibration {mode}, {} step(s)", steps.len());
    let mut writer = VerifiedWriter::new(channel);
    for step in &steps {
        let report = writer.write_and_verify(step.register, step.value);
        if !report.accepted {
            return Err(anyhow!(
                "Calibration {mode} aborted: write to register {} failed",
                step.register
            ));
        }
    }

    if mode == CalibrationMode::Mode3Test {
        log::info!("Sensor accepted the K x10000 integer encoding");
    }
    log::info!("Calibration {mode} completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec;

    #[derive(Default)]
    struct RecordingChannel {
        fail_write_to: Option<u16>,
        writes: Vec<(u16, Vec<u16>)>,
    }

    impl RegisterChannel for RecordingChannel {
        fn read_registers(&mut self, _addr: u16, count: u16) -> Result<Vec<u16>> {
            // read-backs are irrelevant here; any content will do
            Ok(vec![0; count as usize])
        }

        fn write_register(&mut self, addr: u16, value: u16) -> Result<()> {
            self.write_registers(addr, &[value])
        }

        fn write_registers(&mut self, addr: u16, words: &[u16]) -> Result<()> {
            if self.fail_write_to == Some(addr) {
                return Err(anyhow!("write timed out"));
            }
            self.writes.push((addr, words.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn mode_step_tables() {
        assert!(CalibrationMode::None.steps().is_empty());
        assert_eq!(
            CalibrationMode::Mode1.steps(),
            vec![CalibrationStep {
                register: 13,
                value: RegisterValue::Integer(2),
            }]
        );
        assert_eq!(
            CalibrationMode::Mode2.steps(),
            vec![
                CalibrationStep {
                    register: 28,
                    value: RegisterValue::Float(12880.0),
                },
                CalibrationStep {
                    register: 13,
                    value: RegisterValue::Integer(3),
                },
            ]
        );
        assert_eq!(
            CalibrationMode::Mode3Test.steps(),
            vec![CalibrationStep {
                register: 16,
                value: RegisterValue::Integer(190),
            }]
        );
    }

    #[test]
    fn mode_none_writes_nothing() {
        let mut channel = RecordingChannel::default();
        execute(&mut channel, CalibrationMode::None).unwrap();
        assert!(channel.writes.is_empty());
    }

    #[test]
    fn mode2_writes_coefficient_then_mode() {
        let mut channel = RecordingChannel::default();
        execute(&mut channel, CalibrationMode::Mode2).unwrap();

        let (word0, word1) = codec::encode_float(12880.0);
        assert_eq!(
            channel.writes,
            vec![(28, vec![word0, word1]), (13, vec![3])]
        );
    }

    #[test]
    fn mode2_mode_write_failure_leaves_coefficient_applied() {
        let mut channel = RecordingChannel {
            fail_write_to: Some(13),
            ..Default::default()
        };
        let result = execute(&mut channel, CalibrationMode::Mode2);

        assert!(result.is_err());
        // the coefficient write went out and no rollback write followed it
        let (word0, word1) = codec::encode_float(12880.0);
        assert_eq!(channel.writes, vec![(28, vec![word0, word1])]);
    }

    #[test]
    fn mode2_coefficient_write_failure_short_circuits() {
        let mut channel = RecordingChannel {
            fail_write_to: Some(28),
            ..Default::default()
        };
        let result = execute(&mut channel, CalibrationMode::Mode2);

        assert!(result.is_err());
        assert!(channel.writes.is_empty());
    }
}
