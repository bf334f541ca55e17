//! Live view of the sensor's diagnostic registers, shown before
//! calibration so the operator can verify the device state. Refreshes once
//! per second until Enter or Space is pressed.

use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use std::{
    io::{self, Write},
    time::Duration,
};

use crate::{
    protocol::{channel::RegisterChannel, codec},
    registers::{DIAGNOSTIC_REGISTERS, REG_CAL_COEFF, REG_CAL_MODE},
};

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Run the monitor until the operator presses Enter or Space. Raw mode is
/// restored on every exit path, including errors.
pub fn run_monitor<C: RegisterChannel>(channel: &mut C) -> Result<()> {
    enable_raw_mode()?;
    let result = monitor_loop(channel);
    disable_raw_mode()?;
    result
}

fn monitor_loop<C: RegisterChannel>(channel: &mut C) -> Result<()> {
    let mut stdout = io::stdout();
    let mut updates = 0u64;

    loop {
        updates += 1;

        let mut lines: Vec<String> = Vec::new();
        lines.push("SENSOR DIAGNOSTIC REGISTERS (live)".to_string());
        lines.push(format!(
            "Time: {} | Updates: {updates}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        lines.push(String::new());

        for &reg in &DIAGNOSTIC_REGISTERS {
            lines.push(match channel.read_registers(reg, 1) {
                Ok(words) if !words.is_empty() => {
                    format!("Register {reg:>2} = {:>5}  (0x{:04X})", words[0], words[0])
                }
                _ => format!("Register {reg:>2} = [READ ERROR]"),
            });
        }

        lines.push(String::new());
        lines.push("--- Calibration Registers ---".to_string());
        lines.push(match channel.read_registers(REG_CAL_MODE, 1) {
            Ok(words) if !words.is_empty() => format!(
                "Register {REG_CAL_MODE} = {:>5}  (0x{:04X})  <- calibration mode",
                words[0], words[0]
            ),
            _ => format!("Register {REG_CAL_MODE} = [READ ERROR]  <- calibration mode"),
        });
        lines.push(match channel.read_registers(REG_CAL_COEFF, 2) {
            Ok(words) if words.len() >= 2 => format!(
                "Register {REG_CAL_COEFF} = {:.3}  (hex {})  <- calibration coefficient",
                codec::decode_float(words[0], words[1]),
                codec::words_to_hex(words[0], words[1])
            ),
            _ => format!("Register {REG_CAL_COEFF} = [READ ERROR]  <- calibration coefficient"),
        });

        lines.push(String::new());
        lines.push("Press ENTER to continue to calibration".to_string());

        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        // raw mode needs explicit carriage returns
        for line in &lines {
            write!(stdout, "{line}\r\n")?;
        }
        stdout.flush()?;

        // wait out the refresh interval, leaving early on a key press
        if event::poll(REFRESH_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && matches!(key.code, KeyCode::Enter | KeyCode::Char(' '))
                {
                    break;
                }
            }
        }
    }

    log::info!("Diagnostic monitoring stopped");
    Ok(())
}
