use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::{self, Write};

use crate::protocol::calibration::CalibrationMode;

pub fn build_command() -> Command {
    Command::new("ecmon")
        .about("Modbus RTU logger for EC sensors with temperature-compensated smart readings")
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("N")
                .help("Calibration mode: 0 skip, 1 mode register, 2 coefficient + mode, 3 K-format probe")
                .value_parser(clap::value_parser!(u8).range(0..=3)),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("NAME")
                .help("Serial port to use, skipping the scan"),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .value_name("PATH")
                .default_value("ec_data_log.csv")
                .help("CSV log path"),
        )
        .arg(
            Arg::new("standard")
                .long("standard")
                .value_name("MS_CM")
                .value_parser(clap::value_parser!(f64))
                .help("Reference standard the dashboard scores against (mS/cm, default 12.88)"),
        )
        .arg(
            Arg::new("no-monitor")
                .long("no-monitor")
                .help("Skip the pre-calibration diagnostic register monitor")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .help("List available serial ports and exit")
                .action(ArgAction::SetTrue),
        )
}

pub fn parse_args() -> ArgMatches {
    build_command().get_matches()
}

/// The mode from `--mode`, or an interactive menu when absent. Invalid
/// interactive input falls back to skipping calibration.
pub fn resolve_calibration_mode(matches: &ArgMatches) -> CalibrationMode {
    if let Some(&value) = matches.get_one::<u8>("mode") {
        // the arg parser already constrained the range
        let mode = CalibrationMode::from_arg(value).unwrap_or(CalibrationMode::None);
        log::info!("Using calibration {mode} from the command line");
        return mode;
    }
    prompt_calibration_mode()
}

fn prompt_calibration_mode() -> CalibrationMode {
    println!();
    println!("  Select calibration mode:");
    println!("    [0] Skip calibration (use existing sensor settings)");
    println!("    [1] Mode 1: write mode register 13 = 2");
    println!("    [2] Mode 2: write coefficient 28 = 12880.0, then register 13 = 3");
    println!("    [3] Mode 3: probe the K x10000 integer format on register 16");
    print!("  Enter mode (0/1/2/3): ");
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        if let Ok(choice) = input.trim().parse::<u8>() {
            if let Some(mode) = CalibrationMode::from_arg(choice) {
                return mode;
            }
        }
    }

    println!("  Invalid choice, skipping calibration.");
    CalibrationMode::None
}

/// Print a sorted list of the serial ports the OS reports.
pub fn list_ports() {
    match serialport::available_ports() {
        Ok(mut ports) => {
            if ports.is_empty() {
                println!("No serial ports found");
                return;
            }
            ports.sort_by_key(|p| p.port_name.clone());
            for port in ports {
                println!("{}\t{:?}", port.port_name, port.port_type);
            }
        }
        Err(err) => eprintln!("Failed to enumerate serial ports: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_argument_parses_in_range() {
        let matches = build_command()
            .try_get_matches_from(["ecmon", "--mode", "2"])
            .unwrap();
        assert_eq!(matches.get_one::<u8>("mode"), Some(&2));
        assert_eq!(resolve_calibration_mode(&matches), CalibrationMode::Mode2);
    }

    #[test]
    fn mode_argument_out_of_range_is_rejected() {
        assert!(build_command()
            .try_get_matches_from(["ecmon", "--mode", "4"])
            .is_err());
    }

    #[test]
    fn csv_path_has_a_default() {
        let matches = build_command().try_get_matches_from(["ecmon"]).unwrap();
        assert_eq!(
            matches.get_one::<String>("csv").map(String::as_str),
            Some("ec_data_log.csv")
        );
        assert!(!matches.get_flag("no-monitor"));
    }
}
