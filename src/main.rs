use anyhow::{Context, Result};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use ecmon::{
    cli,
    config::{LinkParams, DEFAULT_UNIT_ID},
    measure::sampler::Session,
    output::{csv_log::CsvLogger, dashboard::{self, Dashboard}, diagnostics},
    protocol::{calibration, channel::SerialChannel, discovery},
};

/// Response timeout for the steady-state session, much longer than the
/// discovery probes.
const SESSION_TIMEOUT: Duration = Duration::from_secs(1);

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = cli::parse_args();

    if matches.get_flag("list-ports") {
        cli::list_ports();
        return Ok(());
    }

    let link = LinkParams::default();
    let candidates = match matches.get_one::<String>("port") {
        Some(port) => vec![port.clone()],
        None => discovery::candidate_ports(),
    };

    let endpoint = discovery::discover(&candidates, &link, DEFAULT_UNIT_ID)
        .context("Sensor not found; check wiring, unit id and baud rate")?;

    // discovery closed its probe; open the session connection fresh
    let mut channel = SerialChannel::open(&endpoint, SESSION_TIMEOUT)?;
    log::info!(
        "Connected to sensor on {} (unit id {})",
        endpoint.port_name,
        endpoint.unit_id
    );

    if !matches.get_flag("no-monitor") {
        diagnostics::run_monitor(&mut channel)?;
    }

    let mode = cli::resolve_calibration_mode(&matches);
    if let Err(err) = calibration::execute(&mut channel, mode) {
        log::warn!("Calibration failed, continuing with the sensor's existing configuration: {err:#}");
    }
    // let the firmware apply the new configuration
    thread::sleep(Duration::from_secs(1));

    let csv_path = matches
        .get_one::<String>("csv")
        .map(String::as_str)
        .unwrap_or("ec_data_log.csv");
    let standard = matches
        .get_one::<f64>("standard")
        .copied()
        .unwrap_or(dashboard::DEFAULT_STANDARD);

    let mut csv = CsvLogger::open(Path::new(csv_path))?;
    let mut board = Dashboard::new(endpoint.port_name.clone(), standard, csv_path.to_string());

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("Failed to install Ctrl-C handler")?;
    }

    log::info!("Starting sampling loop, logging to {}", csv.path().display());
    let mut session = Session::new(channel);
    session.run(&running, |reading, result| {
        board.render(reading, result)?;
        csv.append(reading, result)
    })?;

    log::info!("Stopped after {} cycles", session.cycles());
    Ok(())
}
