//! Daylapse capture daemon.
//!
//! Runs the scheduler until every configured day has been captured, then
//! exits with status 0. Any fatal error (missing settings, failed capture,
//! storage failure) is logged and ends the process with a non-zero status;
//! restarting it resumes from the documents on disk.
//!
//! ## Usage
//!
//! ```bash
//! daylapse                  # Run with the default config
//! daylapse --config PATH    # Run with an explicit config file
//! ```

use anyhow::Result;
use std::path::PathBuf;
use tracing::{error, warn};

use daylapse::capture::CommandCapture;
use daylapse::clock::SystemClock;
use daylapse::config::Config;
use daylapse::logging;
use daylapse::schedule::Scheduler;
use daylapse::store::JsonStore;
use daylapse::sun::SolarCalculator;

fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("daylapse {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config_path
}

fn print_help() {
    println!(
        r#"daylapse - unattended multi-day daylight timelapse

USAGE:
    daylapse [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    DAYLAPSE_CONFIG     Path to config file (overrides default location)
    DAYLAPSE_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/daylapse/config.toml
The run is defined by settings.json in the state directory.

See also: daylapse-ctl --help"#
    );
}

fn main() -> Result<()> {
    let config_path = parse_args();

    let config_path = config_path.unwrap_or_else(Config::config_path);
    let config = Config::load_from(&config_path)?;

    let _guard = logging::init(&config.paths.event_log(), config.location.offset())?;
    if let Some(notice) = Config::missing_file_notice(&config_path) {
        warn!("{}", notice);
    }
    tracing::debug!(
        "Location {} ({}, {}), state in {:?}",
        config.location.name,
        config.location.latitude,
        config.location.longitude,
        config.paths.state_dir
    );

    let mut scheduler = Scheduler::new(
        JsonStore::new(&config.paths.state_dir),
        SystemClock,
        SolarCalculator::for_location(&config.location),
        CommandCapture::new(&config.capture, config.paths.frames_dir()),
        config.location.offset(),
    );

    if let Err(e) = scheduler.run() {
        error!("{}. Exiting...", e);
        return Err(e.into());
    }

    Ok(())
}
