//! Operator tool for a daylapse installation.
//!
//! ## Usage
//!
//! ```bash
//! daylapse-ctl status        # Show run progress derived from the state files
//! daylapse-ctl init          # Write default settings.json if none exists
//! ```

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::PathBuf;

use daylapse::config::Config;
use daylapse::logging::format_stamp;
use daylapse::state::{DailyProgress, Phase, RunState, Settings};
use daylapse::store::JsonStore;

enum Command {
    Status,
    Init,
}

struct CtlArgs {
    command: Command,
    config_path: Option<PathBuf>,
}

fn parse_args() -> CtlArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut command = None;
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "status" => command = Some(Command::Status),
            "init" => command = Some(Command::Init),
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    CtlArgs {
        command: command.unwrap_or(Command::Status),
        config_path,
    }
}

fn print_help() {
    println!(
        r#"daylapse-ctl - inspect and prepare a daylapse run

USAGE:
    daylapse-ctl [COMMAND] [OPTIONS]

COMMANDS:
    status              Show progress of the current run (default)
    init                Write default settings.json if it does not exist

OPTIONS:
    --config, -c PATH   Path to config file
    --help, -h          Show this help message

ENVIRONMENT:
    DAYLAPSE_CONFIG     Path to config file (overrides default location)
"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();
    let config_path = args.config_path.unwrap_or_else(Config::config_path);
    let config = Config::load_from(&config_path)?;
    if let Some(notice) = Config::missing_file_notice(&config_path) {
        eprintln!("{}", notice);
    }
    let store = JsonStore::new(&config.paths.state_dir);

    match args.command {
        Command::Status => status(&store, &config),
        Command::Init => init(&store),
    }
}

fn init(store: &JsonStore) -> Result<()> {
    let path = store.path_of::<Settings>();
    if store.load::<Settings>()?.is_some() {
        bail!("Settings already exist at {}", path.display());
    }

    let settings = Settings::default();
    store
        .save(&settings)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {}", path.display());
    println!(
        "  {} fps x {} s over {} days = {} frames",
        settings.fps,
        settings.len_in_seconds,
        settings.real_time_duration_in_days,
        settings.total_frames()
    );
    Ok(())
}

fn status(store: &JsonStore, config: &Config) -> Result<()> {
    let Some(settings) = store.load::<Settings>()? else {
        println!(
            "No settings at {}. Run `daylapse-ctl init` or create it by hand.",
            store.path_of::<Settings>().display()
        );
        return Ok(());
    };
    let run = store.load::<RunState>()?;
    let daily = store.load::<DailyProgress>()?;
    let offset = config.location.offset();

    println!("State directory: {}", store.dir().display());
    println!("Phase:           {}", Phase::derive(&settings, run.as_ref(), daily.as_ref()).as_str());
    println!(
        "Settings:        {} fps x {} s over {} days",
        settings.fps, settings.len_in_seconds, settings.real_time_duration_in_days
    );

    if let Some(run) = &run {
        println!("Frames:          {}/{}", run.current_frame, run.total_frames);
        println!(
            "Days:            {}/{} ({:.2} frames per day)",
            run.current_day, settings.real_time_duration_in_days, run.frames_per_day
        );
        if run.next_wakeup_time > 0.0 {
            let wakeup = run.next_wakeup();
            let due = if wakeup <= Utc::now() { " (due)" } else { "" };
            println!("Next wakeup:     {}{}", format_stamp(wakeup, offset), due);
        }
    }

    if let Some(daily) = &daily {
        println!(
            "Today:           {} frames, every {:.0} s",
            daily.current_frame, daily.sleep_duration
        );
    }

    Ok(())
}
