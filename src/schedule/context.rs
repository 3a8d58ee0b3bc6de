//! Loading and first-time initialization of the run documents.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::error::{DaylapseError, Result};
use crate::state::{DailyProgress, RunState, Settings};
use crate::store::JsonStore;
use crate::sun::SunOracle;

/// The documents as one tick sees them.
///
/// Owned by the scheduler for the duration of a tick and written back
/// together before any suspension. `daily` is absent between the end of one
/// daylight period and the first due tick of the next.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub settings: Settings,
    pub run: RunState,
    pub daily: Option<DailyProgress>,
}

impl RunContext {
    pub fn run_days(&self) -> u32 {
        self.settings.real_time_duration_in_days
    }

    /// Whether today's share of the run has been captured.
    pub fn day_quota_met(&self) -> bool {
        self.run.current_frame >= self.run.day_target(self.run_days())
    }

    pub fn run_finished(&self) -> bool {
        self.run.current_day >= self.run_days()
    }
}

/// Settings must be seeded by the operator; absence is fatal.
pub fn load_settings(store: &JsonStore) -> Result<Settings> {
    let settings = store
        .load::<Settings>()?
        .ok_or_else(|| DaylapseError::MissingSettings(store.path_of::<Settings>()))?;
    settings.validate()?;
    Ok(settings)
}

/// Load the documents, creating the run state on first launch.
pub fn load_or_init(store: &JsonStore, verbose: bool) -> Result<RunContext> {
    let settings = load_settings(store)?;
    if verbose {
        info!("Loaded settings from file.");
    }

    let run = match store.load::<RunState>()? {
        Some(run) => {
            if verbose {
                info!("Loaded state from file.");
            }
            run
        }
        None => {
            let run = RunState::new(&settings);
            store.save(&run)?;
            info!("Initialized state file.");
            run
        }
    };

    let daily = store.load::<DailyProgress>()?;
    if verbose && daily.is_some() {
        info!("Loaded daily progress from file.");
    }

    debug!(
        "Context: frame {}/{}, day {}/{}, daily frame {:?}",
        run.current_frame,
        run.total_frames,
        run.current_day,
        settings.real_time_duration_in_days,
        daily.as_ref().map(|d| d.current_frame)
    );

    Ok(RunContext { settings, run, daily })
}

/// Start a new daylight period, spreading the day's quota over all of it.
pub fn init_daily(
    store: &JsonStore,
    sun: &impl SunOracle,
    run: &RunState,
    date: NaiveDate,
) -> Result<DailyProgress> {
    let times = sun.sun_times(date)?;
    let daily = DailyProgress::spread_over(seconds(times.daylight()), run.frames_per_day);
    store.save(&daily)?;
    info!(
        "Initialized daily progress. Sleep duration is {:.0} seconds.",
        daily.sleep_duration
    );
    Ok(daily)
}

pub(crate) fn seconds(delta: chrono::Duration) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

pub(crate) fn after_seconds(from: DateTime<Utc>, secs: f64) -> DateTime<Utc> {
    from + chrono::Duration::milliseconds((secs * 1000.0).round() as i64)
}
