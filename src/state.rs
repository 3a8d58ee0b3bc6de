//! Persisted run documents.
//!
//! Three JSON documents describe a run: the operator's [`Settings`], the
//! run-wide [`RunState`] and the per-day [`DailyProgress`]. Field names
//! match the on-disk schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DaylapseError;

/// A JSON document kept in the state directory.
pub trait Document: Serialize + serde::de::DeserializeOwned {
    /// File name inside the state directory.
    const FILE_NAME: &'static str;
}

/// Operator-provided run definition. Never mutated by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub fps: u32,
    pub len_in_seconds: u32,
    pub real_time_duration_in_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps: 60,
            len_in_seconds: 30,
            real_time_duration_in_days: 30,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), DaylapseError> {
        if self.fps == 0 {
            return Err(DaylapseError::InvalidSettings("fps must be greater than 0".into()));
        }
        if self.len_in_seconds == 0 {
            return Err(DaylapseError::InvalidSettings(
                "len_in_seconds must be greater than 0".into(),
            ));
        }
        if self.real_time_duration_in_days == 0 {
            return Err(DaylapseError::InvalidSettings(
                "real_time_duration_in_days must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn total_frames(&self) -> u64 {
        u64::from(self.fps) * u64::from(self.len_in_seconds)
    }
}

impl Document for Settings {
    const FILE_NAME: &'static str = "settings.json";
}

/// Progress of the whole multi-day run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub total_frames: u64,
    pub current_frame: u64,
    pub current_day: u32,
    pub frames_per_day: f64,
    /// Epoch seconds; `0` until the first wakeup has been scheduled.
    pub next_wakeup_time: f64,
}

impl RunState {
    /// Fresh state for a run that has not captured anything yet.
    pub fn new(settings: &Settings) -> Self {
        let total_frames = settings.total_frames();
        Self {
            total_frames,
            current_frame: 0,
            current_day: 0,
            frames_per_day: total_frames as f64 / f64::from(settings.real_time_duration_in_days),
            next_wakeup_time: 0.0,
        }
    }

    pub fn next_wakeup(&self) -> DateTime<Utc> {
        from_epoch_seconds(self.next_wakeup_time)
    }

    pub fn set_next_wakeup(&mut self, at: DateTime<Utc>) {
        self.next_wakeup_time = epoch_seconds(at);
    }

    /// True until the very first frame of the run has been taken.
    pub fn is_fresh(&self) -> bool {
        self.current_frame == 0 && self.current_day == 0
    }

    /// Run-wide frame count at which the current day's quota is met.
    ///
    /// Days take `ceil` of their cumulative share, so uneven splits still
    /// end on exactly `total_frames`.
    pub fn day_target(&self, run_days: u32) -> u64 {
        let days = u64::from(run_days.max(1));
        let day = u64::from(self.current_day) + 1;
        let target = (day * self.total_frames).div_ceil(days);
        target.min(self.total_frames)
    }
}

impl Document for RunState {
    const FILE_NAME: &'static str = "state.json";
}

/// Progress within the current daylight period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProgress {
    /// Seconds between captures today.
    pub sleep_duration: f64,
    pub current_frame: u64,
}

impl DailyProgress {
    /// Spread `frames_per_day` captures evenly over `window_secs` of daylight.
    pub fn spread_over(window_secs: f64, frames_per_day: f64) -> Self {
        Self {
            sleep_duration: sleep_for_window(window_secs, frames_per_day),
            current_frame: 0,
        }
    }
}

impl Document for DailyProgress {
    const FILE_NAME: &'static str = "daily_progress.json";
}

pub(crate) fn sleep_for_window(window_secs: f64, frames_per_day: f64) -> f64 {
    if frames_per_day <= 0.0 {
        return window_secs.max(0.0);
    }
    window_secs.max(0.0) / frames_per_day
}

/// Logical scheduler state, derived from what is on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No run state yet (first launch, or a finished run was cleaned up).
    Uninitialized,
    /// Initialized but no wakeup has been scheduled yet.
    AwaitingWake,
    /// Inside a daylight capture period.
    CapturingToday,
    /// Between the end of one day's quota and the next sunrise.
    SleepingOvernight,
    /// Every configured day has been captured.
    Complete,
}

impl Phase {
    pub fn derive(settings: &Settings, run: Option<&RunState>, daily: Option<&DailyProgress>) -> Self {
        match (run, daily) {
            (None, _) => Phase::Uninitialized,
            (Some(run), _) if run.current_day >= settings.real_time_duration_in_days => Phase::Complete,
            (Some(run), _) if run.next_wakeup_time == 0.0 => Phase::AwaitingWake,
            (Some(_), None) => Phase::SleepingOvernight,
            (Some(_), Some(_)) => Phase::CapturingToday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::AwaitingWake => "awaiting wake",
            Phase::CapturingToday => "capturing today",
            Phase::SleepingOvernight => "sleeping overnight",
            Phase::Complete => "complete",
        }
    }
}

pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

pub fn from_epoch_seconds(secs: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn settings(fps: u32, len: u32, days: u32) -> Settings {
        Settings {
            fps,
            len_in_seconds: len,
            real_time_duration_in_days: days,
        }
    }

    #[test]
    fn test_new_run_state() {
        let run = RunState::new(&settings(1, 10, 2));
        assert_eq!(run.total_frames, 10);
        assert_eq!(run.current_frame, 0);
        assert_eq!(run.current_day, 0);
        assert_eq!(run.frames_per_day, 5.0);
        assert_eq!(run.next_wakeup_time, 0.0);
        assert!(run.is_fresh());
    }

    #[test]
    fn test_settings_validation() {
        assert!(settings(1, 10, 2).validate().is_ok());
        assert!(settings(0, 10, 2).validate().is_err());
        assert!(settings(1, 0, 2).validate().is_err());
        assert!(settings(1, 10, 0).validate().is_err());
    }

    #[test]
    fn test_day_target_even_split() {
        let mut run = RunState::new(&settings(1, 10, 2));
        assert_eq!(run.day_target(2), 5);
        run.current_day = 1;
        assert_eq!(run.day_target(2), 10);
    }

    #[test]
    fn test_day_target_uneven_split_ends_on_total() {
        let mut run = RunState::new(&settings(1, 10, 3));
        let targets: Vec<u64> = (0..3)
            .map(|day| {
                run.current_day = day;
                run.day_target(3)
            })
            .collect();
        assert_eq!(targets, vec![4, 7, 10]);

        run.current_day = 5;
        assert_eq!(run.day_target(3), 10);
    }

    #[test]
    fn test_wakeup_round_trips_through_epoch_seconds() {
        let at = Utc.with_ymd_and_hms(2024, 6, 21, 5, 30, 15).unwrap();
        let mut run = RunState::new(&settings(1, 10, 2));
        run.set_next_wakeup(at);
        assert_eq!(run.next_wakeup(), at);
        assert_eq!(run.next_wakeup_time, at.timestamp() as f64);
    }

    #[test]
    fn test_schema_field_names() {
        let json = serde_json::to_value(RunState::new(&settings(1, 10, 2))).unwrap();
        for key in ["total_frames", "current_frame", "current_day", "frames_per_day", "next_wakeup_time"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }

        let daily: DailyProgress =
            serde_json::from_str(r#"{"sleep_duration": 12.5, "current_frame": 3}"#).unwrap();
        assert_eq!(daily.sleep_duration, 12.5);
        assert_eq!(daily.current_frame, 3);
    }

    #[test]
    fn test_spread_over_daylight() {
        let daily = DailyProgress::spread_over(43_200.0, 5.0);
        assert_eq!(daily.sleep_duration, 8_640.0);
        assert_eq!(daily.current_frame, 0);
    }

    #[test]
    fn test_phase_derivation() {
        let s = settings(1, 10, 2);
        let mut run = RunState::new(&s);
        let daily = DailyProgress::spread_over(100.0, 5.0);

        assert_eq!(Phase::derive(&s, None, None), Phase::Uninitialized);
        assert_eq!(Phase::derive(&s, Some(&run), None), Phase::AwaitingWake);
        assert_eq!(Phase::derive(&s, Some(&run), Some(&daily)), Phase::AwaitingWake);

        run.next_wakeup_time = 1_700_000_000.0;
        assert_eq!(Phase::derive(&s, Some(&run), Some(&daily)), Phase::CapturingToday);
        assert_eq!(Phase::derive(&s, Some(&run), None), Phase::SleepingOvernight);

        run.current_day = 2;
        assert_eq!(Phase::derive(&s, Some(&run), None), Phase::Complete);
    }
}
