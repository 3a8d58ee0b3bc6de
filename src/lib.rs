//! Daylapse: an unattended, multi-day daylight timelapse scheduler.
//!
//! The daemon wakes during daylight, takes one frame, persists its progress
//! and sleeps, spreading a fixed frame budget over the daylight hours of a
//! configured number of days. All progress lives in three JSON documents so
//! the process can be killed and restarted at any point.

pub mod capture;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod schedule;
pub mod state;
pub mod store;
pub mod sun;

pub use error::{DaylapseError, Result};
