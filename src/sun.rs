//! Sunrise and sunset for a fixed location.
//!
//! Uses the NOAA fractional-year approximation: equation of time and solar
//! declination from a Fourier series, then the hour angle at which the sun's
//! upper limb touches the horizon (zenith 90.833°, accounting for
//! refraction). Accurate to a couple of minutes at mid latitudes.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::config::LocationConfig;
use crate::error::SunError;

const SUNRISE_ZENITH_DEG: f64 = 90.833;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl SunTimes {
    pub fn daylight(&self) -> Duration {
        self.sunset - self.sunrise
    }
}

/// Source of sunrise/sunset instants for the configured location.
pub trait SunOracle {
    /// Sun times on the given civil date.
    fn sun_times(&self, date: NaiveDate) -> Result<SunTimes, SunError>;
}

/// Computes sun times from latitude and longitude.
#[derive(Debug, Clone, Copy)]
pub struct SolarCalculator {
    latitude: f64,
    longitude: f64,
}

impl SolarCalculator {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn for_location(location: &LocationConfig) -> Self {
        Self::new(location.latitude, location.longitude)
    }
}

impl SunOracle for SolarCalculator {
    fn sun_times(&self, date: NaiveDate) -> Result<SunTimes, SunError> {
        let days_in_year = if is_leap_year(date.year()) { 366.0 } else { 365.0 };
        let gamma = 2.0 * std::f64::consts::PI / days_in_year * f64::from(date.ordinal0());

        // Minutes
        let eq_time = 229.18
            * (0.000075 + 0.001868 * gamma.cos()
                - 0.032077 * gamma.sin()
                - 0.014615 * (2.0 * gamma).cos()
                - 0.040849 * (2.0 * gamma).sin());

        // Radians
        let declination = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
            - 0.006758 * (2.0 * gamma).cos()
            + 0.000907 * (2.0 * gamma).sin()
            - 0.002697 * (3.0 * gamma).cos()
            + 0.00148 * (3.0 * gamma).sin();

        let lat = self.latitude.to_radians();
        let cos_hour_angle = SUNRISE_ZENITH_DEG.to_radians().cos() / (lat.cos() * declination.cos())
            - lat.tan() * declination.tan();

        if cos_hour_angle > 1.0 {
            return Err(SunError::NoSunrise(date));
        }
        if cos_hour_angle < -1.0 {
            return Err(SunError::NoSunset(date));
        }

        let hour_angle = cos_hour_angle.acos().to_degrees();
        let sunrise_min = 720.0 - 4.0 * (self.longitude + hour_angle) - eq_time;
        let sunset_min = 720.0 - 4.0 * (self.longitude - hour_angle) - eq_time;

        let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc();
        Ok(SunTimes {
            sunrise: midnight + minutes(sunrise_min),
            sunset: midnight + minutes(sunset_min),
        })
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn minutes(value: f64) -> Duration {
    Duration::milliseconds((value * 60_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn assert_close(actual: DateTime<Utc>, expected: DateTime<Utc>, tolerance_secs: i64) {
        let diff = (actual - expected).num_seconds().abs();
        assert!(
            diff <= tolerance_secs,
            "expected {expected}, got {actual} ({diff}s off)"
        );
    }

    #[test]
    fn test_cluj_summer_solstice() {
        let sun = SolarCalculator::new(46.7712, 23.6236);
        let times = sun.sun_times(NaiveDate::from_ymd_opt(2024, 6, 21).unwrap()).unwrap();

        assert_close(times.sunrise, Utc.with_ymd_and_hms(2024, 6, 21, 2, 31, 0).unwrap(), 120);
        assert_close(times.sunset, Utc.with_ymd_and_hms(2024, 6, 21, 18, 23, 0).unwrap(), 120);
    }

    #[test]
    fn test_winter_days_are_shorter() {
        let sun = SolarCalculator::new(46.7712, 23.6236);
        let summer = sun.sun_times(NaiveDate::from_ymd_opt(2024, 6, 21).unwrap()).unwrap();
        let winter = sun.sun_times(NaiveDate::from_ymd_opt(2024, 12, 21).unwrap()).unwrap();

        assert!(winter.daylight() < Duration::hours(9));
        assert!(summer.daylight() > Duration::hours(15));
    }

    #[test]
    fn test_equator_equinox_is_about_twelve_hours() {
        let sun = SolarCalculator::new(0.0, 0.0);
        let times = sun.sun_times(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()).unwrap();

        assert_close(times.sunrise, Utc.with_ymd_and_hms(2024, 3, 20, 6, 5, 0).unwrap(), 120);
        assert_close(times.sunset, Utc.with_ymd_and_hms(2024, 3, 20, 18, 11, 0).unwrap(), 120);
    }

    #[test]
    fn test_polar_day_and_night() {
        let svalbard = SolarCalculator::new(78.2, 15.6);
        let june = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let december = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();

        assert_eq!(svalbard.sun_times(june), Err(SunError::NoSunset(june)));
        assert_eq!(svalbard.sun_times(december), Err(SunError::NoSunrise(december)));
    }
}
