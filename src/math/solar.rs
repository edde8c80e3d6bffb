//! Sunrise and sunset times from solar geometry
//!
//! Implements the NOAA low-accuracy solar position algorithm. Accuracy is
//! within a couple of minutes of published almanac values, which is ample for
//! scheduling wallpaper themes around civil daylight.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

/// Zenith angle of the sun's center at official (civil) sunrise and sunset
const OFFICIAL_ZENITH_DEG: f64 = 90.833;

/// Minutes past midnight UTC of sunrise and sunset on one date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunEventsUtc {
    /// Sunrise, minutes past 00:00 UTC
    pub sunrise_minutes: f64,
    /// Sunset, minutes past 00:00 UTC
    pub sunset_minutes: f64,
}

/// Why no sunrise/sunset pair exists for a date and location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolarAnomaly {
    /// Sun stays above the horizon for the whole day
    PolarDay,
    /// Sun stays below the horizon for the whole day
    PolarNight,
}

impl std::fmt::Display for SolarAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PolarDay => write!(f, "the sun does not set at this latitude on this date"),
            Self::PolarNight => write!(f, "the sun does not rise at this latitude on this date"),
        }
    }
}

/// Compute sunrise and sunset in minutes past midnight UTC
///
/// # Errors
///
/// Returns a [`SolarAnomaly`] when the location is inside the polar circle
/// and the sun never crosses the official zenith on the given date.
pub fn sun_events_utc(
    date: NaiveDate,
    latitude_deg: f64,
    longitude_deg: f64,
) -> std::result::Result<SunEventsUtc, SolarAnomaly> {
    let day_of_year = f64::from(date.ordinal());
    let days_in_year = if date.leap_year() { 366.0 } else { 365.0 };

    // Fractional year at solar noon, radians
    let gamma = 2.0 * std::f64::consts::PI / days_in_year * (day_of_year - 1.0 + 0.5);

    let eqtime = equation_of_time_minutes(gamma);
    let decl = solar_declination_rad(gamma);

    let lat = latitude_deg.to_radians();
    let zenith = OFFICIAL_ZENITH_DEG.to_radians();

    let cos_ha = (zenith.cos() - lat.sin() * decl.sin()) / (lat.cos() * decl.cos());
    if cos_ha > 1.0 {
        return Err(SolarAnomaly::PolarNight);
    }
    if cos_ha < -1.0 {
        return Err(SolarAnomaly::PolarDay);
    }

    let ha_deg = cos_ha.acos().to_degrees();

    let sunrise_minutes = 720.0 - 4.0 * (longitude_deg + ha_deg) - eqtime;
    let sunset_minutes = 720.0 - 4.0 * (longitude_deg - ha_deg) - eqtime;

    Ok(SunEventsUtc {
        sunrise_minutes,
        sunset_minutes,
    })
}

/// Equation of time in minutes for a fractional year angle
fn equation_of_time_minutes(gamma: f64) -> f64 {
    229.18
        * (0.000_075 + 0.001_868 * gamma.cos()
            - 0.032_077 * gamma.sin()
            - 0.014_615 * (2.0 * gamma).cos()
            - 0.040_849 * (2.0 * gamma).sin())
}

/// Solar declination in radians for a fractional year angle
fn solar_declination_rad(gamma: f64) -> f64 {
    0.006_918 - 0.399_912 * gamma.cos() + 0.070_257 * gamma.sin()
        - 0.006_758 * (2.0 * gamma).cos()
        + 0.000_907 * (2.0 * gamma).sin()
        - 0.002_697 * (3.0 * gamma).cos()
        + 0.001_48 * (3.0 * gamma).sin()
}

/// Convert UTC event minutes to a local wall-clock time
///
/// `utc_offset_minutes` is the zone offset east of UTC for the date in
/// question. The result wraps into a single civil day.
pub fn utc_minutes_to_local_time(utc_minutes: f64, utc_offset_minutes: i32) -> NaiveTime {
    let local = utc_minutes + f64::from(utc_offset_minutes);
    let wrapped = local.rem_euclid(24.0 * 60.0);
    let hour = (wrapped / 60.0).floor() as u32;
    let minute = (wrapped % 60.0).floor() as u32;
    let second = ((wrapped * 60.0) % 60.0).floor() as u32;
    NaiveTime::from_hms_opt(hour.min(23), minute.min(59), second.min(59))
        .unwrap_or(NaiveTime::MIN)
}

/// Minutes past local midnight of a wall-clock time
pub fn minutes_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}
