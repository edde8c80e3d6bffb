//! Theme selection from the day/night schedule
//!
//! Outside blend windows the active side's weighted list is sampled
//! directly. Inside a blend window of radius `B` around sunrise or sunset the
//! sampling distribution is the linear mixture of the two sides, so theme
//! probability is continuous across every boundary.

use crate::io::configuration::{ScheduleConfig, DEFAULT_THEME};
use crate::io::error::{schedule_error, Result};
use crate::math::probability::{blend_factor, RandomSelector};
use crate::math::solar::{minutes_of_day, sun_events_utc, utc_minutes_to_local_time};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone};
use serde::Serialize;

/// Half a day in minutes, used to wrap boundary distances
const HALF_DAY_MINUTES: i64 = 720;

/// Which solar boundary a blend window is centered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// Night-to-day transition
    Sunrise,
    /// Day-to-night transition
    Sunset,
}

/// Phase of the schedule at some instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "phase")]
pub enum DayPhase {
    /// Inside the day window, outside any blend
    Day,
    /// Inside the night window, outside any blend
    Night,
    /// Inside a blend window
    Blend {
        /// Boundary the window is centered on
        boundary: Boundary,
        /// Linear blend factor in [0, 1] toward the after-side
        alpha: f64,
    },
}

/// A normalized probability distribution over theme names
#[derive(Debug, Clone, Serialize)]
pub struct ThemeMix {
    entries: Vec<MixEntry>,
}

/// One theme with its selection probability
#[derive(Debug, Clone, Serialize)]
pub struct MixEntry {
    /// Theme name
    pub name: String,
    /// Probability in [0, 1]
    pub probability: f64,
}

impl ThemeMix {
    /// Build a normalized mix from weighted entries
    ///
    /// Entries with the same name are merged. A list that is empty or sums
    /// to zero collapses to the `default` theme.
    fn from_weighted(weighted: &[(String, f64)]) -> Self {
        let total: f64 = weighted.iter().map(|(_, w)| w.max(0.0)).sum();
        if total <= 0.0 {
            return Self {
                entries: vec![MixEntry {
                    name: DEFAULT_THEME.to_string(),
                    probability: 1.0,
                }],
            };
        }

        let mut entries: Vec<MixEntry> = Vec::new();
        for (name, weight) in weighted {
            let probability = weight.max(0.0) / total;
            if probability == 0.0 {
                continue;
            }
            match entries.iter_mut().find(|e| &e.name == name) {
                Some(entry) => entry.probability += probability,
                None => entries.push(MixEntry {
                    name: name.clone(),
                    probability,
                }),
            }
        }
        Self { entries }
    }

    /// Entries in mix order
    pub fn entries(&self) -> &[MixEntry] {
        &self.entries
    }

    /// Probability of a specific theme, zero when absent
    pub fn probability_of(&self, name: &str) -> f64 {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map_or(0.0, |e| e.probability)
    }

    /// Theme with the highest probability
    pub fn dominant(&self) -> &str {
        self.entries
            .iter()
            .max_by(|a, b| a.probability.total_cmp(&b.probability))
            .map_or(DEFAULT_THEME, |e| e.name.as_str())
    }

    /// Sample one theme according to the distribution
    pub fn sample(&self, selector: &mut RandomSelector) -> &str {
        let weights: Vec<f64> = self.entries.iter().map(|e| e.probability).collect();
        let index = selector.weighted_choice(&weights);
        self.entries
            .get(index)
            .map_or(DEFAULT_THEME, |e| e.name.as_str())
    }
}

/// Outcome of sampling the scheduler at an instant
#[derive(Debug, Clone, Serialize)]
pub struct ThemeChoice {
    /// Sampled theme name
    pub theme: String,
    /// Phase the instant falls in
    pub phase: DayPhase,
    /// Distribution the theme was drawn from
    pub mix: ThemeMix,
    /// Sunrise used for the day window, when a schedule is configured
    pub sunrise: Option<NaiveTime>,
    /// Sunset used for the day window, when a schedule is configured
    pub sunset: Option<NaiveTime>,
}

/// One row of the 24-hour schedule table
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    /// Start of the interval
    pub time: NaiveTime,
    /// Most probable theme for the interval
    pub theme: String,
    /// Probability of that theme
    pub probability: f64,
    /// Whether the interval is inside a blend window
    pub is_blend: bool,
}

/// Determines the active theme from the configured schedule
pub struct ThemeScheduler {
    config: ScheduleConfig,
}

impl ThemeScheduler {
    /// Create a scheduler over a validated schedule configuration
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// Sunrise and sunset for a date, or `None` when nothing is configured
    ///
    /// Manual `HH:MM` overrides take priority per boundary; the remaining
    /// boundaries come from solar geometry at the configured coordinates.
    ///
    /// # Errors
    ///
    /// Returns `Schedule` when solar computation fails (polar day/night) or
    /// when exactly one manual time is given without coordinates.
    pub fn boundaries(&self, date: NaiveDate) -> Result<Option<(NaiveTime, NaiveTime)>> {
        let manual_rise = self.manual_time(self.config.sunrise_time.as_deref())?;
        let manual_set = self.manual_time(self.config.sunset_time.as_deref())?;

        if let (Some(rise), Some(set)) = (manual_rise, manual_set) {
            return Ok(Some((rise, set)));
        }

        if !self.config.has_location() {
            if manual_rise.is_some() || manual_set.is_some() {
                return Err(schedule_error(
                    "both sunrise_time and sunset_time are required when no coordinates are configured",
                ));
            }
            return Ok(None);
        }

        let latitude = self.config.latitude.unwrap_or_default();
        let longitude = self.config.longitude.unwrap_or_default();
        let events = sun_events_utc(date, latitude, longitude)
            .map_err(|anomaly| schedule_error(format!("solar computation failed: {anomaly}")))?;

        let offset = self.utc_offset_minutes(date);
        let rise =
            manual_rise.unwrap_or_else(|| utc_minutes_to_local_time(events.sunrise_minutes, offset));
        let set =
            manual_set.unwrap_or_else(|| utc_minutes_to_local_time(events.sunset_minutes, offset));
        Ok(Some((rise, set)))
    }

    /// Phase and sampling distribution at an instant
    ///
    /// # Errors
    ///
    /// Propagates boundary computation failures.
    pub fn mixture_at(&self, now: NaiveDateTime) -> Result<(DayPhase, ThemeMix)> {
        let day_mix = ThemeMix::from_weighted(&self.side(&self.config.day_themes));
        let night_mix = ThemeMix::from_weighted(&self.side(&self.config.night_themes));

        let Some((sunrise, sunset)) = self.boundaries(now.date())? else {
            tracing::debug!("no schedule configured, staying on the day side");
            return Ok((DayPhase::Day, day_mix));
        };

        let current = minutes_of_day(now.time());
        let radius = self.config.blend_minutes();

        if radius > 0 {
            let to_sunset = wrap_minutes(current - minutes_of_day(sunset));
            if to_sunset.abs() <= radius {
                let alpha = blend_factor(to_sunset as f64, radius as f64);
                let mix = mix_sides(&day_mix, &night_mix, alpha);
                let phase = DayPhase::Blend {
                    boundary: Boundary::Sunset,
                    alpha,
                };
                return Ok((phase, mix));
            }

            let to_sunrise = wrap_minutes(current - minutes_of_day(sunrise));
            if to_sunrise.abs() <= radius {
                let alpha = blend_factor(to_sunrise as f64, radius as f64);
                let mix = mix_sides(&night_mix, &day_mix, alpha);
                let phase = DayPhase::Blend {
                    boundary: Boundary::Sunrise,
                    alpha,
                };
                return Ok((phase, mix));
            }
        }

        if is_day(now.time(), sunrise, sunset) {
            Ok((DayPhase::Day, day_mix))
        } else {
            Ok((DayPhase::Night, night_mix))
        }
    }

    /// Sample the active theme at an instant
    ///
    /// # Errors
    ///
    /// Propagates boundary computation failures.
    pub fn sample_theme(
        &self,
        now: NaiveDateTime,
        selector: &mut RandomSelector,
    ) -> Result<ThemeChoice> {
        let (phase, mix) = self.mixture_at(now)?;
        let theme = mix.sample(selector).to_string();
        let boundaries = self.boundaries(now.date())?;
        Ok(ThemeChoice {
            theme,
            phase,
            mix,
            sunrise: boundaries.map(|(rise, _)| rise),
            sunset: boundaries.map(|(_, set)| set),
        })
    }

    /// Dominant-theme table over one day at the given interval
    ///
    /// # Errors
    ///
    /// Propagates boundary computation failures.
    pub fn schedule_table(
        &self,
        date: NaiveDate,
        interval_minutes: u32,
    ) -> Result<Vec<ScheduleEntry>> {
        let interval = interval_minutes.clamp(1, 1440);
        let mut entries = Vec::new();

        let mut minute = 0;
        while minute < 1440 {
            let time = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)
                .unwrap_or(NaiveTime::MIN);
            let (phase, mix) = self.mixture_at(date.and_time(time))?;
            let theme = mix.dominant().to_string();
            let probability = mix.probability_of(&theme);
            entries.push(ScheduleEntry {
                time,
                theme,
                probability,
                is_blend: matches!(phase, DayPhase::Blend { .. }),
            });
            minute += interval;
        }

        Ok(entries)
    }

    /// Render the schedule table as aligned text for the status command
    pub fn render_table(entries: &[ScheduleEntry]) -> String {
        let mut lines = vec![
            "Theme schedule (24h):".to_string(),
            format!("{:<8}{:<16}{}", "TIME", "THEME", "PROBABILITY"),
        ];
        for entry in entries {
            let theme = if entry.is_blend {
                format!("({})", entry.theme)
            } else {
                entry.theme.clone()
            };
            lines.push(format!(
                "{:<8}{theme:<16}{:.0}%",
                entry.time.format("%H:%M"),
                entry.probability * 100.0
            ));
        }
        lines.join("\n")
    }

    fn side(&self, list: &[crate::io::configuration::WeightedTheme]) -> Vec<(String, f64)> {
        list.iter().map(|t| (t.name.clone(), t.weight)).collect()
    }

    fn manual_time(&self, value: Option<&str>) -> Result<Option<NaiveTime>> {
        let Some(text) = value else {
            return Ok(None);
        };
        let (hour, minute) = crate::io::configuration::parse_clock(text)
            .ok_or_else(|| schedule_error(format!("malformed manual time '{text}'")))?;
        Ok(NaiveTime::from_hms_opt(hour, minute, 0))
    }

    /// Zone offset east of UTC in minutes for a date
    fn utc_offset_minutes(&self, date: NaiveDate) -> i32 {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
        if let Some(tz_name) = &self.config.timezone {
            if let Ok(tz) = tz_name.parse::<chrono_tz::Tz>() {
                if let Some(instant) = tz.from_local_datetime(&noon).earliest() {
                    return instant.offset().fix().local_minus_utc() / 60;
                }
            }
        }
        chrono::Local
            .from_local_datetime(&noon)
            .earliest()
            .map_or(0, |instant| instant.offset().fix().local_minus_utc() / 60)
    }
}

/// Mix the before and after sides of a boundary with blend factor `alpha`
fn mix_sides(before: &ThemeMix, after: &ThemeMix, alpha: f64) -> ThemeMix {
    let mut weighted: Vec<(String, f64)> = Vec::new();
    for entry in before.entries() {
        weighted.push((entry.name.clone(), entry.probability * (1.0 - alpha)));
    }
    for entry in after.entries() {
        weighted.push((entry.name.clone(), entry.probability * alpha));
    }
    ThemeMix::from_weighted(&weighted)
}

/// Wrap a minute distance into [-720, 720)
fn wrap_minutes(distance: i64) -> i64 {
    let mut d = distance;
    if d >= HALF_DAY_MINUTES {
        d -= 2 * HALF_DAY_MINUTES;
    } else if d < -HALF_DAY_MINUTES {
        d += 2 * HALF_DAY_MINUTES;
    }
    d
}

/// Whether a time falls in the day window [sunrise, sunset)
fn is_day(current: NaiveTime, sunrise: NaiveTime, sunset: NaiveTime) -> bool {
    let cur = minutes_of_day(current);
    let rise = minutes_of_day(sunrise);
    let set = minutes_of_day(sunset);
    if rise <= set {
        (rise..set).contains(&cur)
    } else {
        // Day window wraps midnight (manual overrides can invert the pair)
        cur >= rise || cur < set
    }
}
