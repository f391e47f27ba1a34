//! Business-hours arithmetic over a configurable working calendar.
//!
//! Stored instants are UTC; the calendar's offset maps them onto the office wall
//! clock before the daily window is applied.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

const DEFAULT_START_HOUR: u32 = 8;
const DEFAULT_END_HOUR: u32 = 17;
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Working window and working days used to count business hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHoursConfig {
    pub start_hour: u32,
    pub end_hour: u32,
    pub working_days: Vec<Weekday>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for WorkingHoursConfig {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_START_HOUR,
            end_hour: DEFAULT_END_HOUR,
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            utc_offset_minutes: 0,
        }
    }
}

impl WorkingHoursConfig {
    pub fn validate(&self) -> Result<(), CalendarError> {
        WorkingCalendar::new(self).map(|_| ())
    }

    /// Length of one full working day in hours.
    pub fn daily_hours(&self) -> u32 {
        self.end_hour.saturating_sub(self.start_hour)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("{field} must be between 0 and 23 (found {value})")]
    HourOutOfRange { field: &'static str, value: u32 },
    #[error("start hour {start} must be earlier than end hour {end}")]
    EmptyWindow { start: u32, end: u32 },
    #[error("at least one working day is required")]
    NoWorkingDays,
    #[error("utc offset of {0} minutes is outside +/-14 hours")]
    InvalidUtcOffset(i32),
}

/// Validated form of [`WorkingHoursConfig`].
#[derive(Debug, Clone)]
pub struct WorkingCalendar {
    opens_at: NaiveTime,
    closes_at: NaiveTime,
    working_days: [bool; 7],
    offset: FixedOffset,
}

impl WorkingCalendar {
    pub fn new(config: &WorkingHoursConfig) -> Result<Self, CalendarError> {
        let opens_at = hour_of_day("start_hour", config.start_hour)?;
        let closes_at = hour_of_day("end_hour", config.end_hour)?;
        if config.start_hour >= config.end_hour {
            return Err(CalendarError::EmptyWindow {
                start: config.start_hour,
                end: config.end_hour,
            });
        }
        if config.working_days.is_empty() {
            return Err(CalendarError::NoWorkingDays);
        }
        if config.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(CalendarError::InvalidUtcOffset(config.utc_offset_minutes));
        }
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60)
            .ok_or(CalendarError::InvalidUtcOffset(config.utc_offset_minutes))?;

        let mut working_days = [false; 7];
        for day in &config.working_days {
            working_days[day.num_days_from_monday() as usize] = true;
        }

        Ok(Self {
            opens_at,
            closes_at,
            working_days,
            offset,
        })
    }

    pub fn is_working_day(&self, day: Weekday) -> bool {
        self.working_days[day.num_days_from_monday() as usize]
    }

    /// Working time between two instants, in fractional hours.
    pub fn hours_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
        if end <= start {
            return 0.0;
        }

        let start = start.with_timezone(&self.offset);
        let end = end.with_timezone(&self.offset);
        let last_day = end.date_naive();
        let mut day = start.date_naive();
        let mut worked_ms: i64 = 0;

        while day <= last_day {
            if self.is_working_day(day.weekday()) {
                let opens = day.and_time(self.opens_at).and_local_timezone(self.offset);
                let closes = day.and_time(self.closes_at).and_local_timezone(self.offset);
                if let (Some(opens), Some(closes)) = (opens.single(), closes.single()) {
                    let window_start = opens.max(start);
                    let window_end = closes.min(end);
                    if window_end > window_start {
                        worked_ms += (window_end - window_start).num_milliseconds();
                    }
                }
            }

            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        worked_ms as f64 / 3_600_000.0
    }
}

fn hour_of_day(field: &'static str, value: u32) -> Result<NaiveTime, CalendarError> {
    if value > 23 {
        return Err(CalendarError::HourOutOfRange { field, value });
    }
    NaiveTime::from_hms_opt(value, 0, 0).ok_or(CalendarError::HourOutOfRange { field, value })
}

/// Business hours between two optional instants.
///
/// Returns zero when either bound is missing or `end <= start`. An invalid
/// config is always an error, even when the interval itself is empty.
pub fn business_hours(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    config: &WorkingHoursConfig,
) -> Result<f64, CalendarError> {
    let calendar = WorkingCalendar::new(config)?;
    match (start, end) {
        (Some(start), Some(end)) => Ok(calendar.hours_between(start, end)),
        _ => Ok(0.0),
    }
}
