//! Day and pair vocabulary
//!
//! Translates what a user types ("пятница", "tomorrow", "15.10", "10:45", "3")
//! into the coordinates schedules are keyed by: a 0-based weekday index, a
//! 1-based pair index and, when a semester start is configured, the week type
//! within the rotation. Everything here is pure; the caller supplies `today`.

use chrono::{Datelike, Days, NaiveDate, NaiveTime};

use crate::config::CalendarConfig;
use crate::models::{Pair, SlotQuery};
use crate::utils::error::MapperError;

const WEEKDAYS: [&[&str]; 7] = [
    &["monday", "mon", "понедельник", "пн", "пон"],
    &["tuesday", "tue", "tues", "вторник", "вт"],
    &["wednesday", "wed", "среда", "среду", "ср"],
    &["thursday", "thu", "thur", "thurs", "четверг", "чт"],
    &["friday", "fri", "пятница", "пятницу", "пт"],
    &["saturday", "sat", "суббота", "субботу", "сб"],
    &["sunday", "sun", "воскресенье", "вс"],
];

const TODAY: &[&str] = &["today", "сегодня"];
const TOMORROW: &[&str] = &["tomorrow", "завтра"];

/// Weekday index (0 = Monday) for an English or Russian weekday name
pub fn weekday_index(name: &str) -> Option<u8> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    WEEKDAYS
        .iter()
        .position(|names| names.contains(&name.as_str()))
        .and_then(|index| u8::try_from(index).ok())
}

/// A day input resolved to schedule coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDay {
    /// 0 = Monday .. 6 = Sunday
    pub day_index: u8,
    /// Calendar date the input refers to
    pub date: NaiveDate,
    /// Week type of `date`, when the rotation is anchored
    pub week_parity: Option<u8>,
}

impl ResolvedDay {
    /// Combine with a pair index into a query slot
    pub fn slot(&self, pair_index: u8) -> SlotQuery {
        SlotQuery::new(self.day_index, pair_index).with_week_parity(self.week_parity)
    }
}

/// Maps human day and time input onto schedule coordinates
#[derive(Debug, Clone)]
pub struct DayPairMapper {
    pairs: Vec<Pair>,
    semester_start: Option<NaiveDate>,
    week_cycle: u8,
}

impl DayPairMapper {
    /// Create a mapper over an ordered list of pairs, without week rotation
    pub fn new(pairs: Vec<Pair>) -> Self {
        Self {
            pairs,
            semester_start: None,
            week_cycle: 1,
        }
    }

    /// Create a mapper from the calendar section of the configuration
    pub fn from_config(calendar: &CalendarConfig) -> Self {
        let mapper = Self::new(calendar.pairs.clone());
        match calendar.semester_start {
            Some(start) => mapper.with_rotation(start, calendar.week_cycle),
            None => mapper,
        }
    }

    /// Anchor the week rotation: the week containing `start` has type 0
    pub fn with_rotation(mut self, start: NaiveDate, week_cycle: u8) -> Self {
        self.semester_start = Some(start);
        self.week_cycle = week_cycle.max(1);
        self
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Number of pairs in a day
    pub fn max_pairs(&self) -> u8 {
        u8::try_from(self.pairs.len()).unwrap_or(u8::MAX)
    }

    /// Look up a pair by its 1-based index
    pub fn pair(&self, index: u8) -> Option<&Pair> {
        self.pairs.iter().find(|pair| pair.index == index)
    }

    /// Resolve a weekday name, relative day or date
    ///
    /// Weekday names refer to their next occurrence, `today` included.
    /// Accepted date forms are `YYYY-MM-DD`, `DD.MM.YYYY` and `DD.MM` (year of `today`).
    pub fn resolve_day(&self, input: &str, today: NaiveDate) -> Result<ResolvedDay, MapperError> {
        let normalized = input.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(MapperError::InvalidDay(input.to_string()));
        }

        let date = if TODAY.contains(&normalized.as_str()) {
            today
        } else if TOMORROW.contains(&normalized.as_str()) {
            today
                .checked_add_days(Days::new(1))
                .ok_or_else(|| MapperError::InvalidDay(input.to_string()))?
        } else if let Some(index) = weekday_index(&normalized) {
            let ahead = (7 + u64::from(index) - u64::from(weekday_of(today))) % 7;
            today
                .checked_add_days(Days::new(ahead))
                .ok_or_else(|| MapperError::InvalidDay(input.to_string()))?
        } else {
            parse_date(&normalized, today.year())
                .ok_or_else(|| MapperError::InvalidDay(input.to_string()))?
        };

        Ok(ResolvedDay {
            day_index: weekday_of(date),
            date,
            week_parity: self.week_parity(date),
        })
    }

    /// Pair whose `[start, end)` interval contains `time`
    pub fn resolve_time_to_pair(&self, time: NaiveTime) -> Result<u8, MapperError> {
        self.pairs
            .iter()
            .find(|pair| pair.contains(time))
            .map(|pair| pair.index)
            .ok_or(MapperError::NoPairAtTime(time))
    }

    /// Validate a 1-based pair number
    pub fn resolve_pair_number(&self, number: u32) -> Result<u8, MapperError> {
        let max = self.max_pairs();
        match u8::try_from(number) {
            Ok(index) if (1..=max).contains(&index) => Ok(index),
            _ => Err(MapperError::PairOutOfRange {
                requested: number,
                max,
            }),
        }
    }

    /// Resolve either a clock time (`HH:MM`) or a pair number ("3", "3 пара")
    pub fn resolve_slot(&self, input: &str) -> Result<u8, MapperError> {
        let trimmed = input.trim();

        if trimmed.contains(':') {
            let time =
                parse_clock(trimmed).ok_or_else(|| MapperError::InvalidTime(input.to_string()))?;
            return self.resolve_time_to_pair(time);
        }

        let lowered = trimmed.to_lowercase();
        let number = lowered
            .trim_end_matches("пара")
            .trim_end_matches("pair")
            .trim();
        let number: u32 = number
            .parse()
            .map_err(|_| MapperError::InvalidTime(input.to_string()))?;
        self.resolve_pair_number(number)
    }

    /// Week type of `date` within the rotation
    ///
    /// `None` when no semester start is configured or `date` precedes it.
    pub fn week_parity(&self, date: NaiveDate) -> Option<u8> {
        let start = self.semester_start?;
        let anchor = start - Days::new(u64::from(weekday_of(start)));
        let days = date.signed_duration_since(anchor).num_days();
        if days < 0 {
            return None;
        }
        u8::try_from((days / 7) % i64::from(self.week_cycle)).ok()
    }
}

fn weekday_of(date: NaiveDate) -> u8 {
    // num_days_from_monday is always within 0..7
    date.weekday().num_days_from_monday() as u8
}

fn parse_date(input: &str, year: i32) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%d.%m.%Y"))
        .ok()
        .or_else(|| {
            let (day, month) = input.split_once('.')?;
            NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
        })
}

fn parse_clock(input: &str) -> Option<NaiveTime> {
    let (hours, minutes) = input.split_once(':')?;
    let (hours, minutes) = (hours.trim(), minutes.trim());
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}
