//! Opening-hours evaluation.
//!
//! Everything here fails closed: a day that is missing, note-only, half
//! specified or unparsable is never reported as open.

use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, Timelike};

use crate::types::{DayHours, WeeklyHours};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parses "H:MM" / "HH:MM" into minutes since midnight. "24:00" is accepted
/// and maps to the end of the day (only meaningful as a closing time).
pub fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if minutes > 59 {
        return None;
    }
    match hours {
        0..=23 => Some(hours * 60 + minutes),
        24 if minutes == 0 => Some(MINUTES_PER_DAY),
        _ => None,
    }
}

/// The (open, close) minutes of a structured day, or `None` for anything
/// that cannot be evaluated.
pub fn day_span(day: &DayHours) -> Option<(u32, u32)> {
    let open = parse_hhmm(day.open.as_deref()?)?;
    let close = parse_hhmm(day.close.as_deref()?)?;
    if open >= MINUTES_PER_DAY {
        return None;
    }
    Some((open, close))
}

/// Describes why a day entry is malformed, if it is.
pub fn day_problem(day: &DayHours) -> Option<String> {
    match (&day.open, &day.close) {
        (None, None) if day.note.is_some() => None,
        (None, None) => Some("empty hours entry".to_string()),
        (Some(_), None) | (None, Some(_)) => Some("half-specified open/close pair".to_string()),
        (Some(o), Some(c)) => {
            if day_span(day).is_none() {
                Some(format!("unparsable times '{o}'-'{c}'"))
            } else {
                None
            }
        }
    }
}

fn minutes_since_midnight(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Whether `minute` falls in `[open, close)`, wrapping past midnight when
/// `close < open`. An empty interval (`open == close`) is closed.
pub fn span_contains(open: u32, close: u32, minute: u32) -> bool {
    if open == close {
        false
    } else if close > open {
        minute >= open && minute < close
    } else {
        minute >= open || minute < close
    }
}

/// Evaluates today's entry only; the previous day's overnight span does not
/// carry over.
pub fn is_open_at(hours: &WeeklyHours, at: NaiveDateTime) -> bool {
    let Some(day) = hours.day(at.weekday()) else {
        return false;
    };
    let Some((open, close)) = day_span(day) else {
        return false;
    };
    span_contains(open, close, minutes_since_midnight(at.time()))
}

pub fn is_open_now(hours: &WeeklyHours) -> bool {
    is_open_at(hours, Local::now().naive_local())
}
