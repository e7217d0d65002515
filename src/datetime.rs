//! Lenient date/time parsing for block parameters.
//!
//! Accepts the absolute formats people actually type into templates
//! (ISO dates, US dates, RFC 3339/2822, spelled-out months, `@unix`) and a
//! small relative grammar:
//!
//! ```text
//! expr    := anchor? (offset | clock)*
//! anchor  := now | today | midnight | noon | tomorrow | yesterday | weekday
//! offset  := [+|-]N unit [ago] | next (unit | weekday) | last (unit | weekday)
//! clock   := H:MM[:SS] [am|pm] | H (am|pm)
//! unit    := sec | min | hour | day | week | fortnight | month | year (plurals ok)
//! weekday := monday | mon | tuesday | tue | ... (`weekday` alone means today or the next one)
//! ```
//!
//! A clock time sets the time of day on whatever date the expression has
//! reached so far, e.g. `tomorrow 09:00` or `next friday 5pm`.
//!
//! Text without an explicit offset is read in the parser's fixed UTC offset.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, Offset, TimeZone,
    Utc, Weekday,
};
use itertools::Itertools;

use crate::errors::{BlockError, Result};
use crate::parser::Parser;

// %B also takes "Dec" as well as "December".
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%B %d %Y %H:%M:%S",
    "%B %d %Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
];

// chrono's %B matches full and abbreviated month names, case-insensitively.
const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y", "%B %d %Y"];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M %z"];

#[derive(Debug, Clone, Copy)]
pub struct DateParser {
    offset: FixedOffset,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::utc()
    }
}

impl DateParser {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// East-of-UTC offset in minutes; out-of-range values fall back to UTC.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::with_offset)
            .unwrap_or_default()
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parse `text` into an instant. Relative expressions are resolved
    /// against `base`.
    pub fn parse(&self, text: &str, base: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let text = text.split_whitespace().join(" ");
        if text.is_empty() {
            return Err(BlockError::Parse("empty date text".into()));
        }

        if let Some(at) = self.parse_absolute(&text) {
            return Ok(at);
        }
        self.parse_relative(&text, base)
    }

    fn parse_absolute(&self, text: &str) -> Option<DateTime<Utc>> {
        if let Some(secs) = text.strip_prefix('@') {
            let secs = secs.parse::<i64>().ok()?;
            return Utc.timestamp_opt(secs, 0).single();
        }
        if let Ok(at) = DateTime::parse_from_rfc3339(text) {
            return Some(at.with_timezone(&Utc));
        }
        if let Ok(at) = DateTime::parse_from_rfc2822(text) {
            return Some(at.with_timezone(&Utc));
        }
        for fmt in OFFSET_DATETIME_FORMATS {
            if let Ok(at) = DateTime::parse_from_str(text, fmt) {
                return Some(at.with_timezone(&Utc));
            }
        }
        for fmt in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
                return self.localize(naive);
            }
        }
        for fmt in NAIVE_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
                return self.localize(date.and_hms_opt(0, 0, 0)?);
            }
        }
        None
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|at| at.with_timezone(&Utc))
    }

    fn parse_relative(&self, text: &str, base: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let mut p = Parser::new(text);
        let mut at = base.with_timezone(&self.offset);
        let mut first = true;

        loop {
            p.skip_ws();
            if p.eof() {
                break;
            }
            if p.peek_sign_or_digit() {
                let signed = matches!(p.peek_char(), Some('+') | Some('-'));
                let n = p.parse_int()?;
                if !signed && p.consume_char(':') {
                    let minute = p.parse_int()?;
                    let second = if p.consume_char(':') { p.parse_int()? } else { 0 };
                    let hour = match followed_by_meridiem(&mut p) {
                        Some(m) => apply_meridiem(n, &m)?,
                        None => n,
                    };
                    at = set_clock(at, hour, minute, second)?;
                    first = false;
                    continue;
                }
                p.skip_ws();
                let word = p.parse_word()?;
                if !signed && is_meridiem(&word) {
                    at = set_clock(at, apply_meridiem(n, &word)?, 0, 0)?;
                } else {
                    let unit = Unit::from_word(&word)?;
                    let n = if followed_by_ago(&mut p) { -n } else { n };
                    at = unit.shift(at, n)?;
                }
            } else {
                let word = p.parse_word()?;
                match word.as_str() {
                    "next" | "last" => {
                        p.skip_ws();
                        let target = p.parse_word()?;
                        let step = if word == "next" { 1 } else { -1 };
                        at = match target.parse::<Weekday>() {
                            Ok(wd) => on_weekday(at, wd, step)?,
                            Err(_) => Unit::from_word(&target)?.shift(at, step)?,
                        };
                    }
                    _ if first => at = anchor(&word, at)?,
                    _ => return Err(unrecognized(&word)),
                }
            }
            first = false;
        }

        Ok(at.with_timezone(&Utc))
    }
}

fn followed_by_ago(p: &mut Parser<'_>) -> bool {
    let mark = p.position();
    p.skip_ws();
    match p.parse_word() {
        Ok(w) if w == "ago" => true,
        _ => {
            p.rewind(mark);
            false
        }
    }
}

fn is_meridiem(word: &str) -> bool {
    word == "am" || word == "pm"
}

fn followed_by_meridiem(p: &mut Parser<'_>) -> Option<String> {
    let mark = p.position();
    p.skip_ws();
    match p.parse_word() {
        Ok(w) if is_meridiem(&w) => Some(w),
        _ => {
            p.rewind(mark);
            None
        }
    }
}

// 12-hour clock to 24-hour clock.
fn apply_meridiem(hour: i64, meridiem: &str) -> Result<i64> {
    if !(1..=12).contains(&hour) {
        return Err(BlockError::Parse(format!("hour {hour} out of range for {meridiem}")));
    }
    Ok(match (hour, meridiem) {
        (12, "am") => 0,
        (12, _) => 12,
        (h, "pm") => h + 12,
        (h, _) => h,
    })
}

fn set_clock(at: DateTime<FixedOffset>, hour: i64, minute: i64, second: i64) -> Result<DateTime<FixedOffset>> {
    let part = |v: i64| u32::try_from(v).ok();
    let naive = match (part(hour), part(minute), part(second)) {
        (Some(h), Some(m), Some(s)) => at.date_naive().and_hms_opt(h, m, s),
        _ => None,
    };
    naive
        .and_then(|naive| at.timezone().from_local_datetime(&naive).single())
        .ok_or_else(|| BlockError::Parse(format!("invalid time of day {hour}:{minute:02}:{second:02}")))
}

fn start_of_day(date: NaiveDate, tz: FixedOffset, hour: u32) -> Option<DateTime<FixedOffset>> {
    date.and_hms_opt(hour, 0, 0)
        .and_then(|naive| tz.from_local_datetime(&naive).single())
}

/// Midnight of the given weekday. `step` 0 picks today or the next one,
/// 1 the first one strictly after today, -1 the last one strictly before.
fn on_weekday(at: DateTime<FixedOffset>, wd: Weekday, step: i64) -> Result<DateTime<FixedOffset>> {
    let today = at.date_naive();
    let from = i64::from(today.weekday().num_days_from_monday());
    let to = i64::from(wd.num_days_from_monday());
    let days = match step {
        0 => (to - from).rem_euclid(7),
        s if s > 0 => match (to - from).rem_euclid(7) {
            0 => 7,
            ahead => ahead,
        },
        _ => match (from - to).rem_euclid(7) {
            0 => -7,
            back => -back,
        },
    };
    Duration::try_days(days)
        .and_then(|d| today.checked_add_signed(d))
        .and_then(|date| start_of_day(date, at.timezone(), 0))
        .ok_or_else(|| BlockError::Parse("date out of range".into()))
}

fn unrecognized(word: &str) -> BlockError {
    BlockError::Parse(format!("unrecognized date text '{word}'"))
}

fn anchor(word: &str, at: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>> {
    let tz = at.timezone();
    let today = at.date_naive();
    let at_hour = |d: NaiveDate, h: u32| start_of_day(d, tz, h);
    let resolved = match word {
        "now" => Some(at),
        "today" | "midnight" => at_hour(today, 0),
        "noon" => at_hour(today, 12),
        "tomorrow" => today.succ_opt().and_then(|d| at_hour(d, 0)),
        "yesterday" => today.pred_opt().and_then(|d| at_hour(d, 0)),
        _ => {
            return match word.parse::<Weekday>() {
                Ok(wd) => on_weekday(at, wd, 0),
                Err(_) => Err(unrecognized(word)),
            }
        }
    };
    resolved.ok_or_else(|| BlockError::Parse("date out of range".into()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Fortnight,
    Month,
    Year,
}

impl Unit {
    fn from_word(word: &str) -> Result<Self> {
        let unit = match word.strip_suffix('s').unwrap_or(word) {
            "sec" | "second" => Unit::Second,
            "min" | "minute" => Unit::Minute,
            "hour" => Unit::Hour,
            "day" => Unit::Day,
            "week" => Unit::Week,
            "fortnight" => Unit::Fortnight,
            "month" => Unit::Month,
            "year" => Unit::Year,
            _ => return Err(BlockError::Parse(format!("unknown time unit '{word}'"))),
        };
        Ok(unit)
    }

    fn seconds(self) -> i64 {
        match self {
            Unit::Second => 1,
            Unit::Minute => 60,
            Unit::Hour => 3_600,
            Unit::Day => 86_400,
            Unit::Week => 7 * 86_400,
            Unit::Fortnight => 14 * 86_400,
            Unit::Month | Unit::Year => 0,
        }
    }

    fn shift(self, at: DateTime<FixedOffset>, n: i64) -> Result<DateTime<FixedOffset>> {
        let shifted = match self {
            Unit::Month | Unit::Year => {
                let months = if self == Unit::Year { n.checked_mul(12) } else { Some(n) };
                months.and_then(|m| {
                    let span = Months::new(u32::try_from(m.unsigned_abs()).ok()?);
                    if m >= 0 {
                        at.checked_add_months(span)
                    } else {
                        at.checked_sub_months(span)
                    }
                })
            }
            _ => n
                .checked_mul(self.seconds())
                .and_then(Duration::try_seconds)
                .and_then(|d| at.checked_add_signed(d)),
        };
        shifted.ok_or_else(|| BlockError::Parse("date arithmetic overflow".into()))
    }
}
