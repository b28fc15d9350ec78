//! Parsing of `datetime-local` form strings into Unix timestamps.
//!
//! The UI hands poll start/end over as `YYYY-MM-DDTHH:MM` (optionally with
//! seconds), the format HTML datetime inputs produce. Values are interpreted
//! as UTC; the poll program stores plain `i64` Unix seconds and does not
//! carry a timezone.

use crate::error::CoreError;

fn bad(input: &str) -> CoreError {
    CoreError::Validation(format!("Invalid date: {input}"))
}

/// Parse `YYYY-MM-DDTHH:MM[:SS]` into Unix seconds.
///
/// Rejects anything malformed or out of range (month 13, Feb 30, hour 24)
/// rather than normalizing it.
pub fn parse_datetime_local(input: &str) -> Result<i64, CoreError> {
    let raw = input.trim();
    let (date, time) = raw.split_once('T').ok_or_else(|| bad(raw))?;

    let date_parts: Vec<&str> = date.split('-').collect();
    let (year, month, day) = match date_parts.as_slice() {
        [y, m, d] => (field(y, raw)?, field(m, raw)?, field(d, raw)?),
        _ => return Err(bad(raw)),
    };

    let time_parts: Vec<&str> = time.split(':').collect();
    let (hour, minute, second) = match time_parts.as_slice() {
        [h, m] => (field(h, raw)?, field(m, raw)?, 0),
        [h, m, s] => (field(h, raw)?, field(m, raw)?, field(s, raw)?),
        _ => return Err(bad(raw)),
    };

    if !(1970..=9999).contains(&year)
        || !(1..=12).contains(&month)
        || !(1..=days_in_month(year, month)).contains(&day)
        || !(0..=23).contains(&hour)
        || !(0..=59).contains(&minute)
        || !(0..=59).contains(&second)
    {
        return Err(bad(raw));
    }

    Ok(days_from_civil(year, month, day) * 86_400 + hour * 3_600 + minute * 60 + second)
}

/// A date/time field: plain ASCII digits, no signs, no whitespace.
fn field(value: &str, input: &str) -> Result<i64, CoreError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad(input));
    }
    value.parse::<i64>().map_err(|_| bad(input))
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 for a civil date (Howard Hinnant's algorithm).
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}
