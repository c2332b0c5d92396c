//! Stateless pipes. Each one is a single call into the date library.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Offset, Utc};

use crate::dates::input::{parse_text, parse_text_zoned};
use crate::dates::unit::{fractional_diff, shift};
use crate::dates::{DateError, DateInput, DateLibrary, Moment, Result, TimeUnit};

pub fn add(
    dates: &DateLibrary,
    value: impl Into<DateInput>,
    amount: i64,
    unit: TimeUnit,
) -> Result<Moment> {
    let moment = dates.moment(value)?;
    let shifted = shift(moment.instant(), amount, unit).ok_or(DateError::OutOfRange)?;
    Ok(moment.with_instant(shifted))
}

pub fn subtract(
    dates: &DateLibrary,
    value: impl Into<DateInput>,
    amount: i64,
    unit: TimeUnit,
) -> Result<Moment> {
    let amount = amount.checked_neg().ok_or(DateError::OutOfRange)?;
    add(dates, value, amount, unit)
}

/// Format with chrono's strftime syntax, at the moment's offset.
pub fn date_format(dates: &DateLibrary, value: impl Into<DateInput>, fmt: &str) -> Result<String> {
    let moment = dates.moment(value)?;
    let mut out = String::new();
    write!(out, "{}", moment.local_time().format(fmt))
        .map_err(|_| DateError::InvalidFormat(fmt.to_string()))?;
    Ok(out)
}

/// `value - other` in `unit`; truncated toward zero unless `precise`.
pub fn difference(
    dates: &DateLibrary,
    value: impl Into<DateInput>,
    other: impl Into<DateInput>,
    unit: TimeUnit,
    precise: bool,
) -> Result<f64> {
    let a = dates.moment(value)?;
    let b = dates.moment(other)?;
    let diff = fractional_diff(a.instant(), b.instant(), unit);
    Ok(if precise { diff } else { diff.trunc() })
}

/// A length of time in words, without direction.
pub fn duration(dates: &DateLibrary, amount: i64, unit: TimeUnit) -> Result<String> {
    let origin = DateTime::UNIX_EPOCH;
    let end = shift(origin, amount, unit).ok_or(DateError::OutOfRange)?;
    dates.humanize(end - origin, &dates.locale())
}

pub fn from_unix(dates: &DateLibrary, seconds: i64) -> Result<Moment> {
    let instant = DateTime::from_timestamp(seconds, 0).ok_or(DateError::OutOfRange)?;
    Ok(Moment::new(instant, dates.locale()))
}

/// "Today at 2:30 PM", "Last Monday at 9:00 AM" or a plain date, relative to
/// the day of `reference` (now when absent).
pub fn calendar(
    dates: &DateLibrary,
    value: impl Into<DateInput>,
    reference: Option<DateInput>,
) -> Result<String> {
    let moment = dates.moment(value)?;
    let reference = match reference {
        Some(reference) => reference.instant()?,
        None => dates.now(),
    };
    dates.calendar(&moment, reference)
}

/// Switch a value to UTC display; the instant is unchanged.
pub fn utc(dates: &DateLibrary, value: impl Into<DateInput>) -> Result<Moment> {
    Ok(dates.moment(value)?.with_offset(Utc.fix()))
}

/// Switch a value to the library's local offset.
pub fn local(dates: &DateLibrary, value: impl Into<DateInput>) -> Result<Moment> {
    Ok(dates.moment(value)?.with_offset(dates.local_offset()))
}

/// Parse `text` as UTC: strings without an offset name a UTC wall-clock time,
/// and the result is displayed in UTC. `fmt` selects an explicit format.
pub fn from_utc(dates: &DateLibrary, text: &str, fmt: Option<&str>) -> Result<Moment> {
    match fmt {
        Some(fmt) => parse(dates, text, fmt),
        None => Ok(Moment::new(parse_text(text)?, dates.locale())),
    }
}

/// Parse `text` and keep displaying it at the offset written in it.
pub fn parse_zone(dates: &DateLibrary, text: &str) -> Result<Moment> {
    Ok(Moment::zoned(parse_text_zoned(text)?, dates.locale()))
}

/// Parse `text` with an explicit strftime format; date-only formats give midnight.
pub fn parse(dates: &DateLibrary, text: &str, fmt: &str) -> Result<Moment> {
    let naive = match NaiveDateTime::parse_from_str(text, fmt) {
        Ok(naive) => naive,
        Err(_) => NaiveDate::parse_from_str(text, fmt)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(|| DateError::InvalidDate(text.to_string()))?,
    };
    Ok(Moment::new(naive.and_utc(), dates.locale()))
}

/// The same instant, displayed in locale `id`.
pub fn locale(dates: &DateLibrary, value: impl Into<DateInput>, id: &str) -> Result<Moment> {
    if !dates.has_locale(id) {
        return Err(DateError::UnknownLocale(id.to_string()));
    }
    Ok(dates.moment(value)?.with_locale(id))
}

pub fn is_before(
    dates: &DateLibrary,
    value: impl Into<DateInput>,
    other: impl Into<DateInput>,
) -> Result<bool> {
    Ok(dates.moment(value)?.instant() < dates.moment(other)?.instant())
}

pub fn is_after(
    dates: &DateLibrary,
    value: impl Into<DateInput>,
    other: impl Into<DateInput>,
) -> Result<bool> {
    Ok(dates.moment(value)?.instant() > dates.moment(other)?.instant())
}
