use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, Utc};

use super::error::DateError;

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;
const MS_PER_WEEK: f64 = 604_800_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl FromStr for TimeUnit {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "M" (month) and "m" (minute) are told apart by case.
        let unit = match s {
            "M" => Self::Month,
            "m" => Self::Minute,
            _ => match s.to_lowercase().as_str() {
                "ms" | "millisecond" | "milliseconds" => Self::Millisecond,
                "s" | "second" | "seconds" => Self::Second,
                "minute" | "minutes" => Self::Minute,
                "h" | "hour" | "hours" => Self::Hour,
                "d" | "day" | "days" => Self::Day,
                "w" | "week" | "weeks" => Self::Week,
                "month" | "months" => Self::Month,
                "y" | "year" | "years" => Self::Year,
                _ => return Err(DateError::InvalidUnit(s.to_string())),
            },
        };
        Ok(unit)
    }
}

/// `a - b` expressed in `unit`, with a fractional part.
///
/// Months and years follow calendar months: the whole-month distance plus
/// the fraction of the month the remainder spans.
pub fn fractional_diff(a: DateTime<Utc>, b: DateTime<Utc>, unit: TimeUnit) -> f64 {
    let ms = (a - b).num_milliseconds() as f64;
    match unit {
        TimeUnit::Millisecond => ms,
        TimeUnit::Second => ms / MS_PER_SECOND,
        TimeUnit::Minute => ms / MS_PER_MINUTE,
        TimeUnit::Hour => ms / MS_PER_HOUR,
        TimeUnit::Day => ms / MS_PER_DAY,
        TimeUnit::Week => ms / MS_PER_WEEK,
        TimeUnit::Month => month_diff(a, b),
        TimeUnit::Year => month_diff(a, b) / 12.0,
    }
}

/// Shift `dt` by `amount` units. Month arithmetic clamps to the end of
/// shorter months. `None` when the result is not representable.
pub fn shift(dt: DateTime<Utc>, amount: i64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    let delta = match unit {
        TimeUnit::Millisecond => Duration::try_milliseconds(amount)?,
        TimeUnit::Second => Duration::try_seconds(amount)?,
        TimeUnit::Minute => Duration::try_minutes(amount)?,
        TimeUnit::Hour => Duration::try_hours(amount)?,
        TimeUnit::Day => Duration::try_days(amount)?,
        TimeUnit::Week => Duration::try_weeks(amount)?,
        TimeUnit::Month => return add_months(dt, amount),
        TimeUnit::Year => return add_months(dt, amount.checked_mul(12)?),
    };
    dt.checked_add_signed(delta)
}

fn add_months(dt: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let n = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        dt.checked_add_months(n)
    } else {
        dt.checked_sub_months(n)
    }
}

fn month_diff(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    if a.day() < b.day() {
        return -month_diff(b, a);
    }

    let whole =
        i64::from(b.year() - a.year()) * 12 + i64::from(b.month()) - i64::from(a.month());
    let (Some(anchor), Some(before), Some(after)) = (
        add_months(a, whole),
        add_months(a, whole - 1),
        add_months(a, whole + 1),
    ) else {
        return (a - b).num_milliseconds() as f64 / (MS_PER_DAY * 30.436875);
    };

    let rest = (b - anchor).num_milliseconds() as f64;
    let span = if rest < 0.0 {
        (anchor - before).num_milliseconds() as f64
    } else {
        (after - anchor).num_milliseconds() as f64
    };

    let months = -(whole as f64 + rest / span);
    if months == 0.0 { 0.0 } else { months }
}
