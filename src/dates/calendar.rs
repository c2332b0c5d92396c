use std::fmt::Write;

use chrono::{DateTime, Datelike, FixedOffset, Utc};

use super::error::{DateError, Result};
use super::locale::CalendarPack;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Describe `local` relative to the day `reference` falls on, read at the
/// same offset: "Yesterday at 9:00 AM", "Last Monday at 5:30 PM", or a plain
/// date once it is a week or more away.
pub fn calendar_phrase(
    local: DateTime<FixedOffset>,
    reference: DateTime<Utc>,
    pack: &CalendarPack,
) -> Result<String> {
    let reference = reference.with_timezone(local.offset());
    let start_of_day = reference
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(*local.offset()).single())
        .ok_or(DateError::OutOfRange)?;
    let days = (local - start_of_day).num_milliseconds() as f64 / MS_PER_DAY;

    let pattern = if days < -6.0 {
        &pack.same_else
    } else if days < -1.0 {
        &pack.last_week
    } else if days < 0.0 {
        &pack.last_day
    } else if days < 1.0 {
        &pack.same_day
    } else if days < 2.0 {
        &pack.next_day
    } else if days < 7.0 {
        &pack.next_week
    } else {
        &pack.same_else
    };

    let weekday = pack
        .weekdays
        .get(local.weekday().num_days_from_sunday() as usize)
        .map(String::as_str)
        .unwrap_or_default();
    let pattern = pattern.replace("%A", weekday);

    let mut out = String::new();
    write!(out, "{}", local.format(&pattern)).map_err(|_| DateError::InvalidFormat(pattern))?;
    Ok(out)
}
