use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

use super::error::{DateError, Result};
use super::unit::{TimeUnit, fractional_diff};

/// A resolved instant tagged with the locale and UTC offset it should be
/// displayed in. The offset never changes which instant a moment denotes.
///
/// Moments are immutable: every setter returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moment {
    instant: DateTime<Utc>,
    offset: FixedOffset,
    locale: String,
}

impl Moment {
    /// A moment displayed in UTC.
    pub fn new(instant: DateTime<Utc>, locale: impl Into<String>) -> Self {
        Self {
            instant,
            offset: Utc.fix(),
            locale: locale.into(),
        }
    }

    /// A moment displayed at the offset `zoned` was written in.
    pub fn zoned(zoned: DateTime<FixedOffset>, locale: impl Into<String>) -> Self {
        Self {
            instant: zoned.with_timezone(&Utc),
            offset: *zoned.offset(),
            locale: locale.into(),
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// Milliseconds since the unix epoch.
    pub fn value_of(&self) -> i64 {
        self.instant.timestamp_millis()
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Wall-clock reading of the instant at the moment's offset.
    pub fn local_time(&self) -> DateTime<FixedOffset> {
        self.instant.with_timezone(&self.offset)
    }

    pub fn with_locale(&self, locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..self.clone()
        }
    }

    pub fn with_instant(&self, instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            ..self.clone()
        }
    }

    pub fn with_offset(&self, offset: FixedOffset) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    /// `self - other` in `unit`, truncated toward zero.
    pub fn diff(&self, other: DateTime<Utc>, unit: TimeUnit) -> i64 {
        fractional_diff(self.instant, other, unit).trunc() as i64
    }
}

/// Anything a caller may hand to a pipe as "a date".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    Native(DateTime<Utc>),
    Zoned(DateTime<FixedOffset>),
    Text(String),
    Millis(i64),
    Moment(Moment),
}

impl From<DateTime<Utc>> for DateInput {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Native(dt)
    }
}

impl From<DateTime<FixedOffset>> for DateInput {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::Zoned(dt)
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DateInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for DateInput {
    fn from(ms: i64) -> Self {
        Self::Millis(ms)
    }
}

impl From<Moment> for DateInput {
    fn from(m: Moment) -> Self {
        Self::Moment(m)
    }
}

impl From<&Moment> for DateInput {
    fn from(m: &Moment) -> Self {
        Self::Moment(m.clone())
    }
}

impl DateInput {
    /// The concrete instant this value denotes.
    pub fn instant(&self) -> Result<DateTime<Utc>> {
        match self {
            Self::Native(dt) => Ok(*dt),
            Self::Zoned(dt) => Ok(dt.with_timezone(&Utc)),
            Self::Text(s) => parse_text(s),
            Self::Millis(ms) => DateTime::from_timestamp_millis(*ms).ok_or(DateError::OutOfRange),
            Self::Moment(m) => Ok(m.instant()),
        }
    }

    /// The instant together with the offset the value was written in.
    /// Values without one read as UTC.
    pub fn zoned(&self) -> Result<DateTime<FixedOffset>> {
        match self {
            Self::Zoned(dt) => Ok(*dt),
            Self::Text(s) => parse_text_zoned(s),
            Self::Moment(m) => Ok(m.local_time()),
            _ => Ok(self.instant()?.fixed_offset()),
        }
    }

    /// The locale carried by the value itself, if any.
    pub fn embedded_locale(&self) -> Option<&str> {
        match self {
            Self::Moment(m) => Some(m.locale()),
            _ => None,
        }
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 style string. Strings without an offset are read as UTC.
pub fn parse_text(s: &str) -> Result<DateTime<Utc>> {
    parse_text_zoned(s).map(|dt| dt.with_timezone(&Utc))
}

/// Like [`parse_text`], keeping the offset written in the string.
pub fn parse_text_zoned(s: &str) -> Result<DateTime<FixedOffset>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().fixed_offset())
            .ok_or(DateError::OutOfRange);
    }

    Err(DateError::InvalidDate(s.to_string()))
}
