use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::locale::LocalePack;
use super::unit::{TimeUnit, fractional_diff};

/// Upper bounds (inclusive, after rounding) for each relative-time phrase.
///
/// Each bound is measured in the unit of the last plural phrase before it:
/// `seconds` and `minute` in seconds, `minutes` and `hour` in minutes, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub seconds: i64,
    pub minute: i64,
    pub minutes: i64,
    pub hour: i64,
    pub hours: i64,
    pub day: i64,
    pub days: i64,
    pub month: i64,
    pub months: i64,
    pub year: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            seconds: 44,
            minute: 89,
            minutes: 44,
            hour: 89,
            hours: 21,
            day: 35,
            days: 25,
            month: 45,
            months: 10,
            year: 17,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phrase {
    FewSeconds,
    Minute,
    Minutes,
    Hour,
    Hours,
    Day,
    Days,
    Month,
    Months,
    Year,
    Years,
}

impl Phrase {
    fn render(self, pack: &LocalePack, amount: i64) -> String {
        let pattern = match self {
            Self::FewSeconds => &pack.few_seconds,
            Self::Minute => &pack.minute,
            Self::Minutes => &pack.minutes,
            Self::Hour => &pack.hour,
            Self::Hours => &pack.hours,
            Self::Day => &pack.day,
            Self::Days => &pack.days,
            Self::Month => &pack.month,
            Self::Months => &pack.months,
            Self::Year => &pack.year,
            Self::Years => &pack.years,
        };
        pattern.replace("%d", &amount.to_string())
    }
}

/// Describe how far `instant` lies from `now` ("a minute ago", "in 3 hours").
///
/// With `without_suffix` the directional wrapper is dropped ("a minute").
pub fn relative_phrase(
    instant: DateTime<Utc>,
    now: DateTime<Utc>,
    pack: &LocalePack,
    thresholds: &Thresholds,
    without_suffix: bool,
) -> String {
    let steps = [
        (Phrase::FewSeconds, Some(thresholds.seconds), Some(TimeUnit::Second)),
        (Phrase::Minute, Some(thresholds.minute), None),
        (Phrase::Minutes, Some(thresholds.minutes), Some(TimeUnit::Minute)),
        (Phrase::Hour, Some(thresholds.hour), None),
        (Phrase::Hours, Some(thresholds.hours), Some(TimeUnit::Hour)),
        (Phrase::Day, Some(thresholds.day), None),
        (Phrase::Days, Some(thresholds.days), Some(TimeUnit::Day)),
        (Phrase::Month, Some(thresholds.month), None),
        (Phrase::Months, Some(thresholds.months), Some(TimeUnit::Month)),
        (Phrase::Year, Some(thresholds.year), None),
        (Phrase::Years, None, Some(TimeUnit::Year)),
    ];

    let mut diff = 0.0;
    let mut text = String::new();
    let mut future = false;

    for (i, (phrase, limit, unit)) in steps.iter().enumerate() {
        if let Some(unit) = unit {
            diff = fractional_diff(instant, now, *unit);
        }
        let amount = diff.abs().round() as i64;
        future = diff > 0.0;

        if limit.is_none_or(|limit| amount <= limit) {
            // "1 minutes" reads as "a minute", "0 seconds" as "a few seconds"
            let phrase = if amount <= 1 && i > 0 {
                steps[i - 1].0
            } else {
                *phrase
            };
            text = phrase.render(pack, amount);
            break;
        }
    }

    if without_suffix {
        return text;
    }

    let wrapper = if future { &pack.future } else { &pack.past };
    wrapper.replace("%s", &text)
}
