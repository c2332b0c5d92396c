//! Date resolution, locale packs and relative-time phrasing on top of `chrono`.
//!
//! [`DateLibrary`] is the handle every pipe talks to. Clones share the clock,
//! the registered locale packs and the current locale.

pub mod calendar;
pub mod clock;
pub mod error;
pub mod input;
pub mod locale;
pub mod relative;
pub mod unit;

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, FixedOffset, Local, Offset, Utc};
use tracing::debug;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DateError, Result};
pub use input::{DateInput, Moment};
pub use locale::{CalendarPack, LocalePack, LocaleRegistry};
pub use relative::Thresholds;
pub use unit::TimeUnit;

pub const DEFAULT_LOCALE: &str = "en";

#[derive(Debug)]
struct Shared {
    clock: Arc<dyn Clock>,
    thresholds: Thresholds,
    packs: RwLock<LocaleRegistry>,
    current: RwLock<String>,
    local_offset: RwLock<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct DateLibrary {
    shared: Arc<Shared>,
}

impl Default for DateLibrary {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Thresholds::default())
    }
}

impl DateLibrary {
    pub fn new(clock: Arc<dyn Clock>, thresholds: Thresholds) -> Self {
        Self {
            shared: Arc::new(Shared {
                clock,
                thresholds,
                packs: RwLock::new(LocaleRegistry::default()),
                current: RwLock::new(DEFAULT_LOCALE.to_string()),
                local_offset: RwLock::new(Local::now().offset().fix()),
            }),
        }
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self::new(Arc::new(clock), Thresholds::default())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.shared.clock.now()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.shared.thresholds
    }

    /// The locale used for values that do not carry one of their own.
    pub fn locale(&self) -> String {
        self.shared
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_locale(&self, id: &str) -> Result<()> {
        if !self.has_locale(id) {
            return Err(DateError::UnknownLocale(id.to_string()));
        }
        debug!(locale = id, "Current locale changed");
        *self
            .shared
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = id.to_string();
        Ok(())
    }

    /// Offset `local` converts moments to. Starts as the system's offset.
    pub fn local_offset(&self) -> FixedOffset {
        *self
            .shared
            .local_offset
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_local_offset(&self, offset: FixedOffset) {
        debug!(offset = %offset, "Local offset changed");
        *self
            .shared
            .local_offset
            .write()
            .unwrap_or_else(PoisonError::into_inner) = offset;
    }

    pub fn register_locale(&self, pack: LocalePack) {
        debug!(locale = %pack.id, "Locale pack registered");
        self.shared
            .packs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(pack);
    }

    pub fn has_locale(&self, id: &str) -> bool {
        self.shared
            .packs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Resolve a date-like value into a moment. Values that carry a locale keep
    /// it; everything else picks up the current locale.
    pub fn resolve(&self, input: &DateInput) -> Result<Moment> {
        if let DateInput::Moment(m) = input {
            return Ok(m.clone());
        }
        Ok(Moment::new(input.instant()?, self.locale()))
    }

    pub fn moment(&self, input: impl Into<DateInput>) -> Result<Moment> {
        self.resolve(&input.into())
    }

    pub fn now_moment(&self) -> Moment {
        Moment::new(self.now(), self.locale())
    }

    /// Relative phrase between the moment and now, in the moment's locale.
    pub fn from_now(&self, moment: &Moment, without_suffix: bool) -> String {
        self.relative_to(moment.instant(), self.now(), moment.locale(), without_suffix)
    }

    /// Calendar phrase for the moment relative to the day `reference` falls
    /// on, in the moment's locale and offset.
    pub fn calendar(&self, moment: &Moment, reference: DateTime<Utc>) -> Result<String> {
        let packs = self
            .shared
            .packs
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let english = LocalePack::english();
        let pack = packs.find(moment.locale()).unwrap_or(&english);
        calendar::calendar_phrase(moment.local_time(), reference, &pack.calendar)
    }

    /// A duration phrased without direction ("an hour", "3 days").
    pub fn humanize(&self, duration: Duration, locale: &str) -> Result<String> {
        let origin = DateTime::UNIX_EPOCH;
        let end = origin
            .checked_add_signed(duration)
            .ok_or(DateError::OutOfRange)?;
        Ok(self.relative_to(end, origin, locale, true))
    }

    /// Whole minutes between now and the moment, truncated toward zero.
    pub fn minutes_from_now(&self, moment: &Moment) -> i64 {
        -moment.diff(self.now(), TimeUnit::Minute)
    }

    fn relative_to(
        &self,
        instant: DateTime<Utc>,
        now: DateTime<Utc>,
        locale: &str,
        without_suffix: bool,
    ) -> String {
        let packs = self
            .shared
            .packs
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let english = LocalePack::english();
        let pack = packs.find(locale).unwrap_or(&english);
        relative::relative_phrase(instant, now, pack, &self.shared.thresholds, without_suffix)
    }
}
