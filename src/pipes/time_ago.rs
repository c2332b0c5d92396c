use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace, warn};

use super::host::{ChangeDetector, DirectZone, NoopDetector, Zone};
use super::timer::{RefreshTimer, refresh_delay};
use crate::dates::{DateInput, DateLibrary, Moment, Result};

/// Turns a resolved moment into display text. `DateLibrary` supplies "now".
pub type FormatFn = Arc<dyn Fn(&Moment, &DateLibrary) -> String + Send + Sync>;

fn default_format(omit_suffix: bool) -> FormatFn {
    Arc::new(move |moment, dates| dates.from_now(moment, omit_suffix))
}

struct Cache {
    // Bumped whenever the inputs change; text computed for an older revision
    // is dropped instead of stored.
    revision: u64,
    last_time: Option<i64>,
    last_value: Option<DateInput>,
    last_omit_suffix: bool,
    last_locale: Option<String>,
    last_text: String,
    format: FormatFn,
    timer: RefreshTimer,
    disposed: bool,
}

impl Cache {
    fn has_changed(&self, time: i64, locale: &str, omit_suffix: bool) -> bool {
        self.last_time != Some(time)
            || self.last_locale.as_deref() != Some(locale)
            || self.last_omit_suffix != omit_suffix
    }
}

fn lock(cache: &Mutex<Cache>) -> MutexGuard<'_, Cache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Live "time ago" text for one binding site.
///
/// The last output is cached and handed back until the input, its locale or
/// the suffix flag change. Meanwhile a single refresh timer recomputes the
/// text in the background and asks the view to render again; the next
/// `transform` call from that render arms the following refresh. The delay
/// backs off as the instant gets further from now.
///
/// Timers run on the ambient tokio runtime. Called outside one, the pipe still
/// returns text but never refreshes it. Dropping the pipe disposes it.
///
/// Formatters and zones are called without any internal lock held, so they
/// may read the pipe back.
pub struct TimeAgoPipe {
    dates: DateLibrary,
    view: Arc<dyn ChangeDetector>,
    zone: Arc<dyn Zone>,
    cache: Arc<Mutex<Cache>>,
}

impl TimeAgoPipe {
    pub fn new(dates: DateLibrary, view: Arc<dyn ChangeDetector>, zone: Arc<dyn Zone>) -> Self {
        Self {
            dates,
            view,
            zone,
            cache: Arc::new(Mutex::new(Cache {
                revision: 0,
                last_time: None,
                last_value: None,
                last_omit_suffix: false,
                last_locale: None,
                last_text: String::new(),
                format: default_format(false),
                timer: RefreshTimer::default(),
                disposed: false,
            })),
        }
    }

    /// A pipe whose refreshes nobody observes.
    pub fn detached(dates: DateLibrary) -> Self {
        Self::new(dates, Arc::new(NoopDetector), Arc::new(DirectZone))
    }

    pub fn transform(&self, value: impl Into<DateInput>, omit_suffix: bool) -> Result<String> {
        self.transform_with(value, omit_suffix, None)
    }

    /// Like [`transform`](Self::transform), with a custom formatter that
    /// replaces the default phrasing. The formatter is captured only when the
    /// input changes; a changed call without one restores the default.
    pub fn transform_with(
        &self,
        value: impl Into<DateInput>,
        omit_suffix: bool,
        format: Option<FormatFn>,
    ) -> Result<String> {
        let value = value.into();
        let moment = self.dates.resolve(&value)?;
        let time = moment.value_of();

        let mut cache = lock(&self.cache);
        if !cache.has_changed(time, moment.locale(), omit_suffix) {
            trace!(time, "Time-ago input unchanged");
            let text = cache.last_text.clone();
            drop(cache);
            self.schedule();
            return Ok(text);
        }

        debug!(time, locale = moment.locale(), omit_suffix, "Time-ago input changed");
        cache.revision += 1;
        let revision = cache.revision;
        cache.last_time = Some(time);
        cache.last_value = Some(value);
        cache.last_omit_suffix = omit_suffix;
        cache.last_locale = Some(moment.locale().to_string());
        cache.format = format.unwrap_or_else(|| default_format(omit_suffix));
        let format = Arc::clone(&cache.format);
        if cache.timer.cancel() {
            debug!("Refresh timer cancelled");
        }
        drop(cache);

        self.schedule();

        let text = format(&moment, &self.dates);
        let mut cache = lock(&self.cache);
        if cache.revision == revision {
            cache.last_text = text.clone();
        }
        Ok(text)
    }

    /// Cancel any pending refresh. Safe to call more than once; later
    /// transforms still return text but no longer schedule refreshes.
    pub fn dispose(&self) {
        let mut cache = lock(&self.cache);
        cache.disposed = true;
        if cache.timer.cancel() {
            debug!("Refresh timer cancelled on dispose");
        }
    }

    pub fn is_scheduled(&self) -> bool {
        lock(&self.cache).timer.is_scheduled()
    }

    /// Delay the pending refresh was armed with.
    pub fn pending_delay(&self) -> Option<Duration> {
        lock(&self.cache).timer.pending_delay()
    }

    pub fn last_text(&self) -> String {
        lock(&self.cache).last_text.clone()
    }

    fn schedule(&self) {
        let (generation, delay, minutes_old) = {
            let mut cache = lock(&self.cache);
            if cache.disposed || cache.timer.is_scheduled() {
                return;
            }
            let Some(value) = cache.last_value.as_ref() else {
                return;
            };
            // Age is taken from the cached input as it resolves right now.
            let minutes_old = match self.dates.resolve(value) {
                Ok(moment) => self.dates.minutes_from_now(&moment),
                Err(e) => {
                    warn!(error = %e, "Cached time-ago input no longer resolves");
                    return;
                }
            };
            let delay = refresh_delay(minutes_old);
            let Some(generation) = cache.timer.reserve(delay) else {
                return;
            };
            (generation, delay, minutes_old)
        };

        let Ok(runtime) = Handle::try_current() else {
            debug!("No async runtime, refresh timer skipped");
            lock(&self.cache).timer.release(generation);
            return;
        };

        let deadline = Instant::now() + delay;
        let shared = Arc::clone(&self.cache);
        let dates = self.dates.clone();
        let view = Arc::clone(&self.view);
        let zone = Arc::clone(&self.zone);

        let mut task = None;
        self.zone.run_outside(Box::new(|| {
            let handle = runtime.spawn(async move {
                sleep_until(deadline).await;
                tick(&shared, generation, &dates, view.as_ref(), zone.as_ref());
            });
            task = Some(handle.abort_handle());
        }));

        let mut cache = lock(&self.cache);
        match task {
            Some(task) => {
                if cache.timer.attach(generation, task) {
                    debug!(delay_secs = delay.as_secs(), minutes_old, "Refresh timer scheduled");
                }
            }
            None => cache.timer.release(generation),
        }
    }
}

impl Drop for TimeAgoPipe {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn tick(
    shared: &Mutex<Cache>,
    generation: u64,
    dates: &DateLibrary,
    view: &dyn ChangeDetector,
    zone: &dyn Zone,
) {
    let (revision, value, format) = {
        let mut cache = lock(shared);
        if !cache.timer.fire(generation) {
            trace!(generation, "Stale refresh tick ignored");
            return;
        }
        (cache.revision, cache.last_value.clone(), Arc::clone(&cache.format))
    };

    if let Some(value) = value {
        match dates.resolve(&value) {
            Ok(moment) => {
                let text = format(&moment, dates);
                let mut cache = lock(shared);
                if cache.revision == revision {
                    cache.last_text = text;
                }
            }
            Err(e) => warn!(error = %e, "Failed to refresh time-ago text"),
        }
    }

    debug!(generation, "Refresh timer fired");
    zone.run(Box::new(|| view.mark_for_check()));
}
