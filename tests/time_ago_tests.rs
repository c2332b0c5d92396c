use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use datepipe::dates::{DateError, DateInput, DateLibrary, ManualClock};
use datepipe::pipes::{ChangeDetector, ChannelDetector, DirectZone, FormatFn, TimeAgoPipe, Zone};

fn may_first_2016() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 5, 1, 0, 0, 0).unwrap()
}

fn make_library() -> (DateLibrary, ManualClock) {
    let clock = ManualClock::new(may_first_2016());
    (DateLibrary::with_clock(clock.clone()), clock)
}

#[derive(Default)]
struct CountingDetector {
    count: AtomicUsize,
}

impl CountingDetector {
    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl ChangeDetector for CountingDetector {
    fn mark_for_check(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

fn make_pipe(dates: &DateLibrary) -> (TimeAgoPipe, Arc<CountingDetector>) {
    let detector = Arc::new(CountingDetector::default());
    let pipe = TimeAgoPipe::new(dates.clone(), detector.clone(), Arc::new(DirectZone));
    (pipe, detector)
}

async fn advance_secs(secs: u64) {
    tokio::time::advance(StdDuration::from_secs(secs)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

// --- Formatting ---

#[test]
fn test_current_date_is_a_few_seconds_ago() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    assert_eq!(pipe.transform(dates.now(), false).unwrap(), "a few seconds ago");
}

#[test]
fn test_string_dates() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    assert_eq!(
        pipe.transform("2016-05-01T00:00:00Z", false).unwrap(),
        "a few seconds ago"
    );
}

#[test]
fn test_omit_suffix() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    let in_a_minute = dates.now() + Duration::seconds(60);
    assert_eq!(pipe.transform(in_a_minute, false).unwrap(), "in a minute");
    assert_eq!(pipe.transform(in_a_minute, true).unwrap(), "a minute");
}

#[test]
fn test_new_instances_update_text() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    assert_eq!(pipe.transform(dates.now(), false).unwrap(), "a few seconds ago");
    assert_eq!(pipe.transform(0i64, false).unwrap(), "46 years ago");
    assert_eq!(pipe.transform(dates.now_moment(), false).unwrap(), "a few seconds ago");
    let epoch = dates.moment(0i64).unwrap();
    assert_eq!(pipe.transform(epoch, false).unwrap(), "46 years ago");
}

#[test]
fn test_updated_instant_is_detected() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);

    let date = dates.now();
    assert_eq!(pipe.transform(date, false).unwrap(), "a few seconds ago");
    let y2k = Utc.with_ymd_and_hms(2000, 5, 1, 0, 0, 0).unwrap();
    assert_eq!(pipe.transform(y2k, false).unwrap(), "16 years ago");

    let moment = dates.now_moment();
    assert_eq!(pipe.transform(&moment, false).unwrap(), "a few seconds ago");
    let moment_2000 = moment.with_instant(y2k);
    assert_eq!(pipe.transform(&moment_2000, false).unwrap(), "16 years ago");
}

#[test]
fn test_global_locale_change_is_detected() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    assert_eq!(pipe.transform(0i64, false).unwrap(), "46 years ago");
    dates.set_locale("fr").unwrap();
    assert_eq!(pipe.transform(0i64, false).unwrap(), "il y a 46 ans");
}

#[test]
fn test_embedded_locale_overrides_global() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    let french = dates.moment(0i64).unwrap().with_locale("fr");
    assert_eq!(pipe.transform(&french, false).unwrap(), "il y a 46 ans");
    assert_eq!(
        pipe.transform(DateInput::Native(DateTime::UNIX_EPOCH), false)
            .unwrap(),
        "46 years ago"
    );
}

#[test]
fn test_custom_format_function() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    let format: FormatFn = Arc::new(|moment, dates| {
        let seconds = (moment.instant() - dates.now()).num_seconds();
        if seconds >= 3600 {
            String::new()
        } else {
            format!("{} min ago", seconds / 60)
        }
    });

    let now = dates.now();
    let text = pipe
        .transform_with(now + Duration::minutes(20), false, Some(format.clone()))
        .unwrap();
    assert_eq!(text, "20 min ago");
    let text = pipe
        .transform_with(now + Duration::hours(1), false, Some(format.clone()))
        .unwrap();
    assert_eq!(text, "");
    let text = pipe
        .transform_with(now + Duration::hours(3), false, Some(format))
        .unwrap();
    assert_eq!(text, "");
}

#[test]
fn test_custom_format_sticks_until_input_changes() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    let format: FormatFn = Arc::new(|_, _| "custom".to_string());

    let now = dates.now();
    assert_eq!(pipe.transform_with(now, false, Some(format)).unwrap(), "custom");
    // Unchanged input keeps the captured formatter
    assert_eq!(pipe.transform(now, false).unwrap(), "custom");
    // A changed input without a formatter goes back to the default phrasing
    assert_eq!(pipe.transform(0i64, false).unwrap(), "46 years ago");
}

#[test]
fn test_unchanged_input_returns_cached_text() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let format: FormatFn = Arc::new(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        "cached".to_string()
    });

    let now = dates.now();
    pipe.transform_with(now, false, Some(format)).unwrap();
    for _ in 0..5 {
        assert_eq!(pipe.transform(now, false).unwrap(), "cached");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_suffix_flag_change_recomputes() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    assert_eq!(pipe.transform(0i64, false).unwrap(), "46 years ago");
    assert_eq!(pipe.transform(0i64, true).unwrap(), "46 years");
    assert_eq!(pipe.transform(0i64, false).unwrap(), "46 years ago");
}

#[test]
fn test_invalid_input_propagates() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    let err = pipe.transform("not a date", false).unwrap_err();
    assert_eq!(err, DateError::InvalidDate("not a date".to_string()));
    assert_eq!(pipe.last_text(), "");
}

#[test]
fn test_without_runtime_no_timer_is_scheduled() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    assert_eq!(pipe.transform(dates.now(), false).unwrap(), "a few seconds ago");
    assert!(!pipe.is_scheduled());
}

// --- Refresh timer ---

#[tokio::test(start_paused = true)]
async fn test_text_refreshes_as_time_passes() {
    let (dates, _) = make_library();
    let (pipe, detector) = make_pipe(&dates);

    assert_eq!(pipe.transform(dates.now(), false).unwrap(), "a few seconds ago");
    assert_eq!(detector.count(), 0);

    advance_secs(60).await;
    assert_eq!(detector.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tick_recomputes_from_cached_input() {
    let (dates, clock) = make_library();
    let (pipe, detector) = make_pipe(&dates);

    let start = dates.now();
    assert_eq!(pipe.transform(start, false).unwrap(), "a few seconds ago");
    assert_eq!(pipe.pending_delay(), Some(StdDuration::from_secs(1)));

    clock.advance(Duration::minutes(2));
    advance_secs(2).await;

    assert_eq!(detector.count(), 1);
    assert!(!pipe.is_scheduled());
    assert_eq!(pipe.last_text(), "2 minutes ago");

    // The re-render arms the next refresh with the backed-off delay
    assert_eq!(pipe.transform(start, false).unwrap(), "2 minutes ago");
    assert_eq!(pipe.pending_delay(), Some(StdDuration::from_secs(30)));
}

#[tokio::test(start_paused = true)]
async fn test_each_render_arms_one_more_tick() {
    let (dates, _) = make_library();
    let (pipe, detector) = make_pipe(&dates);
    let now = dates.now();

    pipe.transform(now, false).unwrap();
    advance_secs(2).await;
    assert_eq!(detector.count(), 1);

    pipe.transform(now, false).unwrap();
    pipe.transform(now, false).unwrap();
    advance_secs(2).await;
    assert_eq!(detector.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_with_age() {
    let (dates, _) = make_library();
    let (recent, _) = make_pipe(&dates);
    let (older, _) = make_pipe(&dates);

    recent
        .transform(dates.now() - Duration::seconds(30), false)
        .unwrap();
    older.transform(dates.now() - Duration::hours(2), false).unwrap();

    let recent_delay = recent.pending_delay().unwrap();
    let older_delay = older.pending_delay().unwrap();
    assert_eq!(recent_delay, StdDuration::from_secs(1));
    assert_eq!(older_delay, StdDuration::from_secs(300));
    assert!(older_delay > recent_delay);
}

#[tokio::test(start_paused = true)]
async fn test_future_instants_back_off_too() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    pipe.transform(dates.now() + Duration::hours(5), false).unwrap();
    assert_eq!(pipe.pending_delay(), Some(StdDuration::from_secs(3600)));
}

#[tokio::test(start_paused = true)]
async fn test_change_replaces_pending_timer() {
    let (dates, _) = make_library();
    let (pipe, detector) = make_pipe(&dates);

    pipe.transform(dates.now(), false).unwrap();
    assert_eq!(pipe.pending_delay(), Some(StdDuration::from_secs(1)));

    assert_eq!(pipe.transform(0i64, false).unwrap(), "46 years ago");
    assert_eq!(pipe.pending_delay(), Some(StdDuration::from_secs(3600)));

    advance_secs(60).await;
    assert_eq!(detector.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_removes_timer() {
    let (dates, _) = make_library();
    let (pipe, detector) = make_pipe(&dates);

    assert_eq!(pipe.transform(dates.now(), false).unwrap(), "a few seconds ago");
    pipe.dispose();
    pipe.dispose();
    assert!(!pipe.is_scheduled());

    advance_secs(60).await;
    assert_eq!(detector.count(), 0);

    // Still renders, but never schedules again
    assert_eq!(pipe.transform(dates.now(), false).unwrap(), "a few seconds ago");
    assert!(!pipe.is_scheduled());
    advance_secs(60).await;
    assert_eq!(detector.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_drop_releases_timer() {
    let (dates, _) = make_library();
    let (pipe, detector) = make_pipe(&dates);

    pipe.transform(dates.now(), false).unwrap();
    drop(pipe);

    advance_secs(60).await;
    assert_eq!(detector.count(), 0);
}

#[derive(Default)]
struct RecordingZone {
    outside: AtomicUsize,
    inside: AtomicUsize,
}

impl Zone for RecordingZone {
    fn run_outside(&self, f: Box<dyn FnOnce() + '_>) {
        self.outside.fetch_add(1, Ordering::SeqCst);
        f()
    }

    fn run(&self, f: Box<dyn FnOnce() + '_>) {
        self.inside.fetch_add(1, Ordering::SeqCst);
        f()
    }
}

#[tokio::test(start_paused = true)]
async fn test_timer_starts_outside_and_notifies_inside_zone() {
    let (dates, _) = make_library();
    let detector = Arc::new(CountingDetector::default());
    let zone = Arc::new(RecordingZone::default());
    let pipe = TimeAgoPipe::new(dates.clone(), detector.clone(), zone.clone());

    pipe.transform(dates.now(), false).unwrap();
    assert_eq!(zone.outside.load(Ordering::SeqCst), 1);
    assert_eq!(zone.inside.load(Ordering::SeqCst), 0);

    advance_secs(2).await;
    assert_eq!(zone.inside.load(Ordering::SeqCst), 1);
    assert_eq!(detector.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_channel_detector_delivers_refresh() {
    let (dates, _) = make_library();
    let (detector, mut rx) = ChannelDetector::channel();
    let pipe = TimeAgoPipe::new(dates.clone(), Arc::new(detector), Arc::new(DirectZone));

    pipe.transform(dates.now(), false).unwrap();
    assert!(rx.try_recv().is_err());

    advance_secs(2).await;
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

// --- Re-entrant callbacks ---

fn reading_format(slot: Arc<OnceLock<Weak<TimeAgoPipe>>>, reads: Arc<AtomicUsize>) -> FormatFn {
    Arc::new(move |moment, dates| {
        if let Some(pipe) = slot.get().and_then(Weak::upgrade) {
            let _ = pipe.last_text();
            let _ = pipe.is_scheduled();
            reads.fetch_add(1, Ordering::SeqCst);
        }
        dates.from_now(moment, false)
    })
}

#[test]
fn test_formatter_may_read_pipe_back() {
    let (dates, _) = make_library();
    let (pipe, _) = make_pipe(&dates);
    let pipe = Arc::new(pipe);
    let slot = Arc::new(OnceLock::new());
    slot.set(Arc::downgrade(&pipe)).unwrap();
    let reads = Arc::new(AtomicUsize::new(0));
    let format = reading_format(slot, reads.clone());

    let text = pipe.transform_with(dates.now(), false, Some(format)).unwrap();
    assert_eq!(text, "a few seconds ago");
    assert_eq!(reads.load(Ordering::SeqCst), 1);
    assert_eq!(pipe.last_text(), "a few seconds ago");
}

#[tokio::test(start_paused = true)]
async fn test_tick_formatter_may_read_pipe_back() {
    let (dates, clock) = make_library();
    let (pipe, detector) = make_pipe(&dates);
    let pipe = Arc::new(pipe);
    let slot = Arc::new(OnceLock::new());
    slot.set(Arc::downgrade(&pipe)).unwrap();
    let reads = Arc::new(AtomicUsize::new(0));
    let format = reading_format(slot, reads.clone());

    pipe.transform_with(dates.now(), false, Some(format)).unwrap();
    assert!(pipe.is_scheduled());

    clock.advance(Duration::minutes(2));
    advance_secs(2).await;
    assert_eq!(reads.load(Ordering::SeqCst), 2);
    assert_eq!(detector.count(), 1);
    assert_eq!(pipe.last_text(), "2 minutes ago");
}

#[derive(Default)]
struct ReadingZone {
    pipe: OnceLock<Weak<TimeAgoPipe>>,
    delays: std::sync::Mutex<Vec<Option<StdDuration>>>,
}

impl Zone for ReadingZone {
    fn run_outside(&self, f: Box<dyn FnOnce() + '_>) {
        if let Some(pipe) = self.pipe.get().and_then(Weak::upgrade) {
            self.delays.lock().unwrap().push(pipe.pending_delay());
        }
        f()
    }

    fn run(&self, f: Box<dyn FnOnce() + '_>) {
        f()
    }
}

#[tokio::test(start_paused = true)]
async fn test_zone_may_read_pipe_back() {
    let (dates, _) = make_library();
    let zone = Arc::new(ReadingZone::default());
    let pipe = Arc::new(TimeAgoPipe::new(
        dates.clone(),
        Arc::new(CountingDetector::default()),
        zone.clone(),
    ));
    zone.pipe.set(Arc::downgrade(&pipe)).unwrap();

    pipe.transform(dates.now(), false).unwrap();
    assert_eq!(
        *zone.delays.lock().unwrap(),
        vec![Some(StdDuration::from_secs(1))]
    );
    assert_eq!(pipe.pending_delay(), Some(StdDuration::from_secs(1)));
}
