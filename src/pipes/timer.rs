use std::time::Duration;

use tokio::task::AbortHandle;

/// Seconds to wait before refreshing text for an instant `minutes_old`
/// minutes away from now, in either direction.
pub fn seconds_until_update(minutes_old: i64) -> u64 {
    let how_old = minutes_old.abs();
    if how_old < 1 {
        1
    } else if how_old < 60 {
        30
    } else if how_old < 180 {
        300
    } else {
        3600
    }
}

pub fn refresh_delay(minutes_old: i64) -> Duration {
    Duration::from_secs(seconds_until_update(minutes_old))
}

#[derive(Debug, Default)]
enum TimerState {
    #[default]
    Idle,
    Scheduled {
        generation: u64,
        delay: Duration,
        task: Option<AbortHandle>,
    },
}

/// At most one pending refresh.
///
/// Arming happens in two steps so the task can be spawned without holding
/// whatever lock guards the timer: `reserve` claims the slot, `attach` hands
/// over the spawned task. Each reservation gets a fresh generation; a tick or
/// attach only counts if it still holds the current one.
#[derive(Debug, Default)]
pub struct RefreshTimer {
    state: TimerState,
    generation: u64,
}

impl RefreshTimer {
    /// True from `reserve` until the timer fires, is cancelled or released.
    pub fn is_scheduled(&self) -> bool {
        matches!(self.state, TimerState::Scheduled { .. })
    }

    pub fn pending_delay(&self) -> Option<Duration> {
        match self.state {
            TimerState::Scheduled { delay, .. } => Some(delay),
            TimerState::Idle => None,
        }
    }

    /// Idle -> Scheduled. Returns the generation the task must present, or
    /// `None` when a timer is already pending.
    pub fn reserve(&mut self, delay: Duration) -> Option<u64> {
        if self.is_scheduled() {
            return None;
        }
        self.generation += 1;
        self.state = TimerState::Scheduled {
            generation: self.generation,
            delay,
            task: None,
        };
        Some(self.generation)
    }

    /// Store the task started for `generation`. A task whose reservation was
    /// cancelled meanwhile is aborted and false is returned.
    pub fn attach(&mut self, generation: u64, task: AbortHandle) -> bool {
        if let TimerState::Scheduled {
            generation: current,
            task: slot,
            ..
        } = &mut self.state
            && *current == generation
            && slot.is_none()
        {
            *slot = Some(task);
            return true;
        }
        task.abort();
        false
    }

    /// Give back a reservation no task was started for.
    pub fn release(&mut self, generation: u64) {
        if let TimerState::Scheduled {
            generation: current,
            ..
        } = self.state
            && current == generation
        {
            self.state = TimerState::Idle;
        }
    }

    /// Scheduled -> Idle, aborting the pending task.
    pub fn cancel(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            TimerState::Scheduled { task, .. } => {
                if let Some(task) = task {
                    task.abort();
                }
                true
            }
            TimerState::Idle => false,
        }
    }

    /// Scheduled -> Idle on behalf of the tick holding `generation`.
    /// Returns false for a stale tick.
    pub fn fire(&mut self, generation: u64) -> bool {
        match self.state {
            TimerState::Scheduled {
                generation: current,
                ..
            } if current == generation => {
                self.state = TimerState::Idle;
                true
            }
            _ => false,
        }
    }
}
