//! Whole-session countdown

use std::fmt;
use std::sync::Arc;

use super::clock::Clock;
use super::countdown::{format_time, Countdown, TimerState, TimerStatus};
use super::driver::{Tick, TickOutcome};
use super::slot::TimerSlotStore;
use super::ExpiryCallback;
use crate::settings::SessionSettings;

/// Countdown for the whole conversation
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use checkin::timer::{ManualClock, MemorySlotStore, SessionTimer, Tick};
///
/// let mut timer = SessionTimer::new(
///     "checkin-session-timer",
///     1,
///     Arc::new(MemorySlotStore::new()),
///     Arc::new(ManualClock::new(0)),
/// );
/// timer.start();
/// for _ in 0..55 {
///     timer.tick();
/// }
/// assert_eq!(timer.formatted_time(), "00:05");
/// ```
pub struct SessionTimer {
    countdown: Countdown,
    on_time_up: Option<ExpiryCallback>,
}

impl SessionTimer {
    /// Create a timer of `duration_minutes`, resuming any state stored under `key`
    pub fn new(
        key: impl Into<String>,
        duration_minutes: u32,
        slots: Arc<dyn TimerSlotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            countdown: Countdown::restore(key, u64::from(duration_minutes) * 60, slots, clock),
            on_time_up: None,
        }
    }

    /// Create a timer sized by the active settings
    pub fn from_settings(
        key: impl Into<String>,
        settings: &SessionSettings,
        slots: Arc<dyn TimerSlotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(key, settings.session_duration, slots, clock)
    }

    /// Callback invoked once when the countdown reaches zero
    pub fn on_time_up(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_time_up = Some(Box::new(callback));
        self
    }

    pub fn key(&self) -> &str {
        self.countdown.key()
    }

    pub fn state(&self) -> TimerState {
        self.countdown.state()
    }

    pub fn status(&self) -> TimerStatus {
        self.countdown.state().status()
    }

    pub fn time_remaining(&self) -> u64 {
        self.countdown.state().time_remaining
    }

    pub fn is_running(&self) -> bool {
        self.countdown.state().is_running
    }

    pub fn is_paused(&self) -> bool {
        self.countdown.state().is_paused
    }

    pub fn duration_secs(&self) -> u64 {
        self.countdown.duration_secs()
    }

    /// Remaining time as `MM:SS`
    pub fn formatted_time(&self) -> String {
        format_time(self.time_remaining())
    }

    /// Start from the full duration, discarding any previous run
    pub fn start(&mut self) {
        self.countdown.start();
        tracing::info!(key = %self.key(), secs = self.duration_secs(), "Session timer started");
    }

    pub fn pause(&mut self) {
        if self.countdown.pause() {
            tracing::info!(key = %self.key(), remaining = self.time_remaining(), "Session timer paused");
        }
    }

    pub fn resume(&mut self) {
        if self.countdown.resume() {
            tracing::info!(key = %self.key(), remaining = self.time_remaining(), "Session timer resumed");
        }
    }

    /// Return to idle at full duration and clear stored state
    pub fn reset(&mut self) {
        self.countdown.reset();
        tracing::info!(key = %self.key(), "Session timer reset");
    }
}

impl Tick for SessionTimer {
    fn tick(&mut self) -> TickOutcome {
        let outcome = self.countdown.tick();
        if outcome == TickOutcome::Expired {
            tracing::info!(key = %self.key(), "Session time is up");
            if let Some(callback) = self.on_time_up.as_mut() {
                callback();
            }
        }
        outcome
    }
}

impl fmt::Debug for SessionTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTimer")
            .field("key", &self.key())
            .field("state", &self.state())
            .finish()
    }
}
