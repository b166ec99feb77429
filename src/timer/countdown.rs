//! Persisted countdown primitive
//!
//! Every state change is written to a [`TimerSlotStore`] as a
//! [`TimerSnapshot`]. On construction the snapshot is read back and, if the
//! countdown was running, the wall-clock time elapsed since `savedAt` is
//! subtracted so that time spent with no live tick loop is accounted for.
//!
//! Slot failures never reach the caller. A failed read is treated as "nothing
//! stored" and a failed write is logged and otherwise ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::clock::Clock;
use super::driver::TickOutcome;
use super::slot::TimerSlotStore;

/// Stored form of a countdown, exactly as written to the slot
///
/// ```
/// use checkin::timer::TimerSnapshot;
///
/// let snapshot = TimerSnapshot {
///     time_remaining: 300,
///     is_running: true,
///     is_paused: false,
///     saved_at: 1_700_000_000_000,
/// };
/// let json = serde_json::to_string(&snapshot).unwrap();
/// assert_eq!(
///     json,
///     r#"{"timeRemaining":300,"isRunning":true,"isPaused":false,"savedAt":1700000000000}"#
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub time_remaining: u64,
    pub is_running: bool,
    pub is_paused: bool,
    /// Wall-clock epoch milliseconds at the time of the write
    pub saved_at: i64,
}

/// Remaining seconds after correcting a snapshot for elapsed wall-clock time
///
/// Only a running, unpaused snapshot loses time. Elapsed time is floored to
/// whole seconds, a clock that moved backwards counts as zero elapsed, and the
/// result never drops below zero.
///
/// ```
/// use checkin::timer::{restore_remaining, TimerSnapshot};
///
/// let snapshot = TimerSnapshot {
///     time_remaining: 300,
///     is_running: true,
///     is_paused: false,
///     saved_at: 0,
/// };
/// assert_eq!(restore_remaining(&snapshot, 10_999), 290);
/// assert_eq!(restore_remaining(&snapshot, 3_600_000), 0);
/// ```
pub fn restore_remaining(snapshot: &TimerSnapshot, now_ms: i64) -> u64 {
    if !snapshot.is_running || snapshot.is_paused {
        return snapshot.time_remaining;
    }
    let elapsed_secs = now_ms.saturating_sub(snapshot.saved_at).max(0) / 1000;
    snapshot.time_remaining.saturating_sub(elapsed_secs as u64)
}

/// Render seconds as zero-padded `MM:SS`
///
/// Minutes are not capped, so large values widen the minutes field.
///
/// ```
/// use checkin::timer::format_time;
///
/// assert_eq!(format_time(5), "00:05");
/// assert_eq!(format_time(1800), "30:00");
/// assert_eq!(format_time(7500), "125:00");
/// ```
pub fn format_time(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// The three flags a countdown is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub time_remaining: u64,
    pub is_running: bool,
    pub is_paused: bool,
}

impl TimerState {
    pub fn idle(duration_secs: u64) -> Self {
        Self {
            time_remaining: duration_secs,
            is_running: false,
            is_paused: false,
        }
    }

    pub fn status(&self) -> TimerStatus {
        if self.time_remaining == 0 {
            TimerStatus::Expired
        } else if !self.is_running {
            TimerStatus::Idle
        } else if self.is_paused {
            TimerStatus::Paused
        } else {
            TimerStatus::Running
        }
    }
}

/// Derived state of a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Expired,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A countdown bound to one slot key
pub(crate) struct Countdown {
    key: String,
    duration_secs: u64,
    state: TimerState,
    slots: Arc<dyn TimerSlotStore>,
    clock: Arc<dyn Clock>,
}

impl Countdown {
    /// Build a countdown, resuming from the slot under `key` if it holds state
    pub(crate) fn restore(
        key: impl Into<String>,
        duration_secs: u64,
        slots: Arc<dyn TimerSlotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let key = key.into();
        let state = match load_snapshot(slots.as_ref(), &key) {
            Some(snapshot) => {
                let time_remaining = restore_remaining(&snapshot, clock.now_ms());
                tracing::debug!(
                    key = %key,
                    stored = snapshot.time_remaining,
                    restored = time_remaining,
                    "Restored timer state"
                );
                TimerState {
                    time_remaining,
                    is_running: snapshot.is_running,
                    is_paused: snapshot.is_running && snapshot.is_paused,
                }
            }
            None => TimerState::idle(duration_secs),
        };

        Self {
            key,
            duration_secs,
            state,
            slots,
            clock,
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn state(&self) -> TimerState {
        self.state
    }

    pub(crate) fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Restart from the full duration
    pub(crate) fn start(&mut self) {
        self.state = TimerState {
            time_remaining: self.duration_secs,
            is_running: true,
            is_paused: false,
        };
        self.persist();
    }

    pub(crate) fn pause(&mut self) -> bool {
        if self.state.status() != TimerStatus::Running {
            return false;
        }
        self.state.is_paused = true;
        self.persist();
        true
    }

    pub(crate) fn resume(&mut self) -> bool {
        if self.state.status() != TimerStatus::Paused {
            return false;
        }
        self.state.is_paused = false;
        self.persist();
        true
    }

    /// Back to idle at full duration; the slot is cleared rather than written
    pub(crate) fn reset(&mut self) {
        self.state = TimerState::idle(self.duration_secs);
        if let Err(e) = self.slots.remove(&self.key) {
            tracing::warn!(key = %self.key, "Failed to clear timer state: {}", e);
        }
    }

    /// Advance by one second
    pub(crate) fn tick(&mut self) -> TickOutcome {
        if !self.state.is_running || self.state.is_paused {
            return TickOutcome::Idle;
        }
        if self.state.time_remaining <= 1 {
            self.state = TimerState {
                time_remaining: 0,
                is_running: false,
                is_paused: false,
            };
            self.persist();
            return TickOutcome::Expired;
        }
        self.state.time_remaining -= 1;
        self.persist();
        TickOutcome::Ticked(self.state.time_remaining)
    }

    /// Add time; an expired countdown starts running again
    pub(crate) fn add_seconds(&mut self, secs: u64) {
        if self.state.status() == TimerStatus::Expired {
            self.state.is_running = true;
            self.state.is_paused = false;
        }
        self.state.time_remaining = self.state.time_remaining.saturating_add(secs);
        self.persist();
    }

    fn persist(&self) {
        let snapshot = TimerSnapshot {
            time_remaining: self.state.time_remaining,
            is_running: self.state.is_running,
            is_paused: self.state.is_paused,
            saved_at: self.clock.now_ms(),
        };
        let result = serde_json::to_string(&snapshot)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.slots.write(&self.key, &json));
        if let Err(e) = result {
            tracing::warn!(key = %self.key, "Failed to persist timer state: {}", e);
        }
    }
}

fn load_snapshot(slots: &dyn TimerSlotStore, key: &str) -> Option<TimerSnapshot> {
    let raw = match slots.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key = %key, "Timer storage unavailable, starting fresh: {}", e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!(key = %key, "Ignoring malformed timer state: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::timer::{ManualClock, MemorySlotStore};

    const T0: i64 = 1_700_000_000_000;

    fn countdown(duration: u64) -> (Countdown, Arc<MemorySlotStore>, Arc<ManualClock>) {
        let slots = Arc::new(MemorySlotStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        let countdown = Countdown::restore("t", duration, slots.clone(), clock.clone());
        (countdown, slots, clock)
    }

    fn stored(slots: &MemorySlotStore) -> Option<TimerSnapshot> {
        slots
            .read("t")
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[test]
    fn test_restore_remaining_ignores_paused_and_idle() {
        let mut snapshot = TimerSnapshot {
            time_remaining: 100,
            is_running: true,
            is_paused: true,
            saved_at: 0,
        };
        assert_eq!(restore_remaining(&snapshot, 50_000), 100);
        snapshot.is_running = false;
        snapshot.is_paused = false;
        assert_eq!(restore_remaining(&snapshot, 50_000), 100);
    }

    #[test]
    fn test_restore_remaining_clock_skew_counts_as_zero() {
        let snapshot = TimerSnapshot {
            time_remaining: 100,
            is_running: true,
            is_paused: false,
            saved_at: 10_000,
        };
        assert_eq!(restore_remaining(&snapshot, 0), 100);
    }

    #[test]
    fn test_restore_remaining_corrupt_saved_at_does_not_overflow() {
        let mut snapshot = TimerSnapshot {
            time_remaining: 300,
            is_running: true,
            is_paused: false,
            saved_at: i64::MIN,
        };
        assert_eq!(restore_remaining(&snapshot, T0), 0);
        snapshot.saved_at = i64::MAX;
        assert_eq!(restore_remaining(&snapshot, -T0), 300);
    }

    #[test]
    fn test_restore_from_slot_with_corrupt_saved_at() {
        let slots = Arc::new(MemorySlotStore::new());
        slots
            .write(
                "t",
                r#"{"timeRemaining":300,"isRunning":true,"isPaused":false,"savedAt":-9223372036854775808}"#,
            )
            .unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let mut c = Countdown::restore("t", 300, slots, clock);

        assert_eq!(c.state().time_remaining, 0);
        assert_eq!(c.tick(), TickOutcome::Expired);
    }

    #[test]
    fn test_fresh_countdown_is_idle_at_full_duration() {
        let (c, slots, _) = countdown(60);
        assert_eq!(c.state(), TimerState::idle(60));
        assert_eq!(c.state().status(), TimerStatus::Idle);
        assert!(stored(&slots).is_none());
    }

    #[test]
    fn test_every_change_is_persisted_with_saved_at() {
        let (mut c, slots, clock) = countdown(60);
        c.start();
        clock.advance_secs(1);
        c.tick();

        let snapshot = stored(&slots).unwrap();
        assert_eq!(snapshot.time_remaining, 59);
        assert!(snapshot.is_running);
        assert_eq!(snapshot.saved_at, T0 + 1000);

        c.pause();
        assert!(stored(&slots).unwrap().is_paused);
    }

    #[test]
    fn test_pause_and_resume_only_from_legal_states() {
        let (mut c, _, _) = countdown(60);
        assert!(!c.pause());
        assert!(!c.resume());
        c.start();
        assert!(!c.resume());
        assert!(c.pause());
        assert!(!c.pause());
        assert!(c.resume());
        assert_eq!(c.state().status(), TimerStatus::Running);
    }

    #[test]
    fn test_paused_countdown_does_not_tick() {
        let (mut c, _, _) = countdown(60);
        c.start();
        c.pause();
        assert_eq!(c.tick(), TickOutcome::Idle);
        assert_eq!(c.state().time_remaining, 60);
    }

    #[test]
    fn test_tick_expires_once_and_stops() {
        let (mut c, _, _) = countdown(3);
        c.start();
        assert_eq!(c.tick(), TickOutcome::Ticked(2));
        assert_eq!(c.tick(), TickOutcome::Ticked(1));
        assert_eq!(c.tick(), TickOutcome::Expired);
        assert_eq!(c.tick(), TickOutcome::Idle);

        let state = c.state();
        assert_eq!(state.time_remaining, 0);
        assert!(!state.is_running);
        assert!(!state.is_paused);
        assert_eq!(state.status(), TimerStatus::Expired);
    }

    #[test]
    fn test_start_always_restarts_from_full_duration() {
        let (mut c, _, _) = countdown(10);
        c.start();
        c.tick();
        c.tick();
        c.start();
        assert_eq!(c.state().time_remaining, 10);
    }

    #[test]
    fn test_reset_clears_slot() {
        let (mut c, slots, _) = countdown(10);
        c.start();
        c.tick();
        c.reset();
        assert!(stored(&slots).is_none());
        assert_eq!(c.state(), TimerState::idle(10));
    }

    #[test]
    fn test_restore_applies_drift_correction() {
        let (mut c, slots, clock) = countdown(300);
        c.start();
        clock.advance_secs(10);

        let restored = Countdown::restore("t", 300, slots, clock);
        assert_eq!(restored.state().time_remaining, 290);
        assert_eq!(restored.state().status(), TimerStatus::Running);
    }

    #[test]
    fn test_restored_zero_running_expires_on_next_tick() {
        let (mut c, slots, clock) = countdown(5);
        c.start();
        clock.advance_secs(60);

        let mut restored = Countdown::restore("t", 5, slots, clock);
        assert_eq!(restored.state().time_remaining, 0);
        assert_eq!(restored.tick(), TickOutcome::Expired);
        assert_eq!(restored.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_restore_normalises_paused_without_running() {
        let slots = Arc::new(MemorySlotStore::new());
        slots
            .write(
                "t",
                r#"{"timeRemaining":42,"isRunning":false,"isPaused":true,"savedAt":0}"#,
            )
            .unwrap();
        let c = Countdown::restore("t", 60, slots, Arc::new(ManualClock::new(T0)));
        assert_eq!(c.state().time_remaining, 42);
        assert!(!c.state().is_paused);
    }

    #[test]
    fn test_malformed_slot_starts_fresh() {
        let slots = Arc::new(MemorySlotStore::new());
        slots.write("t", "not json").unwrap();
        let c = Countdown::restore("t", 60, slots, Arc::new(ManualClock::new(T0)));
        assert_eq!(c.state(), TimerState::idle(60));
    }

    #[test]
    fn test_unavailable_storage_falls_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let mut c = Countdown::restore("t", 60, store.clone(), Arc::new(ManualClock::new(T0)));
        assert_eq!(c.state(), TimerState::idle(60));

        c.start();
        c.reset();
        assert_eq!(c.state(), TimerState::idle(60));
    }

    #[test]
    fn test_add_seconds_revives_expired_countdown() {
        let (mut c, _, _) = countdown(1);
        c.start();
        assert_eq!(c.tick(), TickOutcome::Expired);
        c.add_seconds(60);
        assert_eq!(c.state().time_remaining, 60);
        assert_eq!(c.state().status(), TimerStatus::Running);
    }
}
