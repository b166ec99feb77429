//! Countdown timers for a live check-in
//!
//! Both timers are built on [`countdown::Countdown`], a countdown whose state
//! is written to a [`TimerSlotStore`] after every change and restored with
//! drift correction on startup:
//!
//! - [`SessionTimer`]: one clock for the whole conversation.
//! - [`TurnClock`]: alternating speaking turns with a capped number of
//!   extensions.
//!
//! Timers never mutate the check-in session. They report expiry through
//! caller-supplied callbacks and [`TickOutcome`] values.
//!
//! Ticking is driven externally, either by calling `tick()` once per elapsed
//! second or by a [`TickDriver`].

pub mod clock;
pub mod countdown;
pub mod driver;
pub mod session_timer;
pub mod slot;
pub mod turn_clock;

pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{format_time, restore_remaining, TimerSnapshot, TimerState, TimerStatus};
pub use driver::{Tick, TickDriver, TickOutcome};
pub use session_timer::SessionTimer;
pub use slot::{MemorySlotStore, TimerSlotStore};
pub use turn_clock::{Partner, TurnClock, TurnClockOptions, TurnState};

/// Callback fired once when a countdown reaches zero
pub type ExpiryCallback = Box<dyn FnMut() + Send>;
