//! Turn-based speaking clock
//!
//! Adds "whose turn is it" on top of the persisted countdown. The countdown
//! snapshot lives under the configured key and the turn metadata under
//! `<key>:turn`, so both survive a restart.
//!
//! When turn-based mode is off the clock is inert: every operation is a
//! no-op and [`TurnClock::is_active`] returns `false`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::clock::Clock;
use super::countdown::{format_time, Countdown, TimerStatus};
use super::driver::{Tick, TickOutcome};
use super::slot::TimerSlotStore;
use super::ExpiryCallback;
use crate::error::CheckInError;
use crate::settings::SessionSettings;

/// One of the two participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Partner {
    PartnerA,
    PartnerB,
}

impl Partner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partner::PartnerA => "partner-a",
            Partner::PartnerB => "partner-b",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Partner::PartnerA => Partner::PartnerB,
            Partner::PartnerB => Partner::PartnerA,
        }
    }

    fn index(self) -> usize {
        match self {
            Partner::PartnerA => 0,
            Partner::PartnerB => 1,
        }
    }
}

impl fmt::Display for Partner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Partner {
    type Err = CheckInError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partner-a" | "a" => Ok(Partner::PartnerA),
            "partner-b" | "b" => Ok(Partner::PartnerB),
            other => Err(CheckInError::Config(format!("unknown partner '{}'", other))),
        }
    }
}

/// Observable state of the turn clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub current_turn: Partner,
    pub turn_time_remaining: u64,
    pub extensions_used: u32,
    pub max_extensions: u32,
}

/// Knobs that are not part of the couple's settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnClockOptions {
    pub max_extensions: u32,
    pub extension_seconds: u64,
}

impl Default for TurnClockOptions {
    fn default() -> Self {
        Self {
            max_extensions: 2,
            extension_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TurnMeta {
    current_turn: Partner,
    extensions_used: u32,
    #[serde(default)]
    timeouts_used: [u32; 2],
}

impl Default for TurnMeta {
    fn default() -> Self {
        Self {
            current_turn: Partner::PartnerA,
            extensions_used: 0,
            timeouts_used: [0; 2],
        }
    }
}

/// Alternating speaking turns with a capped number of extensions
pub struct TurnClock {
    countdown: Countdown,
    meta_key: String,
    meta: TurnMeta,
    active: bool,
    allow_extensions: bool,
    timeouts_per_partner: u32,
    timeout_secs: u64,
    options: TurnClockOptions,
    slots: Arc<dyn TimerSlotStore>,
    on_turn_end: Option<ExpiryCallback>,
}

impl TurnClock {
    /// Build a turn clock from the active settings, resuming any stored state
    pub fn new(
        key: impl Into<String>,
        settings: &SessionSettings,
        options: TurnClockOptions,
        slots: Arc<dyn TimerSlotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let key = key.into();
        let meta_key = format!("{}:turn", key);
        let mut meta = load_meta(slots.as_ref(), &meta_key).unwrap_or_default();
        // The cap may have been lowered since the metadata was written.
        meta.extensions_used = meta.extensions_used.min(options.max_extensions);
        let countdown = Countdown::restore(
            key,
            u64::from(settings.turn_duration),
            slots.clone(),
            clock,
        );

        Self {
            countdown,
            meta_key,
            meta,
            active: settings.turn_based_mode,
            allow_extensions: settings.allow_extensions,
            timeouts_per_partner: settings.timeouts_per_partner,
            timeout_secs: u64::from(settings.timeout_duration) * 60,
            options,
            slots,
            on_turn_end: None,
        }
    }

    /// Callback invoked once each time a turn runs out
    pub fn on_turn_end(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_turn_end = Some(Box::new(callback));
        self
    }

    /// Whether turn-based mode is enabled; consumers must check this first
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> TurnState {
        TurnState {
            current_turn: self.meta.current_turn,
            turn_time_remaining: self.countdown.state().time_remaining,
            extensions_used: self.meta.extensions_used,
            max_extensions: self.options.max_extensions,
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.countdown.state().status()
    }

    pub fn current_turn(&self) -> Partner {
        self.meta.current_turn
    }

    pub fn formatted_time(&self) -> String {
        format_time(self.countdown.state().time_remaining)
    }

    /// Timeouts the partner has not used yet
    pub fn timeouts_remaining(&self, partner: Partner) -> u32 {
        self.timeouts_per_partner
            .saturating_sub(self.meta.timeouts_used[partner.index()])
    }

    /// Start the current partner's turn from the full turn duration
    pub fn start(&mut self) {
        if !self.active {
            return;
        }
        self.countdown.start();
        self.persist_meta();
        tracing::info!(turn = %self.meta.current_turn, "Turn started");
    }

    pub fn pause(&mut self) {
        if self.active {
            self.countdown.pause();
        }
    }

    pub fn resume(&mut self) {
        if self.active {
            self.countdown.resume();
        }
    }

    /// Back to partner A, idle, with every counter cleared
    pub fn reset(&mut self) {
        if !self.active {
            return;
        }
        self.countdown.reset();
        self.meta = TurnMeta::default();
        if let Err(e) = self.slots.remove(&self.meta_key) {
            tracing::warn!(key = %self.meta_key, "Failed to clear turn state: {}", e);
        }
        tracing::info!("Turn clock reset");
    }

    /// Hand the floor to the other partner with a fresh turn
    ///
    /// Extensions are counted per session and are not restored by switching.
    pub fn switch_turn(&mut self) {
        if !self.active {
            return;
        }
        self.meta.current_turn = self.meta.current_turn.other();
        self.countdown.start();
        self.persist_meta();
        tracing::info!(turn = %self.meta.current_turn, "Turn switched");
    }

    /// Add one extension to the current turn
    ///
    /// Returns `false` without changing anything when extensions are
    /// disallowed or the cap has been reached.
    pub fn extend_turn(&mut self) -> bool {
        if !self.active
            || !self.allow_extensions
            || self.meta.extensions_used >= self.options.max_extensions
        {
            return false;
        }
        self.countdown.add_seconds(self.options.extension_seconds);
        self.meta.extensions_used += 1;
        self.persist_meta();
        tracing::info!(
            turn = %self.meta.current_turn,
            used = self.meta.extensions_used,
            max = self.options.max_extensions,
            "Turn extended"
        );
        true
    }

    /// Use one of `partner`'s timeouts
    ///
    /// Returns the timeout length in seconds, or `None` when the partner has
    /// none left.
    pub fn take_timeout(&mut self, partner: Partner) -> Option<u64> {
        if self.timeouts_remaining(partner) == 0 {
            return None;
        }
        self.meta.timeouts_used[partner.index()] += 1;
        self.persist_meta();
        tracing::info!(
            partner = %partner,
            remaining = self.timeouts_remaining(partner),
            "Timeout taken"
        );
        Some(self.timeout_secs)
    }

    fn persist_meta(&self) {
        let result = serde_json::to_string(&self.meta)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.slots.write(&self.meta_key, &json));
        if let Err(e) = result {
            tracing::warn!(key = %self.meta_key, "Failed to persist turn state: {}", e);
        }
    }
}

impl Tick for TurnClock {
    /// Expiry ends the turn but never switches it
    fn tick(&mut self) -> TickOutcome {
        if !self.active {
            return TickOutcome::Idle;
        }
        let outcome = self.countdown.tick();
        if outcome == TickOutcome::Expired {
            tracing::info!(turn = %self.meta.current_turn, "Turn time is up");
            if let Some(callback) = self.on_turn_end.as_mut() {
                callback();
            }
        }
        outcome
    }
}

impl fmt::Debug for TurnClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnClock")
            .field("active", &self.active)
            .field("state", &self.state())
            .finish()
    }
}

fn load_meta(slots: &dyn TimerSlotStore, key: &str) -> Option<TurnMeta> {
    match slots.read(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(key = %key, "Ignoring malformed turn state: {}", e))
            .ok(),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key = %key, "Turn storage unavailable, starting fresh: {}", e);
            None
        }
    }
}
