//! Session-scoped key-value slots for timer snapshots
//!
//! Each timer instance owns one key. Keys are passed in explicitly so that
//! several timers can share a store without colliding.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{CheckInError, Result};

/// Key-value store holding one JSON blob per timer
///
/// Failures are reported, but timers treat any failure as "nothing stored".
pub trait TimerSlotStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-lifetime slot store
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerSlotStore for MemorySlotStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| CheckInError::Storage("timer slots poisoned".to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| CheckInError::Storage("timer slots poisoned".to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| CheckInError::Storage("timer slots poisoned".to_string()))?;
        slots.remove(key);
        Ok(())
    }
}
