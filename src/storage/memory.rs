//! In-process storage backend
//!
//! Holds every table in memory behind a mutex. When constructed with a
//! [`LocalRealtimeHub`], each write is published as a [`ChangeEvent`], which
//! is how tests simulate the partner's device.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{CheckInPatch, CheckInRepository, SettingsRepository};
use crate::checkin::{CategoryProgress, CheckInRecord, CheckInStatus, DraftNote};
use crate::error::{CheckInError, Result};
use crate::realtime::{ChangeEvent, ChangeKind, LocalRealtimeHub, Table};
use crate::settings::SettingsOverride;
use crate::timer::TimerSlotStore;

#[derive(Debug, Default)]
struct Tables {
    check_ins: Vec<CheckInRecord>,
    notes: Vec<DraftNote>,
    progress: HashMap<(String, String), CategoryProgress>,
    settings: HashMap<String, serde_json::Value>,
    timer_slots: HashMap<String, String>,
}

/// In-memory implementation of every storage trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    hub: Option<LocalRealtimeHub>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that publishes every write to `hub`
    pub fn with_realtime(hub: LocalRealtimeHub) -> Self {
        Self {
            hub: Some(hub),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with a storage error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Store a settings row verbatim, bypassing validation
    pub fn put_raw_settings(&self, couple_id: &str, row: serde_json::Value) -> Result<()> {
        self.lock()?.settings.insert(couple_id.to_string(), row);
        Ok(())
    }

    /// Snapshot of a check-in row by id
    pub fn check_in(&self, id: &str) -> Result<Option<CheckInRecord>> {
        Ok(self.lock()?.check_ins.iter().find(|r| r.id == id).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CheckInError::Storage("storage backend unavailable".to_string()).into());
        }
        self.tables
            .lock()
            .map_err(|_| CheckInError::Storage("memory store lock poisoned".to_string()).into())
    }

    fn publish<T: Serialize>(&self, table: Table, kind: ChangeKind, couple_id: &str, row: &T) {
        let Some(hub) = &self.hub else {
            return;
        };
        match serde_json::to_value(row) {
            Ok(record) => hub.publish(ChangeEvent::new(table, kind, couple_id, record)),
            Err(e) => tracing::warn!("Failed to encode change event: {}", e),
        }
    }
}

fn couple_of(tables: &Tables, check_in_id: &str) -> String {
    tables
        .check_ins
        .iter()
        .find(|r| r.id == check_in_id)
        .map(|r| r.couple_id.clone())
        .unwrap_or_default()
}

#[async_trait]
impl CheckInRepository for MemoryStore {
    async fn create_check_in(&self, record: &CheckInRecord) -> Result<CheckInRecord> {
        {
            let mut tables = self.lock()?;
            if tables.check_ins.iter().any(|r| r.id == record.id) {
                return Err(
                    CheckInError::Storage(format!("duplicate check-in id {}", record.id)).into(),
                );
            }
            tables.check_ins.push(record.clone());
        }
        self.publish(Table::CheckIns, ChangeKind::Insert, &record.couple_id, record);
        Ok(record.clone())
    }

    async fn find_active_check_in(&self, couple_id: &str) -> Result<Option<CheckInRecord>> {
        let tables = self.lock()?;
        Ok(tables
            .check_ins
            .iter()
            .filter(|r| r.couple_id == couple_id && r.status == CheckInStatus::InProgress)
            .max_by_key(|r| r.started_at)
            .cloned())
    }

    async fn update_check_in(&self, id: &str, patch: &CheckInPatch) -> Result<CheckInRecord> {
        let updated = {
            let mut tables = self.lock()?;
            let record = tables
                .check_ins
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| CheckInError::NotFound(format!("check-in {}", id)))?;
            patch.apply(record);
            record.clone()
        };
        self.publish(Table::CheckIns, ChangeKind::Update, &updated.couple_id, &updated);
        Ok(updated)
    }

    async fn create_note(&self, note: &DraftNote) -> Result<DraftNote> {
        let couple_id = {
            let mut tables = self.lock()?;
            if tables.notes.iter().any(|n| n.id == note.id) {
                return Err(CheckInError::Storage(format!("duplicate note id {}", note.id)).into());
            }
            tables.notes.push(note.clone());
            couple_of(&tables, &note.check_in_id)
        };
        self.publish(Table::Notes, ChangeKind::Insert, &couple_id, note);
        Ok(note.clone())
    }

    async fn update_note(&self, note: &DraftNote) -> Result<DraftNote> {
        let couple_id = {
            let mut tables = self.lock()?;
            let existing = tables
                .notes
                .iter_mut()
                .find(|n| n.id == note.id)
                .ok_or_else(|| CheckInError::NotFound(format!("note {}", note.id)))?;
            *existing = note.clone();
            couple_of(&tables, &note.check_in_id)
        };
        self.publish(Table::Notes, ChangeKind::Update, &couple_id, note);
        Ok(note.clone())
    }

    async fn delete_note(&self, id: &str) -> Result<()> {
        let removed = {
            let mut tables = self.lock()?;
            match tables.notes.iter().position(|n| n.id == id) {
                Some(index) => {
                    let note = tables.notes.remove(index);
                    let couple_id = couple_of(&tables, &note.check_in_id);
                    Some((note, couple_id))
                }
                None => None,
            }
        };
        if let Some((note, couple_id)) = removed {
            self.publish(Table::Notes, ChangeKind::Delete, &couple_id, &note);
        }
        Ok(())
    }

    async fn list_notes(&self, check_in_id: &str) -> Result<Vec<DraftNote>> {
        let tables = self.lock()?;
        Ok(tables
            .notes
            .iter()
            .filter(|n| n.check_in_id == check_in_id)
            .cloned()
            .collect())
    }

    async fn save_category_progress(
        &self,
        check_in_id: &str,
        progress: &CategoryProgress,
    ) -> Result<()> {
        let mut tables = self.lock()?;
        tables.progress.insert(
            (check_in_id.to_string(), progress.category_id.clone()),
            progress.clone(),
        );
        Ok(())
    }

    async fn load_category_progress(&self, check_in_id: &str) -> Result<Vec<CategoryProgress>> {
        let tables = self.lock()?;
        Ok(tables
            .progress
            .iter()
            .filter(|((id, _), _)| id == check_in_id)
            .map(|(_, p)| p.clone())
            .collect())
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn fetch_settings(&self, couple_id: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.lock()?.settings.get(couple_id).cloned())
    }

    async fn save_settings(&self, couple_id: &str, row: &SettingsOverride) -> Result<()> {
        let value = serde_json::to_value(row)?;
        self.lock()?.settings.insert(couple_id.to_string(), value);
        self.publish(Table::SessionSettings, ChangeKind::Update, couple_id, row);
        Ok(())
    }
}

impl TimerSlotStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.timer_slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?
            .timer_slots
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.timer_slots.remove(key);
        Ok(())
    }
}
