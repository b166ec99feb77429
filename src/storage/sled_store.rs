//! Embedded `sled` storage backend
//!
//! Every table is a sled tree holding JSON values:
//!
//! - `check_ins`: key = check-in id (ULID, so keys sort by creation)
//! - `notes`: key = note id
//! - `category_progress`: key = `<check_in_id>/<category_id>`
//! - `settings`: key = couple id
//! - `timer_slots`: key = timer slot key

use async_trait::async_trait;
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::path::{Path, PathBuf};

use super::{CheckInPatch, CheckInRepository, SettingsRepository};
use crate::checkin::{CategoryProgress, CheckInRecord, CheckInStatus, DraftNote};
use crate::error::{CheckInError, Result};
use crate::settings::SettingsOverride;
use crate::timer::TimerSlotStore;

const CHECK_INS: &str = "check_ins";
const NOTES: &str = "notes";
const CATEGORY_PROGRESS: &str = "category_progress";
const SETTINGS: &str = "settings";
const TIMER_SLOTS: &str = "timer_slots";

/// sled-backed implementation of every storage trait
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create a store at `path`
    ///
    /// # Errors
    ///
    /// Returns `CheckInError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use checkin::storage::SledStore;
    ///
    /// # fn main() -> checkin::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledStore::open(dir.path().join("checkin.db"))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| CheckInError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }

    /// Default database location inside the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "checkin", "checkin").ok_or_else(|| {
            CheckInError::Storage("Could not determine data directory".to_string())
        })?;
        Ok(dirs.data_dir().join("checkin.db"))
    }

    fn tree(&self, name: &str) -> Result<Tree> {
        self.db
            .open_tree(name)
            .map_err(|e| CheckInError::Storage(format!("Failed to open tree {}: {}", name, e)).into())
    }

    fn put<T: Serialize>(&self, tree: &str, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| CheckInError::Storage(format!("Serialization failed: {}", e)))?;
        let tree = self.tree(tree)?;
        tree.insert(key.as_bytes(), bytes)
            .map_err(|e| CheckInError::Storage(format!("Insert failed: {}", e)))?;
        tree.flush()
            .map_err(|e| CheckInError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, tree: &str, key: &str) -> Result<Option<T>> {
        match self
            .tree(tree)?
            .get(key.as_bytes())
            .map_err(|e| CheckInError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| CheckInError::Storage(format!("Deserialization failed: {}", e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn delete(&self, tree: &str, key: &str) -> Result<()> {
        let tree = self.tree(tree)?;
        tree.remove(key.as_bytes())
            .map_err(|e| CheckInError::Storage(format!("Remove failed: {}", e)))?;
        tree.flush()
            .map_err(|e| CheckInError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, tree: &str, prefix: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for result in self.tree(tree)?.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) =
                result.map_err(|e| CheckInError::Storage(format!("Iteration failed: {}", e)))?;
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| CheckInError::Storage(format!("Deserialization failed: {}", e)))?;
            values.push(value);
        }
        Ok(values)
    }
}

#[async_trait]
impl CheckInRepository for SledStore {
    async fn create_check_in(&self, record: &CheckInRecord) -> Result<CheckInRecord> {
        if self.get::<CheckInRecord>(CHECK_INS, &record.id)?.is_some() {
            return Err(CheckInError::Storage(format!("duplicate check-in id {}", record.id)).into());
        }
        self.put(CHECK_INS, &record.id, record)?;
        Ok(record.clone())
    }

    async fn find_active_check_in(&self, couple_id: &str) -> Result<Option<CheckInRecord>> {
        let records: Vec<CheckInRecord> = self.scan(CHECK_INS, "")?;
        Ok(records
            .into_iter()
            .filter(|r| r.couple_id == couple_id && r.status == CheckInStatus::InProgress)
            .max_by_key(|r| r.started_at))
    }

    async fn update_check_in(&self, id: &str, patch: &CheckInPatch) -> Result<CheckInRecord> {
        let mut record: CheckInRecord = self
            .get(CHECK_INS, id)?
            .ok_or_else(|| CheckInError::NotFound(format!("check-in {}", id)))?;
        patch.apply(&mut record);
        self.put(CHECK_INS, id, &record)?;
        Ok(record)
    }

    async fn create_note(&self, note: &DraftNote) -> Result<DraftNote> {
        if self.get::<DraftNote>(NOTES, &note.id)?.is_some() {
            return Err(CheckInError::Storage(format!("duplicate note id {}", note.id)).into());
        }
        self.put(NOTES, &note.id, note)?;
        Ok(note.clone())
    }

    async fn update_note(&self, note: &DraftNote) -> Result<DraftNote> {
        if self.get::<DraftNote>(NOTES, &note.id)?.is_none() {
            return Err(CheckInError::NotFound(format!("note {}", note.id)).into());
        }
        self.put(NOTES, &note.id, note)?;
        Ok(note.clone())
    }

    async fn delete_note(&self, id: &str) -> Result<()> {
        self.delete(NOTES, id)
    }

    async fn list_notes(&self, check_in_id: &str) -> Result<Vec<DraftNote>> {
        let notes: Vec<DraftNote> = self.scan(NOTES, "")?;
        Ok(notes
            .into_iter()
            .filter(|n| n.check_in_id == check_in_id)
            .collect())
    }

    async fn save_category_progress(
        &self,
        check_in_id: &str,
        progress: &CategoryProgress,
    ) -> Result<()> {
        let key = format!("{}/{}", check_in_id, progress.category_id);
        self.put(CATEGORY_PROGRESS, &key, progress)
    }

    async fn load_category_progress(&self, check_in_id: &str) -> Result<Vec<CategoryProgress>> {
        self.scan(CATEGORY_PROGRESS, &format!("{}/", check_in_id))
    }
}

#[async_trait]
impl SettingsRepository for SledStore {
    async fn fetch_settings(&self, couple_id: &str) -> Result<Option<serde_json::Value>> {
        self.get(SETTINGS, couple_id)
    }

    async fn save_settings(&self, couple_id: &str, row: &SettingsOverride) -> Result<()> {
        self.put(SETTINGS, couple_id, row)
    }
}

impl TimerSlotStore for SledStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match self
            .tree(TIMER_SLOTS)?
            .get(key.as_bytes())
            .map_err(|e| CheckInError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let tree = self.tree(TIMER_SLOTS)?;
        tree.insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| CheckInError::Storage(format!("Insert failed: {}", e)))?;
        tree.flush()
            .map_err(|e| CheckInError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.delete(TIMER_SLOTS, key)
    }
}
