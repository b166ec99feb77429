//! Persistence collaborators
//!
//! The engine talks to storage only through the async traits defined here.
//! "Not found" is an ordinary value (`Ok(None)`), never an error.
//!
//! - [`MemoryStore`]: in-process tables, optionally publishing change events
//!   to a [`crate::realtime::LocalRealtimeHub`].
//! - [`SledStore`]: embedded `sled` database used by the CLI.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkin::{CategoryProgress, CheckInRecord, CheckInStatus, DraftNote, SessionProgress};
use crate::error::Result;
use crate::settings::SettingsOverride;

pub mod memory;
pub mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

/// Field changes for a persisted check-in row; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckInPatch {
    pub status: Option<CheckInStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub mood_before: Option<u8>,
    pub mood_after: Option<u8>,
    pub reflection: Option<String>,
    pub current_step: Option<String>,
    pub completed_steps: Option<Vec<String>>,
}

impl CheckInPatch {
    /// Patch carrying the step fields of `progress`
    pub fn from_progress(progress: &SessionProgress) -> Self {
        Self {
            current_step: Some(progress.current_step.as_str().to_string()),
            completed_steps: Some(
                progress
                    .completed_steps
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn apply(&self, record: &mut CheckInRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if self.completed_at.is_some() {
            record.completed_at = self.completed_at;
        }
        if self.mood_before.is_some() {
            record.mood_before = self.mood_before;
        }
        if self.mood_after.is_some() {
            record.mood_after = self.mood_after;
        }
        if let Some(reflection) = &self.reflection {
            record.reflection = Some(reflection.clone());
        }
        if let Some(step) = &self.current_step {
            record.current_step = Some(step.clone());
        }
        if let Some(steps) = &self.completed_steps {
            record.completed_steps = steps.clone();
        }
    }
}

/// Check-in rows and their adjacent note and category-progress rows
#[async_trait]
pub trait CheckInRepository: Send + Sync {
    /// Insert a new in-progress row
    async fn create_check_in(&self, record: &CheckInRecord) -> Result<CheckInRecord>;

    /// Most recently started in-progress row for the couple
    async fn find_active_check_in(&self, couple_id: &str) -> Result<Option<CheckInRecord>>;

    /// Apply `patch` to the row with `id` and return the updated row
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CheckInError::NotFound`] when no row has `id`.
    async fn update_check_in(&self, id: &str, patch: &CheckInPatch) -> Result<CheckInRecord>;

    async fn create_note(&self, note: &DraftNote) -> Result<DraftNote>;

    async fn update_note(&self, note: &DraftNote) -> Result<DraftNote>;

    /// Delete a note; deleting a missing note succeeds
    async fn delete_note(&self, id: &str) -> Result<()>;

    async fn list_notes(&self, check_in_id: &str) -> Result<Vec<DraftNote>>;

    /// Insert or replace the progress row for one category
    async fn save_category_progress(
        &self,
        check_in_id: &str,
        progress: &CategoryProgress,
    ) -> Result<()>;

    async fn load_category_progress(&self, check_in_id: &str) -> Result<Vec<CategoryProgress>>;
}

/// Couple-specific settings rows
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Raw settings row for the couple
    ///
    /// The row is returned undecoded so that a malformed row can be detected
    /// and ignored by the caller.
    async fn fetch_settings(&self, couple_id: &str) -> Result<Option<serde_json::Value>>;

    async fn save_settings(&self, couple_id: &str, row: &SettingsOverride) -> Result<()>;
}

/// Generate a new sortable identifier for a check-in row
///
/// # Examples
///
/// ```
/// use checkin::storage::new_check_in_id;
///
/// let id = new_check_in_id();
/// assert_eq!(id.len(), 26);
/// ```
pub fn new_check_in_id() -> String {
    ulid::Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::Step;
    use crate::test_utils::fixed_time;
    use std::collections::BTreeSet;

    #[test]
    fn test_new_check_in_id_is_unique() {
        assert_ne!(new_check_in_id(), new_check_in_id());
    }

    #[test]
    fn test_patch_from_progress_carries_steps() {
        let completed: BTreeSet<Step> = [Step::Welcome, Step::CategorySelection].into();
        let progress = SessionProgress::at(Step::CategoryDiscussion, completed);
        let patch = CheckInPatch::from_progress(&progress);

        assert_eq!(patch.current_step.as_deref(), Some("category-discussion"));
        assert_eq!(
            patch.completed_steps,
            Some(vec![
                "welcome".to_string(),
                "category-selection".to_string()
            ])
        );
        assert!(patch.status.is_none());
    }

    #[test]
    fn test_patch_apply_leaves_unset_fields() {
        let mut record = CheckInRecord::in_progress("ci-1", "c-1", vec![], fixed_time());
        record.mood_before = Some(3);
        let patch = CheckInPatch {
            status: Some(CheckInStatus::Completed),
            reflection: Some("thanks".to_string()),
            ..Default::default()
        };
        patch.apply(&mut record);

        assert_eq!(record.status, CheckInStatus::Completed);
        assert_eq!(record.mood_before, Some(3));
        assert_eq!(record.reflection.as_deref(), Some("thanks"));
        assert_eq!(record.current_step.as_deref(), Some("welcome"));
    }
}
