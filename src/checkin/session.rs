//! Check-in session data model
//!
//! [`CheckInSession`] is the aggregate root held in memory while a guided
//! conversation is running. [`CheckInRecord`] is the persisted row it wraps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::steps::{Step, TOTAL_STEPS};

/// Lifecycle status of a persisted check-in row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckInStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInStatus::InProgress => "in-progress",
            CheckInStatus::Completed => "completed",
            CheckInStatus::Abandoned => "abandoned",
        }
    }

    /// Completed and abandoned sessions accept no further work
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CheckInStatus::InProgress)
    }
}

/// Persisted check-in row
///
/// Step fields are stored as plain tokens because rows may have been written
/// by another client; they are parsed leniently on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub id: String,
    pub couple_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: CheckInStatus,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub mood_before: Option<u8>,
    #[serde(default)]
    pub mood_after: Option<u8>,
    #[serde(default)]
    pub reflection: Option<String>,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub completed_steps: Vec<String>,
}

impl CheckInRecord {
    /// A fresh in-progress row
    pub fn in_progress(
        id: impl Into<String>,
        couple_id: impl Into<String>,
        categories: Vec<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            couple_id: couple_id.into(),
            started_at,
            completed_at: None,
            status: CheckInStatus::InProgress,
            categories,
            mood_before: None,
            mood_after: None,
            reflection: None,
            current_step: Some(Step::Welcome.as_str().to_string()),
            completed_steps: Vec::new(),
        }
    }
}

/// Where the couple is in the step sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub current_step: Step,
    pub completed_steps: BTreeSet<Step>,
    pub total_steps: usize,
    pub percentage: u8,
}

impl SessionProgress {
    pub fn new() -> Self {
        Self::at(Step::Welcome, BTreeSet::new())
    }

    pub fn at(current_step: Step, completed_steps: BTreeSet<Step>) -> Self {
        Self {
            current_step,
            completed_steps,
            total_steps: TOTAL_STEPS,
            percentage: current_step.percentage(),
        }
    }

    /// Move to `step`, keeping `percentage` in sync
    pub fn set_current(&mut self, step: Step) {
        self.current_step = step;
        self.percentage = step.percentage();
    }
}

impl Default for SessionProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Visibility of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotePrivacy {
    Private,
    Shared,
    #[default]
    Draft,
}

/// A note written during the session, not yet promoted to a saved note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftNote {
    pub id: String,
    pub check_in_id: String,
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub privacy: NotePrivacy,
    #[serde(default)]
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DraftNote {
    pub fn new(
        check_in_id: impl Into<String>,
        author_id: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            check_in_id: check_in_id.into(),
            author_id: author_id.into(),
            content: content.into(),
            privacy: NotePrivacy::Draft,
            category_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_privacy(mut self, privacy: NotePrivacy) -> Self {
        self.privacy = privacy;
        self
    }
}

/// Per-topic progress within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub category_id: String,
    pub is_completed: bool,
    #[serde(default)]
    pub notes: Vec<DraftNote>,
    /// Seconds spent discussing this topic
    pub time_spent: u64,
    pub last_updated: DateTime<Utc>,
}

impl CategoryProgress {
    pub fn new(category_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            category_id: category_id.into(),
            is_completed: false,
            notes: Vec::new(),
            time_spent: 0,
            last_updated: now,
        }
    }

    /// Merge the set fields of `update` and stamp `last_updated`
    pub fn apply(&mut self, update: &CategoryProgressUpdate, now: DateTime<Utc>) {
        if let Some(done) = update.is_completed {
            self.is_completed = done;
        }
        if let Some(notes) = &update.notes {
            self.notes = notes.clone();
        }
        if let Some(time_spent) = update.time_spent {
            self.time_spent = time_spent;
        }
        self.last_updated = now;
    }
}

/// Partial update for a [`CategoryProgress`] entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryProgressUpdate {
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub notes: Option<Vec<DraftNote>>,
    #[serde(default)]
    pub time_spent: Option<u64>,
}

/// The in-memory aggregate for one guided conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInSession {
    pub id: String,
    pub base_record: CheckInRecord,
    pub progress: SessionProgress,
    pub selected_categories: Vec<String>,
    pub category_progress: Vec<CategoryProgress>,
    pub draft_notes: Vec<DraftNote>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl CheckInSession {
    /// A brand new session at the welcome step, one progress entry per category
    pub fn new(base_record: CheckInRecord, now: DateTime<Utc>) -> Self {
        let selected_categories = dedup_categories(&base_record.categories);
        let category_progress = selected_categories
            .iter()
            .map(|id| CategoryProgress::new(id.clone(), now))
            .collect();

        Self {
            id: base_record.id.clone(),
            started_at: base_record.started_at,
            base_record,
            progress: SessionProgress::new(),
            selected_categories,
            category_progress,
            draft_notes: Vec::new(),
            last_saved_at: None,
        }
    }

    /// Rebuild a session from its persisted row and adjacent rows
    ///
    /// Persisted progress entries for categories that are not selected are
    /// ignored, and selected categories without a persisted entry get a fresh
    /// one, so `category_progress` always mirrors `selected_categories`.
    pub fn restore(
        base_record: CheckInRecord,
        persisted_progress: Vec<CategoryProgress>,
        draft_notes: Vec<DraftNote>,
        now: DateTime<Utc>,
    ) -> Self {
        let current_step = base_record
            .current_step
            .as_deref()
            .and_then(|s| s.parse::<Step>().ok())
            .unwrap_or(Step::Welcome);
        let completed_steps = base_record
            .completed_steps
            .iter()
            .filter_map(|s| s.parse::<Step>().ok())
            .collect();

        let selected_categories = dedup_categories(&base_record.categories);
        let category_progress = selected_categories
            .iter()
            .map(|id| {
                persisted_progress
                    .iter()
                    .find(|p| &p.category_id == id)
                    .cloned()
                    .unwrap_or_else(|| CategoryProgress::new(id.clone(), now))
            })
            .collect();

        Self {
            id: base_record.id.clone(),
            started_at: base_record.started_at,
            base_record,
            progress: SessionProgress::at(current_step, completed_steps),
            selected_categories,
            category_progress,
            draft_notes,
            last_saved_at: None,
        }
    }

    /// Copy the step position from `progress` into `base_record`
    pub fn sync_step_fields(&mut self) {
        self.base_record.current_step = Some(self.progress.current_step.as_str().to_string());
        self.base_record.completed_steps = self
            .progress
            .completed_steps
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
    }

    pub fn category(&self, category_id: &str) -> Option<&CategoryProgress> {
        self.category_progress
            .iter()
            .find(|p| p.category_id == category_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.base_record.status.is_terminal()
    }
}

fn dedup_categories(categories: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(categories.len());
    for category in categories {
        if !seen.contains(category) {
            seen.push(category.clone());
        }
    }
    seen
}
