//! Orchestration over the pure reducer
//!
//! [`CheckInContext`] owns the local [`CheckInState`] and the persistence
//! collaborator. Every operation applies its reducer transition first and
//! persists afterwards. A failed write is recorded in `state.error` and the
//! local transition stays in place, so navigation never waits on storage.
//!
//! Methods return `Err` only for misuse the caller must handle, such as
//! starting a second session or editing when no session is loaded.

use std::collections::HashSet;
use std::sync::Arc;

use super::reducer::{reduce, CheckInAction, CheckInState, DraftNoteUpdate};
use super::session::{
    CategoryProgressUpdate, CheckInRecord, CheckInSession, CheckInStatus, DraftNote,
};
use super::steps::Step;
use crate::error::{CheckInError, Result};
use crate::realtime::{ChangeEvent, ChangeKind, Table};
use crate::storage::{new_check_in_id, CheckInPatch, CheckInRepository};
use crate::timer::Clock;

/// Local-first check-in controller for one device
pub struct CheckInContext {
    repository: Arc<dyn CheckInRepository>,
    clock: Arc<dyn Clock>,
    couple_id: String,
    user_id: String,
    state: CheckInState,
    persisted_notes: HashSet<String>,
}

impl CheckInContext {
    /// Create a context in the loading state; call [`CheckInContext::load`] next
    pub fn new(
        repository: Arc<dyn CheckInRepository>,
        couple_id: impl Into<String>,
        user_id: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            clock,
            couple_id: couple_id.into(),
            user_id: user_id.into(),
            state: CheckInState::loading(),
            persisted_notes: HashSet::new(),
        }
    }

    pub fn state(&self) -> &CheckInState {
        &self.state
    }

    pub fn session(&self) -> Option<&CheckInSession> {
        self.state.session.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn couple_id(&self) -> &str {
        &self.couple_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Apply one action to local state
    pub fn dispatch(&mut self, action: CheckInAction) {
        tracing::debug!(action = action.name(), "Dispatching check-in action");
        let now = self.clock.now();
        self.state = reduce(std::mem::take(&mut self.state), action, now);
    }

    fn fail(&mut self, what: &str, err: anyhow::Error) {
        tracing::warn!(couple_id = %self.couple_id, "{}: {}", what, err);
        self.dispatch(CheckInAction::SetError(Some(format!("{}: {}", what, err))));
    }

    fn require_session(&self) -> Result<&CheckInSession> {
        self.state
            .session
            .as_ref()
            .ok_or_else(|| CheckInError::NoActiveSession.into())
    }

    /// Resume the couple's in-progress check-in, if there is one
    pub async fn load(&mut self) {
        self.dispatch(CheckInAction::SetLoading(true));

        match self.restore_active().await {
            Ok(Some(session)) => {
                tracing::info!(session_id = %session.id, step = %session.progress.current_step, "Restored check-in");
                self.persisted_notes = session.draft_notes.iter().map(|n| n.id.clone()).collect();
                self.dispatch(CheckInAction::RestoreSession(session));
            }
            Ok(None) => {
                self.persisted_notes.clear();
                self.dispatch(CheckInAction::AbandonCheckIn);
            }
            Err(e) => self.fail("Failed to load check-in", e),
        }

        self.dispatch(CheckInAction::SetLoading(false));
    }

    async fn restore_active(&self) -> Result<Option<CheckInSession>> {
        let Some(record) = self.repository.find_active_check_in(&self.couple_id).await? else {
            return Ok(None);
        };
        let progress = self.repository.load_category_progress(&record.id).await?;
        let notes = self.repository.list_notes(&record.id).await?;
        Ok(Some(CheckInSession::restore(
            record,
            progress,
            notes,
            self.clock.now(),
        )))
    }

    /// Begin a new check-in over `categories`
    ///
    /// # Errors
    ///
    /// Returns `CheckInError::SessionAlreadyActive` while another session is
    /// in progress. A failure to create the persisted row is recorded in
    /// `state.error` instead; the local session is kept.
    pub async fn start_check_in(
        &mut self,
        categories: Vec<String>,
        mood_before: Option<u8>,
    ) -> Result<()> {
        if let Some(session) = self.state.session.as_ref().filter(|s| !s.is_terminal()) {
            return Err(CheckInError::SessionAlreadyActive(session.id.clone()).into());
        }

        let mut record = CheckInRecord::in_progress(
            new_check_in_id(),
            self.couple_id.as_str(),
            categories,
            self.clock.now(),
        );
        record.mood_before = mood_before;

        self.persisted_notes.clear();
        self.dispatch(CheckInAction::StartCheckIn {
            record: record.clone(),
        });
        tracing::info!(session_id = %record.id, categories = ?record.categories, "Check-in started");

        if let Err(e) = self.repository.create_check_in(&record).await {
            self.fail("Failed to start check-in", e);
        }
        Ok(())
    }

    /// Whether navigation to `step` is allowed
    ///
    /// A step is reachable when it is the current step, already completed, or
    /// the step right after the current one.
    pub fn can_go_to_step(&self, step: Step) -> bool {
        let Some(session) = self.session() else {
            return false;
        };
        let current = session.progress.current_step;
        step == current
            || session.progress.completed_steps.contains(&step)
            || step.index() == current.index() + 1
    }

    pub fn is_step_completed(&self, step: Step) -> bool {
        self.session()
            .is_some_and(|s| s.progress.completed_steps.contains(&step))
    }

    /// Navigate to `step` if allowed; returns `false` when refused
    pub async fn go_to_step(&mut self, step: Step) -> bool {
        if !self.can_go_to_step(step) {
            tracing::debug!(step = %step, "Navigation refused");
            return false;
        }
        self.dispatch(CheckInAction::GoToStep(step));
        self.persist_progress("Failed to update step").await;
        true
    }

    /// Mark `step` completed and advance past it
    pub async fn complete_step(&mut self, step: Step) -> Result<()> {
        self.require_session()?;
        self.dispatch(CheckInAction::CompleteStep(step));
        tracing::info!(step = %step, "Step completed");
        self.persist_progress("Failed to complete step").await;
        Ok(())
    }

    async fn persist_progress(&mut self, what: &str) {
        let Some(session) = self.session() else {
            return;
        };
        let id = session.id.clone();
        let patch = CheckInPatch::from_progress(&session.progress);
        if let Err(e) = self.repository.update_check_in(&id, &patch).await {
            self.fail(what, e);
        }
    }

    /// Record time, notes or completion against a selected category
    ///
    /// Unknown categories are ignored.
    pub async fn update_category_progress(
        &mut self,
        category_id: &str,
        update: CategoryProgressUpdate,
    ) -> Result<()> {
        self.require_session()?;
        self.dispatch(CheckInAction::SetCategoryProgress {
            category_id: category_id.to_string(),
            update,
        });

        let Some(session) = self.session() else {
            return Ok(());
        };
        let Some(progress) = session.category(category_id).cloned() else {
            return Ok(());
        };
        let id = session.id.clone();
        if let Err(e) = self.repository.save_category_progress(&id, &progress).await {
            self.fail("Failed to save category progress", e);
        }
        Ok(())
    }

    /// Add an unsaved note authored by this device's user
    pub fn add_draft_note(
        &mut self,
        content: impl Into<String>,
        category_id: Option<String>,
    ) -> Result<DraftNote> {
        let session = self.require_session()?;
        let mut note = DraftNote::new(
            session.id.as_str(),
            self.user_id.as_str(),
            content,
            self.clock.now(),
        );
        if let Some(category_id) = category_id {
            note = note.with_category(category_id);
        }
        self.dispatch(CheckInAction::AddDraftNote(note.clone()));
        Ok(note)
    }

    pub fn update_draft_note(&mut self, id: &str, update: DraftNoteUpdate) -> Result<()> {
        self.require_session()?;
        self.dispatch(CheckInAction::UpdateDraftNote {
            id: id.to_string(),
            update,
        });
        Ok(())
    }

    /// Drop a draft note, deleting its persisted row if it was saved before
    pub async fn remove_draft_note(&mut self, id: &str) -> Result<()> {
        self.require_session()?;
        self.dispatch(CheckInAction::RemoveDraftNote(id.to_string()));
        if self.persisted_notes.remove(id) {
            if let Err(e) = self.repository.delete_note(id).await {
                self.fail("Failed to delete note", e);
            }
        }
        Ok(())
    }

    /// Flush draft notes, category progress and step fields to storage
    ///
    /// `last_saved_at` is only stamped when every write succeeded.
    pub async fn save_session(&mut self) -> Result<()> {
        let session = self.require_session()?.clone();
        match self.flush(&session).await {
            Ok(()) => {
                self.dispatch(CheckInAction::SaveSession);
                self.dispatch(CheckInAction::SetError(None));
                tracing::info!(session_id = %session.id, notes = session.draft_notes.len(), "Session saved");
            }
            Err(e) => self.fail("Failed to save session", e),
        }
        Ok(())
    }

    async fn flush(&mut self, session: &CheckInSession) -> Result<()> {
        for note in &session.draft_notes {
            if self.persisted_notes.contains(&note.id) {
                self.repository.update_note(note).await?;
            } else {
                self.repository.create_note(note).await?;
                self.persisted_notes.insert(note.id.clone());
            }
        }
        for progress in &session.category_progress {
            self.repository
                .save_category_progress(&session.id, progress)
                .await?;
        }
        self.repository
            .update_check_in(&session.id, &CheckInPatch::from_progress(&session.progress))
            .await?;
        Ok(())
    }

    /// Finish the check-in
    ///
    /// On success the persisted row is returned and the local session is
    /// cleared. If persistence fails the error is recorded, the local
    /// session stays in its completed state, and `Ok(None)` is returned so
    /// the caller can retry.
    pub async fn complete_check_in(
        &mut self,
        mood_after: Option<u8>,
        reflection: Option<String>,
    ) -> Result<Option<CheckInRecord>> {
        self.require_session()?;
        self.dispatch(CheckInAction::CompleteCheckIn {
            mood_after,
            reflection,
        });
        let session = self.require_session()?.clone();

        let result = self.persist_completion(&session).await;

        match result {
            Ok(record) => {
                tracing::info!(session_id = %session.id, "Check-in completed");
                self.persisted_notes.clear();
                self.dispatch(CheckInAction::AbandonCheckIn);
                Ok(Some(record))
            }
            Err(e) => {
                self.fail("Failed to complete check-in", e);
                Ok(None)
            }
        }
    }

    async fn persist_completion(&mut self, session: &CheckInSession) -> Result<CheckInRecord> {
        self.flush(session).await?;
        let record = &session.base_record;
        let patch = CheckInPatch {
            status: Some(CheckInStatus::Completed),
            completed_at: record.completed_at,
            mood_after: record.mood_after,
            reflection: record.reflection.clone(),
            ..CheckInPatch::from_progress(&session.progress)
        };
        self.repository.update_check_in(&session.id, &patch).await
    }

    /// Discard the session locally, delete its saved notes and mark the row abandoned
    pub async fn abandon_check_in(&mut self) -> Result<()> {
        let session = self.require_session()?.clone();
        self.dispatch(CheckInAction::AbandonCheckIn);
        tracing::info!(session_id = %session.id, "Check-in abandoned");

        for id in std::mem::take(&mut self.persisted_notes) {
            if let Err(e) = self.repository.delete_note(&id).await {
                tracing::warn!(note_id = %id, "Failed to delete draft note: {}", e);
            }
        }

        let patch = CheckInPatch {
            status: Some(CheckInStatus::Abandoned),
            ..Default::default()
        };
        if let Err(e) = self.repository.update_check_in(&session.id, &patch).await {
            self.fail("Failed to abandon check-in", e);
        }
        Ok(())
    }

    /// Merge a change made on the partner's device
    ///
    /// Returns `true` when local state was touched. Events for other couples
    /// or other sessions are ignored.
    pub fn apply_change(&mut self, event: &ChangeEvent) -> bool {
        if event.couple_id != self.couple_id {
            return false;
        }
        match event.table {
            Table::CheckIns => self.apply_check_in_change(event),
            Table::Notes => self.apply_note_change(event),
            Table::CategoryProgress | Table::SessionSettings => false,
        }
    }

    fn apply_check_in_change(&mut self, event: &ChangeEvent) -> bool {
        let active_id = self.session().map(|s| s.id.clone());

        if event.kind == ChangeKind::Delete {
            if active_id.is_some() && event.record_id() == active_id.as_deref() {
                tracing::info!("Active check-in deleted remotely");
                self.persisted_notes.clear();
                self.dispatch(CheckInAction::AbandonCheckIn);
                return true;
            }
            return false;
        }

        let record: CheckInRecord = match event.decode() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Ignoring undecodable check-in change: {}", e);
                return false;
            }
        };

        match active_id {
            Some(id) if id == record.id => {
                if record.status.is_terminal() {
                    tracing::info!(session_id = %id, status = record.status.as_str(), "Check-in ended remotely");
                    self.persisted_notes.clear();
                }
                self.dispatch(CheckInAction::ApplyRemoteRecord(record));
                true
            }
            None if event.kind == ChangeKind::Insert
                && record.status == CheckInStatus::InProgress =>
            {
                tracing::info!(session_id = %record.id, "Joined check-in started remotely");
                let session = CheckInSession::restore(record, Vec::new(), Vec::new(), self.clock.now());
                self.persisted_notes.clear();
                self.dispatch(CheckInAction::RestoreSession(session));
                true
            }
            _ => false,
        }
    }

    fn apply_note_change(&mut self, event: &ChangeEvent) -> bool {
        let Some(session_id) = self.session().map(|s| s.id.clone()) else {
            return false;
        };

        if event.kind == ChangeKind::Delete {
            let Some(id) = event.record_id().map(str::to_string) else {
                return false;
            };
            let known = self
                .session()
                .is_some_and(|s| s.draft_notes.iter().any(|n| n.id == id));
            self.persisted_notes.remove(&id);
            if known {
                self.dispatch(CheckInAction::RemoveDraftNote(id));
            }
            return known;
        }

        let note: DraftNote = match event.decode() {
            Ok(note) => note,
            Err(e) => {
                tracing::warn!("Ignoring undecodable note change: {}", e);
                return false;
            }
        };
        if note.check_in_id != session_id {
            return false;
        }
        // Echo of a note this device already wrote; local state is newer or equal.
        if note.author_id == self.user_id && self.persisted_notes.contains(&note.id) {
            return false;
        }
        let unchanged = self
            .session()
            .is_some_and(|s| s.draft_notes.iter().any(|n| *n == note));
        if unchanged {
            return false;
        }
        self.persisted_notes.insert(note.id.clone());
        self.dispatch(CheckInAction::UpsertDraftNote(note));
        true
    }
}
