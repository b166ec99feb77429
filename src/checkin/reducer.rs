//! Pure state transitions for the check-in wizard
//!
//! [`reduce`] is the only function that changes a [`CheckInState`]. It performs
//! no I/O: wall-clock time and fresh identifiers arrive as inputs, and every
//! persistence call lives in [`super::context::CheckInContext`].
//!
//! Invalid input (unknown category, unknown note id, no active session) is
//! resolved by returning the state unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{
    CategoryProgressUpdate, CheckInRecord, CheckInSession, CheckInStatus, DraftNote, NotePrivacy,
};
use super::steps::Step;

/// Wizard state owned by one device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckInState {
    pub session: Option<CheckInSession>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl CheckInState {
    /// State before the persisted session has been looked up
    pub fn loading() -> Self {
        Self {
            session: None,
            is_loading: true,
            error: None,
        }
    }

    /// Whether a session that still accepts work is loaded
    pub fn has_active_session(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_terminal())
    }
}

/// Partial update for a draft note
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftNoteUpdate {
    pub content: Option<String>,
    pub privacy: Option<NotePrivacy>,
    pub category_id: Option<String>,
}

/// Every transition the wizard understands
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInAction {
    /// Begin a new session from a freshly created in-progress row
    StartCheckIn { record: CheckInRecord },
    /// Jump to a step; reachability is the caller's concern
    GoToStep(Step),
    /// Mark a step completed and advance to the step after it
    CompleteStep(Step),
    SetCategoryProgress {
        category_id: String,
        update: CategoryProgressUpdate,
    },
    AddDraftNote(DraftNote),
    UpdateDraftNote {
        id: String,
        update: DraftNoteUpdate,
    },
    RemoveDraftNote(String),
    /// Insert or replace a draft note by id (remote changes)
    UpsertDraftNote(DraftNote),
    /// Checkpoint marker: drafts have been flushed to persistence
    SaveSession,
    CompleteCheckIn {
        mood_after: Option<u8>,
        reflection: Option<String>,
    },
    AbandonCheckIn,
    RestoreSession(CheckInSession),
    /// Field-level merge of a row written by another device
    ApplyRemoteRecord(CheckInRecord),
    SetLoading(bool),
    SetError(Option<String>),
}

impl CheckInAction {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            CheckInAction::StartCheckIn { .. } => "START_CHECKIN",
            CheckInAction::GoToStep(_) => "GO_TO_STEP",
            CheckInAction::CompleteStep(_) => "COMPLETE_STEP",
            CheckInAction::SetCategoryProgress { .. } => "SET_CATEGORY_PROGRESS",
            CheckInAction::AddDraftNote(_) => "ADD_DRAFT_NOTE",
            CheckInAction::UpdateDraftNote { .. } => "UPDATE_DRAFT_NOTE",
            CheckInAction::RemoveDraftNote(_) => "REMOVE_DRAFT_NOTE",
            CheckInAction::UpsertDraftNote(_) => "UPSERT_DRAFT_NOTE",
            CheckInAction::SaveSession => "SAVE_SESSION",
            CheckInAction::CompleteCheckIn { .. } => "COMPLETE_CHECKIN",
            CheckInAction::AbandonCheckIn => "ABANDON_CHECKIN",
            CheckInAction::RestoreSession(_) => "RESTORE_SESSION",
            CheckInAction::ApplyRemoteRecord(_) => "APPLY_REMOTE_RECORD",
            CheckInAction::SetLoading(_) => "SET_LOADING",
            CheckInAction::SetError(_) => "SET_ERROR",
        }
    }
}

/// Apply `action` to `state` at wall-clock time `now`
///
/// # Examples
///
/// ```
/// use checkin::checkin::{reduce, CheckInAction, CheckInRecord, CheckInState, Step};
/// use chrono::Utc;
///
/// let now = Utc::now();
/// let record = CheckInRecord::in_progress("ci-1", "couple-1", vec!["communication".into()], now);
/// let state = reduce(CheckInState::default(), CheckInAction::StartCheckIn { record }, now);
/// let state = reduce(state, CheckInAction::CompleteStep(Step::Welcome), now);
///
/// let session = state.session.unwrap();
/// assert_eq!(session.progress.current_step, Step::CategorySelection);
/// assert!(session.progress.completed_steps.contains(&Step::Welcome));
/// ```
pub fn reduce(mut state: CheckInState, action: CheckInAction, now: DateTime<Utc>) -> CheckInState {
    match action {
        CheckInAction::StartCheckIn { record } => {
            if state.has_active_session() {
                return state;
            }
            state.session = Some(CheckInSession::new(record, now));
            state.error = None;
        }
        CheckInAction::GoToStep(step) => {
            if let Some(session) = state.session.as_mut() {
                session.progress.set_current(step);
                session.sync_step_fields();
            }
        }
        CheckInAction::CompleteStep(step) => {
            // Overwrites current_step even when `step` is not current.
            if let Some(session) = state.session.as_mut() {
                session.progress.completed_steps.insert(step);
                session.progress.set_current(step.next());
                session.sync_step_fields();
            }
        }
        CheckInAction::SetCategoryProgress {
            category_id,
            update,
        } => {
            if let Some(entry) = state.session.as_mut().and_then(|s| {
                s.category_progress
                    .iter_mut()
                    .find(|p| p.category_id == category_id)
            }) {
                entry.apply(&update, now);
            }
        }
        CheckInAction::AddDraftNote(note) => {
            if let Some(session) = state.session.as_mut() {
                session.draft_notes.push(note);
            }
        }
        CheckInAction::UpdateDraftNote { id, update } => {
            if let Some(note) = state
                .session
                .as_mut()
                .and_then(|s| s.draft_notes.iter_mut().find(|n| n.id == id))
            {
                if let Some(content) = update.content {
                    note.content = content;
                }
                if let Some(privacy) = update.privacy {
                    note.privacy = privacy;
                }
                if let Some(category_id) = update.category_id {
                    note.category_id = Some(category_id);
                }
                note.updated_at = now;
            }
        }
        CheckInAction::RemoveDraftNote(id) => {
            if let Some(session) = state.session.as_mut() {
                session.draft_notes.retain(|n| n.id != id);
            }
        }
        CheckInAction::UpsertDraftNote(note) => {
            if let Some(session) = state.session.as_mut() {
                if note.check_in_id != session.id {
                    return state;
                }
                match session.draft_notes.iter_mut().find(|n| n.id == note.id) {
                    // An older write must not replace a newer local edit.
                    Some(existing) if existing.updated_at > note.updated_at => {}
                    Some(existing) => *existing = note,
                    None => session.draft_notes.push(note),
                }
            }
        }
        CheckInAction::SaveSession => {
            if let Some(session) = state.session.as_mut() {
                session.last_saved_at = Some(now);
            }
        }
        CheckInAction::CompleteCheckIn {
            mood_after,
            reflection,
        } => {
            if let Some(session) = state.session.as_mut() {
                let record = &mut session.base_record;
                record.status = CheckInStatus::Completed;
                record.completed_at = Some(now);
                if mood_after.is_some() {
                    record.mood_after = mood_after;
                }
                if reflection.is_some() {
                    record.reflection = reflection;
                }
                session.progress.set_current(Step::Completion);
                session.sync_step_fields();
            }
        }
        CheckInAction::AbandonCheckIn => {
            state.session = None;
            state.error = None;
        }
        CheckInAction::RestoreSession(session) => {
            state.session = Some(session);
            state.is_loading = false;
        }
        CheckInAction::ApplyRemoteRecord(remote) => {
            let Some(session) = state.session.as_mut() else {
                return state;
            };
            if session.id != remote.id {
                return state;
            }
            if remote.status.is_terminal() {
                state.session = None;
                return state;
            }
            // Step fields stay local: an echoed older write must not move
            // navigation backwards.
            let record = &mut session.base_record;
            record.status = remote.status;
            record.completed_at = remote.completed_at;
            record.mood_before = remote.mood_before;
            record.mood_after = remote.mood_after;
            record.reflection = remote.reflection;
        }
        CheckInAction::SetLoading(loading) => {
            state.is_loading = loading;
        }
        CheckInAction::SetError(error) => {
            state.error = error;
        }
    }
    state
}
