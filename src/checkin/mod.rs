//! Guided check-in engine
//!
//! The engine is split into a pure core and an orchestrating shell:
//!
//! - [`steps`]: the fixed, ordered step sequence
//! - [`session`]: the session aggregate and its persisted row
//! - [`reducer`]: a pure `reduce(state, action, now)` over a closed action enum
//! - [`context`]: [`CheckInContext`], which applies actions locally first and
//!   persists afterwards
//!
//! # Examples
//!
//! ```
//! use chrono::Utc;
//! use checkin::checkin::{reduce, CheckInAction, CheckInRecord, CheckInState, Step};
//!
//! let record = CheckInRecord::in_progress("ci-1", "c-1", vec!["communication".into()], Utc::now());
//! let state = reduce(CheckInState::default(), CheckInAction::StartCheckIn { record }, Utc::now());
//! let state = reduce(state, CheckInAction::CompleteStep(Step::Welcome), Utc::now());
//!
//! let session = state.session.unwrap();
//! assert_eq!(session.progress.current_step, Step::CategorySelection);
//! assert_eq!(session.progress.percentage, 20);
//! ```

pub mod context;
pub mod reducer;
pub mod session;
pub mod steps;

pub use context::CheckInContext;
pub use reducer::{reduce, CheckInAction, CheckInState, DraftNoteUpdate};
pub use session::{
    CategoryProgress, CategoryProgressUpdate, CheckInRecord, CheckInSession, CheckInStatus,
    DraftNote, NotePrivacy, SessionProgress,
};
pub use steps::{Step, STEP_SEQUENCE, TOTAL_STEPS};
