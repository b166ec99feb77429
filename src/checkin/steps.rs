//! The fixed, ordered sequence of guided check-in steps
//!
//! Order defines both displayed progress and the bounds of legal navigation.
//! `next`/`previous` saturate at the ends; nothing here wraps or panics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CheckInError;

/// One stage of the guided conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Welcome,
    CategorySelection,
    CategoryDiscussion,
    Reflection,
    ActionItems,
    Completion,
}

/// Every step, in sequence order
pub const STEP_SEQUENCE: [Step; 6] = [
    Step::Welcome,
    Step::CategorySelection,
    Step::CategoryDiscussion,
    Step::Reflection,
    Step::ActionItems,
    Step::Completion,
];

/// Number of steps in the sequence
pub const TOTAL_STEPS: usize = STEP_SEQUENCE.len();

impl Step {
    /// Wire token for this step (`"category-selection"`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Welcome => "welcome",
            Step::CategorySelection => "category-selection",
            Step::CategoryDiscussion => "category-discussion",
            Step::Reflection => "reflection",
            Step::ActionItems => "action-items",
            Step::Completion => "completion",
        }
    }

    /// Human readable title
    pub fn title(&self) -> &'static str {
        match self {
            Step::Welcome => "Welcome",
            Step::CategorySelection => "Choose Topics",
            Step::CategoryDiscussion => "Discussion",
            Step::Reflection => "Reflection",
            Step::ActionItems => "Action Items",
            Step::Completion => "Complete",
        }
    }

    /// Position of this step in [`STEP_SEQUENCE`]
    pub fn index(self) -> usize {
        STEP_SEQUENCE
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    /// Whether this is the final step
    pub fn is_last(self) -> bool {
        self.index() == TOTAL_STEPS - 1
    }

    /// The following step, or `self` at the end of the sequence
    pub fn next(self) -> Step {
        STEP_SEQUENCE
            .get(self.index() + 1)
            .copied()
            .unwrap_or(self)
    }

    /// The preceding step, or `self` at the start of the sequence
    pub fn previous(self) -> Step {
        match self.index() {
            0 => self,
            i => STEP_SEQUENCE[i - 1],
        }
    }

    /// Progress through the sequence when this step is current, `0..=100`
    ///
    /// ```
    /// use checkin::checkin::Step;
    ///
    /// assert_eq!(Step::Welcome.percentage(), 0);
    /// assert_eq!(Step::CategoryDiscussion.percentage(), 40);
    /// assert_eq!(Step::Completion.percentage(), 100);
    /// ```
    pub fn percentage(self) -> u8 {
        let pct = (self.index() as f64 / (TOTAL_STEPS - 1) as f64) * 100.0;
        pct.round().clamp(0.0, 100.0) as u8
    }
}

/// Index of a step token in the sequence, or `-1` when the token is not a step
///
/// Callers treat `-1` as "cannot navigate".
///
/// ```
/// use checkin::checkin::steps::step_index;
///
/// assert_eq!(step_index("welcome"), 0);
/// assert_eq!(step_index("completion"), 5);
/// assert_eq!(step_index("dessert"), -1);
/// ```
pub fn step_index(token: &str) -> i32 {
    token
        .parse::<Step>()
        .map(|s| s.index() as i32)
        .unwrap_or(-1)
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = CheckInError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STEP_SEQUENCE
            .iter()
            .find(|step| step.as_str() == s)
            .copied()
            .ok_or_else(|| CheckInError::Navigation(format!("unknown step: {}", s)))
    }
}
