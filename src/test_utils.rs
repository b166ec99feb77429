//! Test utilities
//!
//! Fixed-time helpers and assertion helpers shared by unit tests.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use crate::timer::ManualClock;

/// A fixed instant used wherever a test needs "now"
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 19, 30, 0)
        .single()
        .expect("valid fixed time")
}

/// A manual clock starting at [`fixed_time`]
pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at(fixed_time()))
}

/// Assert that an error's message chain contains the expected text
///
/// # Panics
///
/// Panics if no message in the chain contains `expected`
pub fn assert_error_contains(err: &anyhow::Error, expected: &str) {
    let message = format!("{:#}", err);
    assert!(
        message.contains(expected),
        "Error message '{}' does not contain '{}'",
        message,
        expected
    );
}
