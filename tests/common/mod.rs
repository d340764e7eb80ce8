//! Shared helpers for the integration tests.

#![allow(dead_code)]

use testkit_eventually::assertions::{MatchError, Matcher};
use testkit_eventually::clock::MockClock;
use testkit_eventually::mock::FailureRecorder;
use testkit_eventually::Poller;

pub const MATCH: &str = "match";
pub const NO_MATCH: &str = "no match";
pub const ERR_MATCH: &str = "err";

/// A poller on virtual time that records failures.
pub fn harness() -> (Poller, FailureRecorder, MockClock) {
    let recorder = FailureRecorder::new();
    let clock = MockClock::new();
    let poller = Poller::new()
        .with_failure_handler(recorder.clone())
        .with_clock(clock.clone());
    (poller, recorder, clock)
}

/// Matches `MATCH`, does not match `NO_MATCH`, errors on anything else.
pub struct TriStateMatcher;

pub fn tri_state() -> TriStateMatcher {
    TriStateMatcher
}

impl Matcher<&'static str> for TriStateMatcher {
    fn matches(&self, actual: &&'static str) -> Result<bool, MatchError> {
        match *actual {
            MATCH => Ok(true),
            NO_MATCH => Ok(false),
            _ => Err(MatchError::new("tri-state matcher error")),
        }
    }

    fn failure_message(&self, actual: &&'static str) -> String {
        format!("positive: {actual}")
    }

    fn negated_failure_message(&self, actual: &&'static str) -> String {
        format!("negative: {actual}")
    }
}
