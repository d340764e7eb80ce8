#![allow(clippy::must_use_candidate)]

//! Matchers for success and failure.
//!
//! A probe that takes a [`Checker`](crate::polling::Checker) and returns
//! nothing is judged on its own outcome: [`succeed`] passes when no
//! expectation inside it failed, [`fail_with`] when one failed with a message
//! the inner matcher accepts. Both also judge plain `Result` values.

use std::fmt::{Debug, Display};

use super::matcher::{expectation_of, MatchError, Matcher};
use crate::format::INDENT;
use crate::polling::CallbackOutcome;

/// Create a matcher for a clean callback or an `Ok` result.
///
/// ```rust
/// use testkit_eventually::assertions::{succeed, Matcher};
///
/// assert_eq!(succeed().matches(&Ok::<u8, String>(1)), Ok(true));
/// assert_eq!(succeed().matches(&Err::<u8, String>("boom".into())), Ok(false));
/// ```
pub fn succeed() -> Succeed {
    Succeed
}

/// Matcher returned by [`succeed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Succeed;

const NO_ERROR: &str = "Expected failure, but got no error.";

impl Matcher<CallbackOutcome> for Succeed {
    fn matches(&self, actual: &CallbackOutcome) -> Result<bool, MatchError> {
        Ok(actual.is_passed())
    }

    fn failure_message(&self, actual: &CallbackOutcome) -> String {
        match actual {
            CallbackOutcome::Failed(failure) => {
                format!("Expected success, but got an error:\n{INDENT}{failure}")
            }
            CallbackOutcome::Passed => String::from("Expected success"),
        }
    }

    fn negated_failure_message(&self, _actual: &CallbackOutcome) -> String {
        String::from(NO_ERROR)
    }
}

impl Matcher<()> for Succeed {
    fn matches(&self, _actual: &()) -> Result<bool, MatchError> {
        Ok(true)
    }

    fn failure_message(&self, _actual: &()) -> String {
        String::from("Expected success")
    }

    fn negated_failure_message(&self, _actual: &()) -> String {
        String::from(NO_ERROR)
    }

    fn as_callback_matcher(&self) -> Option<&dyn Matcher<CallbackOutcome>> {
        Some(self)
    }
}

impl<V: Debug, E: Display> Matcher<Result<V, E>> for Succeed {
    fn matches(&self, actual: &Result<V, E>) -> Result<bool, MatchError> {
        Ok(actual.is_ok())
    }

    fn failure_message(&self, actual: &Result<V, E>) -> String {
        match actual {
            Ok(value) => expectation_of(value, "to be a success"),
            Err(err) => format!("Expected success, but got an error:\n{INDENT}{err}"),
        }
    }

    fn negated_failure_message(&self, _actual: &Result<V, E>) -> String {
        String::from(NO_ERROR)
    }
}

/// Create a matcher for a failed callback (or an `Err`) whose message
/// satisfies `matcher`.
///
/// A callback failure renders as
/// `Assertion in callback at <file>:<line> failed:\n<message>`, so substring
/// matchers are the usual choice.
///
/// ```rust
/// use testkit_eventually::assertions::{contains_str, fail_with, Matcher};
///
/// let m = fail_with(contains_str("refused"));
/// assert_eq!(m.matches(&Err::<(), _>("connection refused")), Ok(true));
/// assert_eq!(m.matches(&Ok::<(), &str>(())), Ok(false));
/// ```
pub fn fail_with<M: Matcher<String>>(matcher: M) -> FailWith<M> {
    FailWith { matcher }
}

/// Matcher returned by [`fail_with`].
#[derive(Debug, Clone)]
pub struct FailWith<M> {
    matcher: M,
}

const PASSED: &str = "Expected an error, but the callback passed.";

impl<M: Matcher<String>> FailWith<M> {
    fn judge(&self, message: Option<String>) -> Result<bool, MatchError> {
        message.map_or(Ok(false), |message| self.matcher.matches(&message))
    }

    fn explain(&self, message: Option<String>, negated: bool) -> String {
        match message {
            None => String::from(PASSED),
            Some(message) if negated => self.matcher.negated_failure_message(&message),
            Some(message) => self.matcher.failure_message(&message),
        }
    }
}

impl<M: Matcher<String>> Matcher<CallbackOutcome> for FailWith<M> {
    fn matches(&self, actual: &CallbackOutcome) -> Result<bool, MatchError> {
        self.judge(actual.failure().map(ToString::to_string))
    }

    fn failure_message(&self, actual: &CallbackOutcome) -> String {
        self.explain(actual.failure().map(ToString::to_string), false)
    }

    fn negated_failure_message(&self, actual: &CallbackOutcome) -> String {
        self.explain(actual.failure().map(ToString::to_string), true)
    }
}

impl<M: Matcher<String>> Matcher<()> for FailWith<M> {
    fn matches(&self, _actual: &()) -> Result<bool, MatchError> {
        Ok(false)
    }

    fn failure_message(&self, _actual: &()) -> String {
        String::from(PASSED)
    }

    fn negated_failure_message(&self, _actual: &()) -> String {
        String::from(PASSED)
    }

    fn as_callback_matcher(&self) -> Option<&dyn Matcher<CallbackOutcome>> {
        Some(self)
    }
}

impl<V, E, M> Matcher<Result<V, E>> for FailWith<M>
where
    E: Display,
    M: Matcher<String>,
{
    fn matches(&self, actual: &Result<V, E>) -> Result<bool, MatchError> {
        self.judge(actual.as_ref().err().map(ToString::to_string))
    }

    fn failure_message(&self, actual: &Result<V, E>) -> String {
        self.explain(actual.as_ref().err().map(ToString::to_string), false)
    }

    fn negated_failure_message(&self, actual: &Result<V, E>) -> String {
        self.explain(actual.as_ref().err().map(ToString::to_string), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::contains_str;
    use crate::polling::CallbackFailure;

    fn failed(message: &str) -> CallbackOutcome {
        CallbackOutcome::Failed(CallbackFailure::new(message, "probe.rs", 12))
    }

    #[test]
    fn test_succeed_on_outcomes() {
        assert_eq!(succeed().matches(&CallbackOutcome::Passed), Ok(true));
        assert_eq!(succeed().matches(&failed("nope")), Ok(false));
        assert_eq!(
            succeed().failure_message(&failed("nope")),
            "Expected success, but got an error:\n    Assertion in callback at probe.rs:12 failed:\nnope"
        );
    }

    #[test]
    fn test_succeed_exposes_callback_matcher() {
        let m = succeed();
        assert!(Matcher::<()>::as_callback_matcher(&m).is_some());
        assert!(Matcher::<i32>::as_callback_matcher(&crate::assertions::eq(1)).is_none());
    }

    #[test]
    fn test_fail_with_matches_callback_text() {
        let m = fail_with(contains_str("to equal"));
        assert_eq!(m.matches(&failed("Expected 1 to equal 2")), Ok(true));
        assert_eq!(m.matches(&failed("something else")), Ok(false));
        assert_eq!(m.matches(&CallbackOutcome::Passed), Ok(false));
        assert_eq!(m.failure_message(&CallbackOutcome::Passed), PASSED);
    }

    #[test]
    fn test_fail_with_on_results() {
        let m = fail_with(contains_str("boom"));
        assert_eq!(m.matches(&Err::<(), String>("boom!".into())), Ok(true));
        assert_eq!(m.matches(&Ok::<(), String>(())), Ok(false));
    }
}
