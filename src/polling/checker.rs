//! In-probe expectations.
//!
//! A probe whose first parameter is a [`Checker`] can make expectations of
//! its own. The first failing expectation aborts the probe and becomes the
//! attempt's error; the polling loop then tries again on the next tick.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::assertions::Matcher;

/// A failed expectation inside a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    message: String,
    file: &'static str,
    line: u32,
}

impl CallbackFailure {
    /// Create a failure raised at `file:line`.
    pub fn new(message: impl Into<String>, file: &'static str, line: u32) -> Self {
        Self {
            message: message.into(),
            file,
            line,
        }
    }

    fn at(message: String, location: &'static Location<'static>) -> Self {
        Self::new(message, location.file(), location.line())
    }

    /// The matcher's failure text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Source file of the failed expectation.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Line of the failed expectation.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Assertion in callback at {}:{} failed:\n{}",
            self.file, self.line, self.message
        )
    }
}

impl std::error::Error for CallbackFailure {}

/// The outcome of a probe that returns nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Every expectation held.
    Passed,
    /// An expectation failed.
    Failed(CallbackFailure),
}

impl CallbackOutcome {
    /// Whether the callback passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// The failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&CallbackFailure> {
        match self {
            Self::Passed => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

impl From<Option<CallbackFailure>> for CallbackOutcome {
    fn from(failure: Option<CallbackFailure>) -> Self {
        failure.map_or(Self::Passed, Self::Failed)
    }
}

/// Unwind payload of an aborted probe.
pub(crate) struct CheckerAbort;

/// Records expectations made inside a probe.
///
/// Clones share the same failure slot.
///
/// # Example
///
/// ```rust
/// use testkit_eventually::prelude::*;
/// use testkit_eventually::clock::MockClock;
/// use testkit_eventually::mock::FailureRecorder;
/// use testkit_eventually::Poller;
///
/// let recorder = FailureRecorder::new();
/// let poller = Poller::new()
///     .with_failure_handler(recorder.clone())
///     .with_clock(MockClock::new());
///
/// let mut reads = 0;
/// let passed = poller
///     .eventually(|g: Checker| {
///         reads += 1;
///         g.expect(reads).to(gte(3));
///     })
///     .should(succeed());
///
/// assert!(passed);
/// assert_eq!(reads, 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Checker {
    failure: Arc<Mutex<Option<CallbackFailure>>>,
}

impl Checker {
    /// Create a checker with an empty failure slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an expectation about `actual`.
    #[track_caller]
    pub fn expect<T>(&self, actual: T) -> Expectation<'_, T> {
        Expectation {
            checker: self,
            actual,
            location: Location::caller(),
        }
    }

    /// Fail the current attempt with `message`.
    #[track_caller]
    pub fn fail(&self, message: impl Into<String>) -> ! {
        self.abort(CallbackFailure::at(message.into(), Location::caller()))
    }

    /// The recorded failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<CallbackFailure> {
        self.failure.lock().clone()
    }

    pub(crate) fn reset(&self) {
        *self.failure.lock() = None;
    }

    pub(crate) fn take_failure(&self) -> Option<CallbackFailure> {
        self.failure.lock().take()
    }

    fn abort(&self, failure: CallbackFailure) -> ! {
        {
            let mut slot = self.failure.lock();
            if slot.is_none() {
                *slot = Some(failure);
            }
        }
        std::panic::resume_unwind(Box::new(CheckerAbort))
    }
}

/// An expectation started by [`Checker::expect`].
#[must_use = "an expectation does nothing until `to` or `not_to` is called"]
pub struct Expectation<'a, T> {
    checker: &'a Checker,
    actual: T,
    location: &'static Location<'static>,
}

impl<T> Expectation<'_, T> {
    /// Require `matcher` to match.
    pub fn to<M: Matcher<T>>(self, matcher: M) {
        self.check(&matcher, true);
    }

    /// Require `matcher` not to match.
    pub fn not_to<M: Matcher<T>>(self, matcher: M) {
        self.check(&matcher, false);
    }

    fn check<M: Matcher<T>>(self, matcher: &M, positive: bool) {
        let message = match matcher.matches(&self.actual) {
            Ok(matched) if matched == positive => return,
            Ok(_) if positive => matcher.failure_message(&self.actual),
            Ok(_) => matcher.negated_failure_message(&self.actual),
            Err(err) => err.to_string(),
        };
        self.checker.abort(CallbackFailure::at(message, self.location));
    }
}
