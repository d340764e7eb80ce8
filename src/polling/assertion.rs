//! The assertion builder returned by `eventually` and `consistently`.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::evaluate::Direction;
use super::probe::{Argument, Probe};
use super::report::{
    self, Description, Failure, FailureHandler, CONFIGURATION_FAILURE_SKIP, POLLING_FAILURE_SKIP,
};
use super::scheduler::{self, Kind, Outcome, Schedule};
use crate::assertions::Matcher;
use crate::clock::Clock;
use crate::context::Context;
use crate::error::Error;

/// A configured asynchronous assertion.
///
/// Built by [`Poller::eventually`](super::Poller::eventually) or
/// [`Poller::consistently`](super::Poller::consistently); finished by one of
/// the `should` methods, which poll the probe and return whether the
/// assertion held. Failures go to the poller's failure handler.
#[must_use = "an assertion does nothing until `should` or `should_not` is called"]
pub struct AsyncAssertion<'a, T> {
    kind: Kind,
    probe: Probe<'a, T>,
    timeout: Option<Duration>,
    interval: Option<Duration>,
    default_timeout: Duration,
    default_interval: Duration,
    context: Option<Context>,
    arguments: Vec<Argument>,
    handler: Arc<dyn FailureHandler>,
    clock: Arc<dyn Clock>,
}

impl<'a, T: 'static> AsyncAssertion<'a, T> {
    pub(crate) fn new(
        kind: Kind,
        probe: Probe<'a, T>,
        (default_timeout, default_interval): (Duration, Duration),
        handler: Arc<dyn FailureHandler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            kind,
            probe,
            timeout: None,
            interval: None,
            default_timeout,
            default_interval,
            context: None,
            arguments: Vec::new(),
            handler,
            clock,
        }
    }

    /// Give up (or, for `consistently`, stop checking) after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait `interval` between attempts.
    pub fn with_polling(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Like [`with_timeout`](Self::with_timeout), but only if no non-zero
    /// timeout was set yet.
    pub fn within(mut self, timeout: Duration) -> Self {
        if is_unset(self.timeout) {
            self.timeout = Some(timeout);
        }
        self
    }

    /// Like [`with_polling`](Self::with_polling), but only if no non-zero
    /// interval was set yet.
    pub fn probe_every(mut self, interval: Duration) -> Self {
        if is_unset(self.interval) {
            self.interval = Some(interval);
        }
        self
    }

    /// Stop polling when `context` is done, and hand it to probes that take
    /// a [`Context`].
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Arguments forwarded to the probe on every attempt, replacing any set
    /// before. See [`args!`](crate::args).
    pub fn with_arguments(mut self, arguments: Vec<Argument>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Assert that the probe's value matches.
    #[track_caller]
    pub fn should<M: Matcher<T>>(self, matcher: M) -> bool {
        self.finish(&matcher, Direction::Positive, None, Location::caller())
    }

    /// Assert that the probe's value does not match.
    #[track_caller]
    pub fn should_not<M: Matcher<T>>(self, matcher: M) -> bool {
        self.finish(&matcher, Direction::Negative, None, Location::caller())
    }

    /// [`should`](Self::should) with a description printed above the
    /// failure reason.
    #[track_caller]
    pub fn should_with<M: Matcher<T>>(self, matcher: M, description: impl Into<Description>) -> bool {
        self.finish(
            &matcher,
            Direction::Positive,
            Some(description.into()),
            Location::caller(),
        )
    }

    /// [`should_not`](Self::should_not) with a description printed above the
    /// failure reason.
    #[track_caller]
    pub fn should_not_with<M: Matcher<T>>(
        self,
        matcher: M,
        description: impl Into<Description>,
    ) -> bool {
        self.finish(
            &matcher,
            Direction::Negative,
            Some(description.into()),
            Location::caller(),
        )
    }

    fn finish<M: Matcher<T>>(
        mut self,
        matcher: &M,
        direction: Direction,
        description: Option<Description>,
        location: &'static Location<'static>,
    ) -> bool {
        let name = self.kind.name();
        if let Err(err) = self
            .probe
            .validate(name, self.context.as_ref(), &self.arguments)
        {
            self.reject(&err, location);
            return false;
        }

        let schedule = Schedule {
            kind: self.kind,
            direction,
            timeout: self.timeout.unwrap_or(self.default_timeout),
            interval: self
                .interval
                .filter(|interval| !interval.is_zero())
                .unwrap_or(self.default_interval),
            context: self.context.as_ref(),
            arguments: &self.arguments,
            clock: self.clock.as_ref(),
        };

        match scheduler::run(&mut self.probe, matcher, &schedule) {
            Ok(Outcome::Succeeded) => true,
            Ok(Outcome::Failed {
                termination,
                reason,
                elapsed,
            }) => {
                let message = report::render(&termination, elapsed, description.as_ref(), &reason);
                self.handler.fail(Failure {
                    message,
                    caller_skip: POLLING_FAILURE_SKIP,
                    location,
                });
                false
            }
            Err(err) => {
                self.reject(&err, location);
                false
            }
        }
    }

    fn reject(&self, err: &Error, location: &'static Location<'static>) {
        warn!(kind = self.kind.name(), error = %err, "assertion is misconfigured");
        self.handler.fail(Failure {
            message: err.to_string(),
            caller_skip: CONFIGURATION_FAILURE_SKIP,
            location,
        });
    }
}

fn is_unset(duration: Option<Duration>) -> bool {
    duration.map_or(true, |d| d.is_zero())
}

impl<T> fmt::Debug for AsyncAssertion<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAssertion")
            .field("kind", &self.kind)
            .field("probe", &self.probe)
            .field("timeout", &self.timeout)
            .field("interval", &self.interval)
            .field("context", &self.context)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}
