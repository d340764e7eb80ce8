//! Poller configuration and the shared global poller.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::warn;

use super::assertion::AsyncAssertion;
use super::probe::IntoProbe;
use super::report::{FailureHandler, PanicFailureHandler};
use super::scheduler::Kind;
use crate::clock::{Clock, SystemClock};
use crate::error::{parse_duration, Result};

/// Environment variable overriding [`Defaults::eventually_timeout`].
pub const EVENTUALLY_TIMEOUT_VAR: &str = "TESTKIT_EVENTUALLY_TIMEOUT";
/// Environment variable overriding [`Defaults::eventually_polling_interval`].
pub const EVENTUALLY_POLLING_INTERVAL_VAR: &str = "TESTKIT_EVENTUALLY_POLLING_INTERVAL";
/// Environment variable overriding [`Defaults::consistently_duration`].
pub const CONSISTENTLY_DURATION_VAR: &str = "TESTKIT_CONSISTENTLY_DURATION";
/// Environment variable overriding [`Defaults::consistently_polling_interval`].
pub const CONSISTENTLY_POLLING_INTERVAL_VAR: &str = "TESTKIT_CONSISTENTLY_POLLING_INTERVAL";

/// Timeouts and intervals used when an assertion sets none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    /// How long `eventually` polls. 1s.
    pub eventually_timeout: Duration,
    /// Pause between `eventually` attempts. 10ms.
    pub eventually_polling_interval: Duration,
    /// How long `consistently` polls. 100ms.
    pub consistently_duration: Duration,
    /// Pause between `consistently` attempts. 10ms.
    pub consistently_polling_interval: Duration,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            eventually_timeout: Duration::from_secs(1),
            eventually_polling_interval: Duration::from_millis(10),
            consistently_duration: Duration::from_millis(100),
            consistently_polling_interval: Duration::from_millis(10),
        }
    }
}

impl Defaults {
    /// The defaults, overridden by any `TESTKIT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDuration`](crate::Error::InvalidDuration)
    /// when a variable holds something other than a duration.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use testkit_eventually::Defaults;
    ///
    /// let defaults = Defaults::from_lookup(|name| {
    ///     (name == "TESTKIT_EVENTUALLY_TIMEOUT").then(|| String::from("2s"))
    /// })
    /// .unwrap();
    /// assert_eq!(defaults.eventually_timeout, Duration::from_secs(2));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDuration`](crate::Error::InvalidDuration)
    /// when a variable holds something other than a duration.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut defaults = Self::default();
        let fields = [
            (EVENTUALLY_TIMEOUT_VAR, &mut defaults.eventually_timeout),
            (
                EVENTUALLY_POLLING_INTERVAL_VAR,
                &mut defaults.eventually_polling_interval,
            ),
            (CONSISTENTLY_DURATION_VAR, &mut defaults.consistently_duration),
            (
                CONSISTENTLY_POLLING_INTERVAL_VAR,
                &mut defaults.consistently_polling_interval,
            ),
        ];
        for (variable, field) in fields {
            if let Some(raw) = lookup(variable) {
                *field = parse_duration(variable, raw.trim())?;
            }
        }
        Ok(defaults)
    }

    fn for_kind(&self, kind: Kind) -> (Duration, Duration) {
        match kind {
            Kind::Eventually => (self.eventually_timeout, self.eventually_polling_interval),
            Kind::Consistently => (
                self.consistently_duration,
                self.consistently_polling_interval,
            ),
        }
    }
}

/// Builds assertions that share defaults, a failure handler and a clock.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use testkit_eventually::assertions::eq;
/// use testkit_eventually::clock::MockClock;
/// use testkit_eventually::mock::FailureRecorder;
/// use testkit_eventually::Poller;
///
/// let recorder = FailureRecorder::new();
/// let poller = Poller::new()
///     .with_failure_handler(recorder.clone())
///     .with_clock(MockClock::new());
///
/// let passed = poller
///     .eventually(|| "pending")
///     .with_timeout(Duration::from_secs(60))
///     .should(eq("done"));
///
/// assert!(!passed);
/// assert!(recorder.message().starts_with("Timed out after 60.000s."));
/// ```
#[derive(Clone)]
pub struct Poller {
    defaults: Defaults,
    handler: Arc<dyn FailureHandler>,
    clock: Arc<dyn Clock>,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

impl Poller {
    /// A poller with the built-in defaults that panics on failure and uses
    /// the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            defaults: Defaults::default(),
            handler: Arc::new(PanicFailureHandler),
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Replace the defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Send failures to `handler`.
    #[must_use]
    pub fn with_failure_handler(mut self, handler: impl FailureHandler + 'static) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    /// Measure time and sleep with `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The defaults in use.
    #[must_use]
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Poll `actual` until the matcher passes.
    pub fn eventually<'a, M, P>(&self, actual: P) -> AsyncAssertion<'a, P::Value>
    where
        P: IntoProbe<'a, M>,
    {
        self.assertion(Kind::Eventually, actual)
    }

    /// Poll `actual` and require the matcher to pass every time.
    pub fn consistently<'a, M, P>(&self, actual: P) -> AsyncAssertion<'a, P::Value>
    where
        P: IntoProbe<'a, M>,
    {
        self.assertion(Kind::Consistently, actual)
    }

    fn assertion<'a, M, P>(&self, kind: Kind, actual: P) -> AsyncAssertion<'a, P::Value>
    where
        P: IntoProbe<'a, M>,
    {
        AsyncAssertion::new(
            kind,
            actual.into_probe(),
            self.defaults.for_kind(kind),
            Arc::clone(&self.handler),
            Arc::clone(&self.clock),
        )
    }
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("defaults", &self.defaults)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// The poller behind [`eventually`](crate::eventually) and
/// [`consistently`](crate::consistently), built on first use from the
/// environment.
pub fn global() -> &'static Poller {
    static GLOBAL: OnceLock<Poller> = OnceLock::new();
    GLOBAL.get_or_init(|| {
        let defaults = Defaults::from_env().unwrap_or_else(|err| {
            warn!(error = %err, "ignoring invalid polling defaults from the environment");
            Defaults::default()
        });
        Poller::new().with_defaults(defaults)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_default_durations() {
        let defaults = Defaults::default();
        assert_eq!(defaults.eventually_timeout, Duration::from_secs(1));
        assert_eq!(defaults.eventually_polling_interval, Duration::from_millis(10));
        assert_eq!(defaults.consistently_duration, Duration::from_millis(100));
        assert_eq!(defaults.consistently_polling_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_lookup_overrides() {
        let defaults = Defaults::from_lookup(|name| match name {
            EVENTUALLY_POLLING_INTERVAL_VAR => Some(String::from("250ms")),
            CONSISTENTLY_DURATION_VAR => Some(String::from(" 1.5s ")),
            _ => None,
        })
        .unwrap();
        assert_eq!(defaults.eventually_timeout, Duration::from_secs(1));
        assert_eq!(defaults.eventually_polling_interval, Duration::from_millis(250));
        assert_eq!(defaults.consistently_duration, Duration::from_millis(1500));
    }

    #[test]
    fn test_lookup_rejects_garbage() {
        let err = Defaults::from_lookup(|name| {
            (name == CONSISTENTLY_POLLING_INTERVAL_VAR).then(|| String::from("soon"))
        })
        .unwrap_err();
        assert_eq!(
            err,
            Error::invalid_duration(CONSISTENTLY_POLLING_INTERVAL_VAR, "soon")
        );
    }

    #[test]
    fn test_kind_selects_defaults() {
        let defaults = Defaults::default();
        assert_eq!(
            defaults.for_kind(Kind::Consistently),
            (Duration::from_millis(100), Duration::from_millis(10))
        );
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(global(), global()));
    }
}
