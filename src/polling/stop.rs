//! Early-termination signal for probes.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Tells the polling loop to stop retrying.
///
/// A probe can hand a `StopTrying` back as its value (or as one of its
/// [`Returns`](super::Returns) extras). The attempt is still judged: a
/// matching value passes, otherwise the assertion fails at once with the
/// signal's reason in front of the message.
///
/// Calling [`now`](Self::now) instead raises the signal from anywhere inside
/// the probe. Nothing is judged for that attempt and the previous attempt's
/// verdict stands.
///
/// # Example
///
/// ```rust
/// use testkit_eventually::prelude::*;
/// use testkit_eventually::mock::FailureRecorder;
/// use testkit_eventually::Poller;
///
/// let recorder = FailureRecorder::new();
/// let poller = Poller::new().with_failure_handler(recorder.clone());
///
/// let mut attempts = 0;
/// let passed = poller
///     .eventually(move || {
///         attempts += 1;
///         if attempts == 3 {
///             StopTrying::new("giving up").now();
///         }
///         attempts
///     })
///     .should(eq(10));
///
/// assert!(!passed);
/// assert!(recorder.message().starts_with("giving up - after"));
/// ```
#[derive(Clone)]
pub struct StopTrying {
    reason: Reason,
    immediate: bool,
}

#[derive(Clone)]
enum Reason {
    Text(String),
    Lazy(Arc<dyn Fn() -> String + Send + Sync>),
}

impl StopTrying {
    /// A stop signal with a fixed reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: Reason::Text(reason.into()),
            immediate: false,
        }
    }

    /// A stop signal whose reason is rendered only if a message is built.
    ///
    /// See also [`stop_trying!`](crate::stop_trying).
    pub fn lazy(reason: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            reason: Reason::Lazy(Arc::new(reason)),
            immediate: false,
        }
    }

    /// Marks the signal as immediate.
    #[must_use]
    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    /// Whether the signal was marked immediate.
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// Renders the reason.
    #[must_use]
    pub fn reason(&self) -> String {
        match &self.reason {
            Reason::Text(text) => text.clone(),
            Reason::Lazy(render) => render(),
        }
    }

    /// Raises the signal, abandoning the current attempt.
    ///
    /// The signal unwinds out of the probe and is caught by the polling loop.
    /// Outside a probe it behaves like an uncaught panic.
    pub fn now(self) -> ! {
        std::panic::resume_unwind(Box::new(self.immediate()))
    }
}

impl fmt::Debug for StopTrying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopTrying")
            .field("reason", &self.reason())
            .field("immediate", &self.immediate)
            .finish()
    }
}

impl fmt::Display for StopTrying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

impl std::error::Error for StopTrying {}

/// Build a [`StopTrying`](crate::polling::StopTrying) with a lazily
/// formatted reason.
///
/// Arguments are captured by move and formatted only when a failure message
/// is rendered.
///
/// ```rust
/// use testkit_eventually::stop_trying;
///
/// let attempt = 3;
/// let stop = stop_trying!("gave up after {} attempts", attempt);
/// assert_eq!(stop.reason(), "gave up after 3 attempts");
/// ```
#[macro_export]
macro_rules! stop_trying {
    ($($arg:tt)+) => {
        $crate::polling::StopTrying::lazy(move || ::std::format!($($arg)+))
    };
}

/// Recognises a stop signal carried by a returned value.
pub(crate) fn find_stop_signal(value: &dyn Any) -> Option<StopTrying> {
    if let Some(stop) = value.downcast_ref::<StopTrying>() {
        return Some(stop.clone());
    }
    if let Some(Some(stop)) = value.downcast_ref::<Option<StopTrying>>() {
        return Some(stop.clone());
    }
    if let Some(Err(stop)) = value.downcast_ref::<Result<(), StopTrying>>() {
        return Some(stop.clone());
    }
    None
}
