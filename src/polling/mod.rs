//! The polling engine.
//!
//! An assertion is built from a probe (see [`IntoProbe`]) by
//! [`Poller::eventually`] or [`Poller::consistently`], configured with the
//! [`AsyncAssertion`] builder and run by one of its `should` methods:
//!
//! 1. the probe's shape is checked against the configured context and
//!    forwarded arguments; a mismatch is reported once and nothing runs;
//! 2. the probe is invoked immediately and then once per polling interval;
//! 3. each attempt is judged by the matcher, with extra values required to
//!    be zero and stop signals honoured;
//! 4. the run ends on success, timeout, cancellation, a stop signal or a
//!    matcher's "no future change" hint, and a failure message is handed to
//!    the [`FailureHandler`].
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use testkit_eventually::prelude::*;
//! use testkit_eventually::clock::MockClock;
//! use testkit_eventually::mock::FailureRecorder;
//! use testkit_eventually::Poller;
//!
//! let recorder = FailureRecorder::new();
//! let poller = Poller::new()
//!     .with_failure_handler(recorder.clone())
//!     .with_clock(MockClock::new());
//!
//! let mut queue = vec![3, 2, 1];
//! let passed = poller
//!     .eventually(|| queue.pop())
//!     .with_timeout(Duration::from_secs(5))
//!     .should(eq(Some(3)));
//!
//! assert!(passed);
//! assert!(recorder.is_empty());
//! ```

mod assertion;
mod checker;
mod evaluate;
mod poller;
mod probe;
mod report;
mod scheduler;
mod stop;
mod zero;

pub use assertion::AsyncAssertion;
pub use checker::{CallbackFailure, CallbackOutcome, Checker, Expectation};
pub use poller::{
    global, Defaults, Poller, CONSISTENTLY_DURATION_VAR, CONSISTENTLY_POLLING_INTERVAL_VAR,
    EVENTUALLY_POLLING_INTERVAL_VAR, EVENTUALLY_TIMEOUT_VAR,
};
pub use probe::{
    markers, Arg, Argument, Forwarded, IntoProbe, ParamKind, ParamSource, Parts, Probe, ProbeOutput,
    ProbeParam, ProbeShape, Rest, ReturnShape, Returns,
};
pub use report::{
    Description, Failure, FailureHandler, PanicFailureHandler, CONFIGURATION_FAILURE_SKIP,
    POLLING_FAILURE_SKIP,
};
pub use stop::StopTrying;
pub use zero::{Extra, IsZero};
