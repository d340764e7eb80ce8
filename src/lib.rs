//! # testkit-eventually
//!
//! > Assertions that wait: poll a probe until a matcher holds
//!
//! **testkit-eventually** runs `eventually` and `consistently` assertions.
//! A probe (a value or a closure) is evaluated immediately and then once per
//! polling interval; the matcher decides whether each attempt passes.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//! use testkit_eventually::prelude::*;
//!
//! let ready = Arc::new(AtomicUsize::new(0));
//! let worker = Arc::clone(&ready);
//! thread::spawn(move || {
//!     thread::sleep(Duration::from_millis(20));
//!     worker.store(3, Ordering::SeqCst);
//! });
//!
//! eventually(|| ready.load(Ordering::SeqCst))
//!     .with_timeout(Duration::from_secs(5))
//!     .should(eq(3_usize));
//!
//! consistently(|| ready.load(Ordering::SeqCst))
//!     .within(Duration::from_millis(50))
//!     .should(gte(3_usize));
//! ```
//!
//! ## Features
//!
//! - **Flexible probes** - plain values, closures returning a value, closures
//!   returning extras that must be zero, and closures that make their own
//!   expectations through a [`Checker`](polling::Checker)
//! - **Forwarded arguments and contexts** - see [`args!`] and
//!   [`context::Context`]
//! - **Early exits** - [`StopTrying`](polling::StopTrying) signals and
//!   matcher hints that nothing can change anymore
//! - **Virtual time** - [`clock::MockClock`] makes hour-long timeouts instant
//! - **Pluggable failures** - route failures anywhere with a
//!   [`FailureHandler`](polling::FailureHandler)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Time sources for the polling loop
pub mod clock;

pub mod assertions;
pub mod context;
pub mod error;
pub mod format;
pub mod mock;
pub mod polling;

/// Prelude for convenient imports
///
/// ```rust
/// use testkit_eventually::prelude::*;
/// ```
pub mod prelude {
    pub use crate::assertions::{
        all_of, any_of, be_closed, be_none, be_some, contains_str, eq, fail_with, gt, gte, lt,
        lte, not, receive, satisfies, succeed, Matcher,
    };
    pub use crate::context::Context;
    pub use crate::polling::{Arg, Checker, Rest, Returns, StopTrying};
    pub use crate::{args, consistently, describe, eventually, stop_trying};
}

// Re-exports
pub use error::{Error, Result};
pub use polling::{AsyncAssertion, Defaults, Poller};

use polling::IntoProbe;

/// Poll `actual` with the global poller until the matcher passes.
///
/// The global poller reads its defaults from the environment (see
/// [`Defaults::from_env`]) and panics on failure.
pub fn eventually<'a, M, P>(actual: P) -> AsyncAssertion<'a, P::Value>
where
    P: IntoProbe<'a, M>,
{
    polling::global().eventually(actual)
}

/// Poll `actual` with the global poller and require the matcher to pass on
/// every attempt.
pub fn consistently<'a, M, P>(actual: P) -> AsyncAssertion<'a, P::Value>
where
    P: IntoProbe<'a, M>,
{
    polling::global().consistently(actual)
}
