//! Time sources for the polling loop
//!
//! The scheduler never touches `std::time` directly. It asks a [`Clock`] for
//! the current time and for the pause between attempts, so the same
//! assertion can run against wall-clock time ([`SystemClock`]) or against
//! virtual time ([`MockClock`]) that jumps forward whenever the scheduler
//! sleeps.
//!
//! # Example
//!
//! ```rust
//! use testkit_eventually::clock::{Clock, MockClock};
//! use std::time::Duration;
//!
//! let clock = MockClock::new();
//! clock.sleep(Duration::from_secs(3600), None);
//! assert_eq!(clock.now(), Duration::from_secs(3600));
//! ```

mod mock_clock;

pub use mock_clock::MockClock;

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use crate::context::Context;

/// A monotonic time source with an interruptible sleep.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Pause for `duration`, returning early once `context` is done.
    fn sleep(&self, duration: Duration, context: Option<&Context>);
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration, context: Option<&Context>) {
        match context {
            Some(ctx) => {
                ctx.wait_timeout(duration);
            }
            None => thread::sleep(duration),
        }
    }
}
