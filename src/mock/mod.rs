//! Test doubles for the polling engine's collaborators.
//!
//! - [`FailureRecorder`] - a failure handler that records instead of panicking
//! - [`FakeProgressAttacher`] - a progress-reporter attacher that keeps the
//!   reporter so a test can ask it for the current reason
//!
//! # Recording failures
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
//! poller.consistently(|| 3).should(lt(2));
//!
//! assert_eq!(recorder.count(), 1);
//! assert!(recorder.message().starts_with("Failed after 0.000s."));
//! ```

mod attacher;
mod recorder;

pub use attacher::FakeProgressAttacher;
pub use recorder::FailureRecorder;
