// Allow must_use_candidate since recorder accessors are mostly used in asserts
#![allow(clippy::must_use_candidate)]

use std::sync::Arc;

use parking_lot::Mutex;

use crate::polling::{Failure, FailureHandler};

/// A [`FailureHandler`] that records every failure.
///
/// Clones share the same record, so keep one clone and hand the other to
/// [`Poller::with_failure_handler`](crate::Poller::with_failure_handler).
#[derive(Debug, Clone, Default)]
pub struct FailureRecorder {
    failures: Arc<Mutex<Vec<Failure>>>,
}

impl FailureRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded failure, oldest first.
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.lock().clone()
    }

    /// The latest failure message, or an empty string if nothing failed.
    pub fn message(&self) -> String {
        self.failures
            .lock()
            .last()
            .map(|failure| failure.message.clone())
            .unwrap_or_default()
    }

    /// The caller skip of every failure, oldest first.
    pub fn skips(&self) -> Vec<usize> {
        self.failures
            .lock()
            .iter()
            .map(|failure| failure.caller_skip)
            .collect()
    }

    /// Number of failures recorded.
    pub fn count(&self) -> usize {
        self.failures.lock().len()
    }

    /// Whether nothing has failed.
    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }

    /// Forget every recorded failure.
    pub fn reset(&self) {
        self.failures.lock().clear();
    }
}

impl FailureHandler for FailureRecorder {
    fn fail(&self, failure: Failure) {
        self.failures.lock().push(failure);
    }
}
