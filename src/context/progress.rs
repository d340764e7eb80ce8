//! Progress reporting hooks
//!
//! While an assertion polls, it can expose "what is the current failure
//! reason?" to the outside world (a test runner printing progress on a
//! signal, for example). A context created with
//! [`Context::with_progress_attacher`](super::Context::with_progress_attacher)
//! receives a reporter when polling starts and is detached when it ends.

use std::fmt;
use std::sync::Arc;

/// Renders the latest failure reason of a running assertion.
pub type ProgressReporter = Arc<dyn Fn() -> String + Send + Sync>;

/// Accepts progress reporters from running assertions.
pub trait AttachProgressReporter: Send + Sync {
    /// Attach `reporter`; the returned [`Detach`] removes it again.
    fn attach(&self, reporter: ProgressReporter) -> Detach;
}

/// Removes an attached reporter when dropped (or when
/// [`detach`](Self::detach) is called).
#[must_use = "dropping a Detach immediately detaches the reporter"]
pub struct Detach {
    action: Option<Box<dyn FnOnce() + Send>>,
}

impl Detach {
    /// Wrap the action that undoes an attachment.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// Detach now.
    pub fn detach(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl Drop for Detach {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Detach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detach")
            .field("pending", &self.action.is_some())
            .finish()
    }
}
