use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::{AttachProgressReporter, Detach, ProgressReporter};

/// An [`AttachProgressReporter`] that keeps the attached reporter.
///
/// Install it with
/// [`Context::with_progress_attacher`](crate::context::Context::with_progress_attacher);
/// clones share state, so keep one to inspect.
///
/// ```rust
/// use testkit_eventually::context::Context;
/// use testkit_eventually::mock::FakeProgressAttacher;
/// use testkit_eventually::prelude::*;
///
/// let attacher = FakeProgressAttacher::new();
/// let ctx = Context::background().with_progress_attacher(attacher.clone());
///
/// let seen = attacher.clone();
/// let mut reports = Vec::new();
/// eventually(|| {
///     reports.push(seen.report());
///     reports.len()
/// })
/// .with_context(ctx)
/// .should(eq(2_usize));
///
/// assert_eq!(reports[0].as_deref(), Some(""));
/// assert!(reports[1].as_deref().unwrap().contains("to equal"));
/// assert_eq!(attacher.detach_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct FakeProgressAttacher {
    inner: Arc<AttacherState>,
}

#[derive(Default)]
struct AttacherState {
    reporter: Mutex<Option<ProgressReporter>>,
    attached: AtomicUsize,
    detached: AtomicUsize,
}

impl FakeProgressAttacher {
    /// Create an attacher with nothing attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the attached reporter for the current reason.
    ///
    /// `None` before the first attachment and empty before the first attempt
    /// is judged. The last reporter stays available after detaching.
    #[must_use]
    pub fn report(&self) -> Option<String> {
        let reporter = self.inner.reporter.lock().clone();
        reporter.map(|reporter| reporter())
    }

    /// Number of attachments so far.
    #[must_use]
    pub fn attach_count(&self) -> usize {
        self.inner.attached.load(Ordering::SeqCst)
    }

    /// Number of detachments so far.
    #[must_use]
    pub fn detach_count(&self) -> usize {
        self.inner.detached.load(Ordering::SeqCst)
    }
}

impl AttachProgressReporter for FakeProgressAttacher {
    fn attach(&self, reporter: ProgressReporter) -> Detach {
        *self.inner.reporter.lock() = Some(reporter);
        self.inner.attached.fetch_add(1, Ordering::SeqCst);
        let state = Arc::clone(&self.inner);
        Detach::new(move || {
            state.detached.fetch_add(1, Ordering::SeqCst);
        })
    }
}

impl std::fmt::Debug for FakeProgressAttacher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeProgressAttacher")
            .field("attached", &self.attach_count())
            .field("detached", &self.detach_count())
            .finish_non_exhaustive()
    }
}
