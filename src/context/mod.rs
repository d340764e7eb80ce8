//! Cancellation contexts
//!
//! A [`Context`] carries a cancellation signal, an optional deadline, keyed
//! values and an optional progress-reporter attacher. Contexts form a tree:
//! cancelling a parent cancels every context derived from it.
//!
//! # Example
//!
//! ```rust
//! use testkit_eventually::context::{Context, ContextError};
//!
//! let (ctx, cancel) = Context::background().with_cancel();
//! let child = ctx.with_value("user", String::from("ada"));
//!
//! assert!(!child.is_done());
//! cancel.cancel();
//! assert_eq!(child.error(), Some(ContextError::Cancelled));
//! assert_eq!(child.value::<String>("user").as_deref(), Some("ada"));
//! ```

mod progress;

pub use progress::{AttachProgressReporter, Detach, ProgressReporter};

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context as TaskContext, Poll, Waker};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Why a context is done.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// Cancelled through a [`CancelHandle`] or a cancelled parent.
    #[error("context canceled")]
    Cancelled,

    /// The deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// A cloneable, thread-safe cancellation context.
///
/// Clones share the same state; derived contexts are created with
/// [`with_cancel`](Self::with_cancel), [`with_timeout`](Self::with_timeout),
/// [`with_deadline`](Self::with_deadline), [`with_value`](Self::with_value)
/// and [`with_progress_attacher`](Self::with_progress_attacher).
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    parent: Option<Context>,
    deadline: Option<Instant>,
    value: Option<(&'static str, Arc<dyn Any + Send + Sync>)>,
    attacher: Option<Arc<dyn AttachProgressReporter>>,
    state: Mutex<ContextState>,
    changed: Condvar,
}

#[derive(Default)]
struct ContextState {
    error: Option<ContextError>,
    children: Vec<Weak<ContextInner>>,
    wakers: Vec<Waker>,
}

impl ContextInner {
    fn root() -> Self {
        Self {
            parent: None,
            deadline: None,
            value: None,
            attacher: None,
            state: Mutex::new(ContextState::default()),
            changed: Condvar::new(),
        }
    }

    /// Marks the context done. Returns `false` if it already was.
    fn finish(&self, error: ContextError) -> bool {
        let (children, wakers) = {
            let mut state = self.state.lock();
            if state.error.is_some() {
                return false;
            }
            state.error = Some(error);
            (
                std::mem::take(&mut state.children),
                std::mem::take(&mut state.wakers),
            )
        };
        self.changed.notify_all();
        for waker in wakers {
            waker.wake();
        }
        for child in children.iter().filter_map(Weak::upgrade) {
            child.finish(error);
        }
        true
    }
}

impl Context {
    /// Returns an empty root context that is never cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self {
            inner: Arc::new(ContextInner::root()),
        }
    }

    /// Derives a child that can be cancelled through the returned handle.
    #[must_use]
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let child = self.derive(|inner| inner);
        let handle = CancelHandle {
            inner: Arc::downgrade(&child.inner),
        };
        (child, handle)
    }

    /// Derives a child that is done once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> (Self, CancelHandle) {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    /// Derives a child that is done at `deadline` (or at the parent's
    /// deadline, whichever comes first).
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> (Self, CancelHandle) {
        let effective = match self.deadline() {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        let child = self.derive(|mut inner| {
            inner.deadline = Some(effective);
            inner
        });
        child.watch_deadline(effective);
        let handle = CancelHandle {
            inner: Arc::downgrade(&child.inner),
        };
        (child, handle)
    }

    /// Derives a child carrying `value` under `key`.
    #[must_use]
    pub fn with_value<V: Any + Send + Sync>(&self, key: &'static str, value: V) -> Self {
        self.derive(|mut inner| {
            inner.value = Some((key, Arc::new(value)));
            inner
        })
    }

    /// Derives a child that lets the polling engine attach a progress
    /// reporter for the duration of an assertion.
    #[must_use]
    pub fn with_progress_attacher<A>(&self, attacher: A) -> Self
    where
        A: AttachProgressReporter + 'static,
    {
        self.derive(|mut inner| {
            inner.attacher = Some(Arc::new(attacher));
            inner
        })
    }

    /// Looks up the value stored under `key`, searching parents outwards.
    ///
    /// Returns `None` when no context in the chain holds `key` or the stored
    /// value is not a `V`.
    #[must_use]
    pub fn value<V: Any + Clone>(&self, key: &str) -> Option<V> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some((stored, value)) = &ctx.inner.value {
                if *stored == key {
                    return value.downcast_ref::<V>().cloned();
                }
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    /// Returns the nearest progress-reporter attacher in the chain.
    #[must_use]
    pub fn progress_attacher(&self) -> Option<Arc<dyn AttachProgressReporter>> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some(attacher) = &ctx.inner.attacher {
                return Some(Arc::clone(attacher));
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Returns why the context is done, or `None` while it is live.
    #[must_use]
    pub fn error(&self) -> Option<ContextError> {
        if let Some(error) = self.inner.state.lock().error {
            return Some(error);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.inner.finish(ContextError::DeadlineExceeded);
                self.inner.state.lock().error
            }
            _ => None,
        }
    }

    /// Returns `true` once the context is cancelled or past its deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.error().is_some()
    }

    /// Blocks for at most `timeout`, returning early when the context is done.
    ///
    /// Returns `true` if the context is done.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_done() {
            return true;
        }
        let mut state = self.inner.state.lock();
        match Instant::now().checked_add(timeout) {
            Some(until) => {
                while state.error.is_none() {
                    if self.inner.changed.wait_until(&mut state, until).timed_out() {
                        break;
                    }
                }
            }
            None => {
                while state.error.is_none() {
                    self.inner.changed.wait(&mut state);
                }
            }
        }
        let done = state.error.is_some();
        drop(state);
        done || self.is_done()
    }

    /// Returns a future that resolves once the context is done.
    ///
    /// ```rust
    /// use futures::executor::block_on;
    /// use testkit_eventually::context::{Context, ContextError};
    ///
    /// let (ctx, cancel) = Context::background().with_cancel();
    /// cancel.cancel();
    /// assert_eq!(block_on(ctx.done()), ContextError::Cancelled);
    /// ```
    #[must_use]
    pub fn done(&self) -> Done {
        Done {
            context: self.clone(),
        }
    }

    fn derive(&self, configure: impl FnOnce(ContextInner) -> ContextInner) -> Self {
        let mut inner = ContextInner::root();
        inner.parent = Some(self.clone());
        inner.deadline = self.inner.deadline;
        let child = Self {
            inner: Arc::new(configure(inner)),
        };

        let mut state = self.inner.state.lock();
        match state.error {
            Some(error) => {
                drop(state);
                child.inner.finish(error);
            }
            None => {
                state.children.retain(|weak| weak.strong_count() > 0);
                state.children.push(Arc::downgrade(&child.inner));
            }
        }
        child
    }

    fn watch_deadline(&self, deadline: Instant) {
        let inner = Arc::downgrade(&self.inner);
        thread::spawn(move || loop {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut state = inner.state.lock();
            if state.error.is_some() {
                return;
            }
            // Wake at least once a second to notice a dropped context.
            let wake = deadline.min(Instant::now() + Duration::from_secs(1));
            let _ = inner.changed.wait_until(&mut state, wake);
            let expired = state.error.is_none() && Instant::now() >= deadline;
            drop(state);
            if expired {
                inner.finish(ContextError::DeadlineExceeded);
                return;
            }
        });
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("error", &self.inner.state.lock().error)
            .field("key", &self.inner.value.as_ref().map(|(key, _)| *key))
            .finish_non_exhaustive()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

/// Cancels the context it was created with.
///
/// Dropping the handle does not cancel.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    inner: Weak<ContextInner>,
}

impl CancelHandle {
    /// Cancels the context and everything derived from it.
    pub fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            if inner.finish(ContextError::Cancelled) {
                tracing::trace!("context cancelled");
            }
        }
    }
}

impl fmt::Debug for ContextInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextInner")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Future returned by [`Context::done`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Done {
    context: Context,
}

impl Future for Done {
    type Output = ContextError;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        if let Some(error) = self.context.error() {
            return Poll::Ready(error);
        }
        let mut state = self.context.inner.state.lock();
        if let Some(error) = state.error {
            return Poll::Ready(error);
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
