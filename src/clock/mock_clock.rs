//! Virtual time that only moves when someone sleeps or advances it.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::Clock;
use crate::context::Context;

/// A virtual clock for deterministic polling tests.
///
/// Sleeping on a `MockClock` never blocks: the clock jumps forward by the
/// requested duration and records the sleep. An assertion with a one-hour
/// timeout therefore finishes instantly, and the number of attempts it made
/// is exact.
///
/// Clones share one timeline, so a probe holding a clone can
/// [`advance`](MockClock::advance) it to simulate slow work.
///
/// # Example
///
/// ```rust
/// use testkit_eventually::clock::{Clock, MockClock};
/// use std::time::Duration;
///
/// let clock = MockClock::new();
/// let shared = clock.clone();
///
/// shared.sleep(Duration::from_millis(10), None);
/// clock.advance(Duration::from_millis(5));
///
/// assert_eq!(clock.now(), Duration::from_millis(15));
/// assert_eq!(clock.sleeps(), vec![Duration::from_millis(10)]);
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    inner: Arc<Mutex<ClockState>>,
}

#[derive(Debug)]
struct ClockState {
    current_time: Duration,
    sleeps: Vec<Duration>,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// A clock at zero with no recorded sleeps.
    #[must_use]
    pub fn new() -> Self {
        Self::with_start_time(Duration::ZERO)
    }

    /// A clock that reads `start` before anything has slept.
    #[must_use]
    pub fn with_start_time(start: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockState {
                current_time: start,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Moves time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock();
        state.current_time = state.current_time.saturating_add(duration);
    }

    /// Durations passed to [`Clock::sleep`] so far.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.lock().sleeps.clone()
    }

    /// Number of sleeps taken so far.
    #[must_use]
    pub fn sleep_count(&self) -> usize {
        self.inner.lock().sleeps.len()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Duration {
        self.inner.lock().current_time
    }

    fn sleep(&self, duration: Duration, context: Option<&Context>) {
        if context.is_some_and(Context::is_done) {
            return;
        }
        let mut state = self.inner.lock();
        state.sleeps.push(duration);
        state.current_time = state.current_time.saturating_add(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock_starts_at_zero() {
        let clock = MockClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn test_sleep_advances_time() {
        let clock = MockClock::new();
        clock.sleep(Duration::from_millis(10), None);
        clock.sleep(Duration::from_millis(7), None);

        assert_eq!(clock.now(), Duration::from_millis(17));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(10), Duration::from_millis(7)]
        );
    }

    #[test]
    fn test_sleep_skipped_when_context_done() {
        let clock = MockClock::new();
        let (ctx, cancel) = Context::background().with_cancel();
        cancel.cancel();

        clock.sleep(Duration::from_secs(1), Some(&ctx));
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn test_advance_saturates() {
        let clock = MockClock::with_start_time(Duration::MAX);
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::MAX);
    }

    #[test]
    fn test_clone_shares_state() {
        let clock1 = MockClock::new();
        let clock2 = clock1.clone();

        clock1.advance(Duration::from_secs(10));
        clock2.sleep(Duration::from_secs(5), None);
        assert_eq!(clock1.now(), Duration::from_secs(15));
        assert_eq!(clock1.sleep_count(), 1);
    }

    #[test]
    fn test_concurrent_sleeps_and_advances() {
        use std::thread;

        let clock = MockClock::new();
        let clock2 = clock.clone();

        let handle = thread::spawn(move || {
            for _ in 0..1000 {
                clock2.sleep(Duration::from_millis(1), None);
            }
        });

        for _ in 0..500 {
            clock.advance(Duration::from_millis(1));
        }

        handle.join().unwrap();
        assert_eq!(clock.now(), Duration::from_millis(1500));
        assert_eq!(clock.sleep_count(), 1000);
    }
}
