#![allow(clippy::must_use_candidate)]

//! Matchers for `std::sync::mpsc` receivers.
//!
//! Both matchers consume at most one message per attempt. Once a receiver
//! is observed disconnected it can never deliver again, which [`receive`]
//! reports through [`Matcher::no_future_change`] so polling a closed channel
//! stops early.

use std::cell::Cell;
use std::fmt::Debug;
use std::sync::mpsc::{Receiver, TryRecvError};

use super::matcher::{expectation_of, MatchError, Matcher};
use crate::format::{object, INDENT};

/// Create a matcher that takes one message from a receiver.
///
/// ```rust
/// use std::sync::mpsc;
/// use testkit_eventually::assertions::{receive, Matcher};
///
/// let (tx, rx) = mpsc::channel();
/// assert_eq!(receive().matches(&rx), Ok(false));
/// tx.send(1).unwrap();
/// assert_eq!(receive().matches(&rx), Ok(true));
/// ```
pub fn receive() -> Receive {
    Receive {
        disconnected: Cell::new(false),
    }
}

/// Matcher returned by [`receive`].
#[derive(Debug, Default)]
pub struct Receive {
    disconnected: Cell<bool>,
}

impl Receive {
    fn message<T>(&self, actual: &Receiver<T>) -> String {
        let mut message = expectation_of(actual, "to receive something.");
        if self.disconnected.get() {
            message.push_str(" The channel is closed.");
        }
        message
    }
}

impl<T> Matcher<Receiver<T>> for Receive {
    fn matches(&self, actual: &Receiver<T>) -> Result<bool, MatchError> {
        match actual.try_recv() {
            Ok(_) => Ok(true),
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => {
                self.disconnected.set(true);
                Ok(false)
            }
        }
    }

    fn failure_message(&self, actual: &Receiver<T>) -> String {
        self.message(actual)
    }

    fn negated_failure_message(&self, actual: &Receiver<T>) -> String {
        expectation_of(actual, "not to receive anything.")
    }

    fn no_future_change(&self, actual: &Receiver<T>) -> Option<String> {
        self.disconnected.get().then(|| self.message(actual))
    }
}

/// Create a matcher for a drained, disconnected receiver.
///
/// A receiver that still holds a message cannot be judged: the message is
/// consumed and reported as an error.
pub fn be_closed() -> BeClosed {
    BeClosed
}

/// Matcher returned by [`be_closed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BeClosed;

impl<T: Debug> Matcher<Receiver<T>> for BeClosed {
    fn matches(&self, actual: &Receiver<T>) -> Result<bool, MatchError> {
        match actual.try_recv() {
            Err(TryRecvError::Disconnected) => Ok(true),
            Err(TryRecvError::Empty) => Ok(false),
            Ok(value) => Err(MatchError::new(format!(
                "be_closed requires the channel to be drained, but it delivered\n{INDENT}{}",
                object(&value)
            ))),
        }
    }

    fn failure_message(&self, actual: &Receiver<T>) -> String {
        expectation_of(actual, "to be closed")
    }

    fn negated_failure_message(&self, actual: &Receiver<T>) -> String {
        expectation_of(actual, "to be open")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_receive_sees_disconnect() {
        let (tx, rx) = mpsc::channel::<i32>();
        let m = receive();
        assert_eq!(m.matches(&rx), Ok(false));
        assert_eq!(m.no_future_change(&rx), None);

        drop(tx);
        assert_eq!(m.matches(&rx), Ok(false));
        let explanation = m.no_future_change(&rx).unwrap();
        assert!(explanation.ends_with("The channel is closed."));
    }

    #[test]
    fn test_receive_drains_buffer_before_disconnect() {
        let (tx, rx) = mpsc::channel();
        tx.send("a").unwrap();
        drop(tx);

        let m = receive();
        assert_eq!(m.matches(&rx), Ok(true));
        assert_eq!(m.matches(&rx), Ok(false));
        assert!(m.no_future_change(&rx).is_some());
    }

    #[test]
    fn test_be_closed() {
        let (tx, rx) = mpsc::channel();
        assert_eq!(be_closed().matches(&rx), Ok(false));

        tx.send(7).unwrap();
        let err = be_closed().matches(&rx).unwrap_err();
        assert!(err.message().contains("<i32>: 7"));

        drop(tx);
        assert_eq!(be_closed().matches(&rx), Ok(true));
    }
}
