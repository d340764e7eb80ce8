//! Error definitions
//!
//! This module provides the configuration errors reported by testkit-eventually.
//! They describe defects in how an assertion was put together and are never
//! retried by the polling loop.

use std::time::Duration;

use thiserror::Error;

/// Main error type for testkit-eventually
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The probe returns nothing and takes no [`Checker`](crate::polling::Checker).
    #[error(
        "The function passed to {kind} had an invalid signature of {signature}.  Functions passed to {kind} must either (a) have return values or (b) take a Checker as their first argument and return nothing."
    )]
    InvalidSignature {
        /// `Eventually` or `Consistently`.
        kind: &'static str,
        /// Rendered signature of the probe.
        signature: String,
    },

    /// The number of forwarded arguments does not fit the probe.
    #[error(
        "The function passed to {kind} has signature {signature} takes {declared} arguments but {supplied} {verb} been provided.  Please use {kind}().with_arguments() to pass the correct set of arguments.",
        verb = has_or_have(.supplied)
    )]
    ArgumentCount {
        /// `Eventually` or `Consistently`.
        kind: &'static str,
        /// Rendered signature of the probe.
        signature: String,
        /// Parameters the probe declares.
        declared: usize,
        /// Values available to fill them.
        supplied: usize,
    },

    /// A forwarded argument has a different type than the parameter it fills.
    #[error(
        "The function passed to {kind} has signature {signature} and expects {expected} at position {position}, but {found} has been provided."
    )]
    ArgumentType {
        /// `Eventually` or `Consistently`.
        kind: &'static str,
        /// Rendered signature of the probe.
        signature: String,
        /// Zero-based parameter position.
        position: usize,
        /// Declared parameter type.
        expected: String,
        /// Type of the forwarded value.
        found: String,
    },

    /// The probe asks for a context but none was configured.
    #[error(
        "The function passed to {kind} requested a Context, but no context has been provided.  Please pass one in using {kind}().with_context()."
    )]
    MissingContext {
        /// `Eventually` or `Consistently`.
        kind: &'static str,
    },

    /// A duration in the environment could not be parsed.
    #[error("Invalid duration {value:?} for {variable}: expected a number followed by ns, us, ms, s, m or h")]
    InvalidDuration {
        /// Environment variable holding the value.
        variable: String,
        /// The offending value.
        value: String,
    },
}

impl Error {
    /// Create an argument-count error.
    #[must_use]
    pub fn argument_count(
        kind: &'static str,
        signature: impl Into<String>,
        declared: usize,
        supplied: usize,
    ) -> Self {
        Self::ArgumentCount {
            kind,
            signature: signature.into(),
            declared,
            supplied,
        }
    }

    /// Create an invalid-duration error.
    #[must_use]
    pub fn invalid_duration(variable: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidDuration {
            variable: variable.into(),
            value: value.into(),
        }
    }
}

fn has_or_have(count: &usize) -> &'static str {
    if *count == 1 {
        "has"
    } else {
        "have"
    }
}

/// Parse a duration such as `250ms`, `2s`, `1.5s` or `1m`.
///
/// A bare number is read as milliseconds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn parse_duration(variable: &str, raw: &str) -> Result<Duration> {
    let value = raw.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number
        .parse()
        .map_err(|_| Error::invalid_duration(variable, raw))?;
    let nanos_per_unit = match unit.trim() {
        "ns" => 1.0,
        "us" | "µs" => 1e3,
        "" | "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        _ => return Err(Error::invalid_duration(variable, raw)),
    };
    let nanos = (number * nanos_per_unit).round();
    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(Error::invalid_duration(variable, raw));
    }
    Ok(Duration::from_nanos(nanos as u64))
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
