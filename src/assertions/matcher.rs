#![allow(clippy::must_use_candidate)]

//! The matcher trait and the general-purpose matchers.
//!
//! A matcher answers three questions about a value: does it match, why not,
//! and why it unexpectedly did. Matching may also *fail*: a matcher that
//! cannot judge a value returns a [`MatchError`], which the polling engine
//! treats as "not matched yet" and reports as `Error: <text>`.
//!
//! # Example
//!
//! ```rust
//! use testkit_eventually::assertions::{eq, gt, not, Matcher};
//!
//! assert_eq!(eq(42).matches(&42), Ok(true));
//! assert_eq!(gt(0).matches(&-5), Ok(false));
//! assert_eq!(not(eq(0)).matches(&1), Ok(true));
//! ```

use std::fmt::Debug;

use thiserror::Error;

use crate::format::{object, INDENT};
use crate::polling::CallbackOutcome;

/// A matcher could not judge a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct MatchError {
    message: String,
}

impl MatchError {
    /// Create a match error with the given text.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Decides whether a polled value is acceptable.
///
/// # Custom matchers
///
/// ```rust
/// use testkit_eventually::assertions::{MatchError, Matcher};
///
/// struct Even;
///
/// impl Matcher<i32> for Even {
///     fn matches(&self, actual: &i32) -> Result<bool, MatchError> {
///         Ok(actual % 2 == 0)
///     }
///
///     fn failure_message(&self, actual: &i32) -> String {
///         format!("Expected {actual} to be even")
///     }
///
///     fn negated_failure_message(&self, actual: &i32) -> String {
///         format!("Expected {actual} to be odd")
///     }
/// }
///
/// assert_eq!(Even.matches(&4), Ok(true));
/// assert_eq!(Even.matches(&3), Ok(false));
/// ```
pub trait Matcher<T: ?Sized> {
    /// Judge `actual`.
    ///
    /// # Errors
    ///
    /// Returns a [`MatchError`] when the value cannot be judged at all.
    fn matches(&self, actual: &T) -> Result<bool, MatchError>;

    /// Explain why `actual` did not match.
    fn failure_message(&self, actual: &T) -> String;

    /// Explain why `actual` matched when it should not have.
    fn negated_failure_message(&self, actual: &T) -> String;

    /// Returns an explanation when no later observation of `actual` can
    /// change the verdict.
    ///
    /// Only consulted for values polled directly (not produced by a
    /// function), after a failed attempt. Returning `Some` ends an
    /// `eventually` assertion early.
    fn no_future_change(&self, _actual: &T) -> Option<String> {
        None
    }

    /// Exposes a matcher for the outcome of a probe that returns nothing and
    /// reports only through its [`Checker`](crate::polling::Checker).
    ///
    /// With the default `None`, a failed callback is an error and a clean
    /// callback is matched as `()`.
    fn as_callback_matcher(&self) -> Option<&dyn Matcher<CallbackOutcome>> {
        None
    }
}

/// Apply a matcher once, without polling.
///
/// # Panics
///
/// Panics with the matcher's failure message if the value doesn't match, or
/// with the error text if the matcher cannot judge it.
///
/// # Example
///
/// ```rust
/// use testkit_eventually::{assert_that, assertions::eq};
///
/// assert_that!(42, eq(42));
/// ```
#[macro_export]
macro_rules! assert_that {
    ($value:expr, $matcher:expr) => {{
        let value = &$value;
        let matcher = &$matcher;
        match $crate::assertions::Matcher::matches(matcher, value) {
            ::core::result::Result::Ok(true) => {}
            ::core::result::Result::Ok(false) => panic!(
                "assertion failed:\n{}",
                $crate::assertions::Matcher::failure_message(matcher, value)
            ),
            ::core::result::Result::Err(err) => panic!("assertion failed:\nError: {}", err),
        }
    }};
    ($value:expr, $matcher:expr, $($arg:tt)+) => {{
        let value = &$value;
        let matcher = &$matcher;
        match $crate::assertions::Matcher::matches(matcher, value) {
            ::core::result::Result::Ok(true) => {}
            ::core::result::Result::Ok(false) => panic!(
                "assertion failed: {}\n{}",
                format_args!($($arg)+),
                $crate::assertions::Matcher::failure_message(matcher, value)
            ),
            ::core::result::Result::Err(err) => panic!(
                "assertion failed: {}\nError: {}",
                format_args!($($arg)+),
                err
            ),
        }
    }};
}

/// `Expected\n    <actual>\n<relation>\n    <expected>`
pub(crate) fn expectation<A, E>(actual: &A, relation: &str, expected: &E) -> String
where
    A: Debug + ?Sized,
    E: Debug + ?Sized,
{
    format!(
        "Expected\n{INDENT}{}\n{relation}\n{INDENT}{}",
        object(actual),
        object(expected)
    )
}

/// `Expected\n    <actual>\n<relation>`
pub(crate) fn expectation_of<A: Debug + ?Sized>(actual: &A, relation: &str) -> String {
    format!("Expected\n{INDENT}{}\n{relation}", object(actual))
}

// Value matchers

/// Matches values equal to `expected`.
///
/// The actual value may be any type comparable with the expected one, so
/// `eq("A")` matches a `String`.
///
/// ```rust
/// use testkit_eventually::assertions::{eq, Matcher};
///
/// assert_eq!(eq("A").matches(&String::from("A")), Ok(true));
/// ```
pub fn eq<E: Debug>(expected: E) -> EqMatcher<E> {
    EqMatcher { expected }
}

/// Returned by [`eq`].
#[derive(Debug, Clone)]
pub struct EqMatcher<E> {
    expected: E,
}

impl<T, E> Matcher<T> for EqMatcher<E>
where
    T: PartialEq<E> + Debug,
    E: Debug,
{
    fn matches(&self, actual: &T) -> Result<bool, MatchError> {
        Ok(*actual == self.expected)
    }

    fn failure_message(&self, actual: &T) -> String {
        expectation(actual, "to equal", &self.expected)
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        expectation(actual, "not to equal", &self.expected)
    }
}

macro_rules! ordering_matcher {
    ($(#[$doc:meta])* $factory:ident, $name:ident, $op:tt, $relation:literal, $negated:literal) => {
        $(#[$doc])*
        pub fn $factory<T: PartialOrd + Debug>(threshold: T) -> $name<T> {
            $name { threshold }
        }

        #[doc = concat!("Matcher returned by [`", stringify!($factory), "`].")]
        #[derive(Debug, Clone)]
        pub struct $name<T> {
            threshold: T,
        }

        impl<T: PartialOrd + Debug> Matcher<T> for $name<T> {
            fn matches(&self, actual: &T) -> Result<bool, MatchError> {
                Ok(*actual $op self.threshold)
            }

            fn failure_message(&self, actual: &T) -> String {
                expectation(actual, $relation, &self.threshold)
            }

            fn negated_failure_message(&self, actual: &T) -> String {
                expectation(actual, $negated, &self.threshold)
            }
        }
    };
}

ordering_matcher!(
    /// Matches values strictly above `bound`.
    gt, GtMatcher, >, "to be >", "not to be >"
);
ordering_matcher!(
    /// Matches values at or above `bound`.
    gte, GteMatcher, >=, "to be >=", "not to be >="
);
ordering_matcher!(
    /// Matches values strictly below `bound`.
    lt, LtMatcher, <, "to be <", "not to be <"
);
ordering_matcher!(
    /// Matches values at or below `bound`.
    ///
    /// ```rust
    /// use testkit_eventually::assertions::{lte, Matcher};
    ///
    /// assert_eq!(lte(10).matches(&10), Ok(true));
    /// assert_eq!(lte(10).matches(&11), Ok(false));
    /// ```
    lte, LteMatcher, <=, "to be <=", "not to be <="
);

/// Matches strings containing `substring`.
///
/// ```rust
/// use testkit_eventually::assertions::{contains_str, Matcher};
///
/// let greeting = contains_str("world");
/// assert_eq!(greeting.matches(&"hello world".to_string()), Ok(true));
/// assert_eq!(greeting.matches("hello"), Ok(false));
/// ```
pub fn contains_str(substring: &str) -> ContainsStrMatcher {
    ContainsStrMatcher {
        substring: substring.to_string(),
    }
}

/// Returned by [`contains_str`].
#[derive(Debug, Clone)]
pub struct ContainsStrMatcher {
    substring: String,
}

impl Matcher<str> for ContainsStrMatcher {
    fn matches(&self, actual: &str) -> Result<bool, MatchError> {
        Ok(actual.contains(&self.substring))
    }

    fn failure_message(&self, actual: &str) -> String {
        expectation(actual, "to contain substring", self.substring.as_str())
    }

    fn negated_failure_message(&self, actual: &str) -> String {
        expectation(actual, "not to contain substring", self.substring.as_str())
    }
}

impl Matcher<String> for ContainsStrMatcher {
    fn matches(&self, actual: &String) -> Result<bool, MatchError> {
        <Self as Matcher<str>>::matches(self, actual)
    }

    fn failure_message(&self, actual: &String) -> String {
        <Self as Matcher<str>>::failure_message(self, actual)
    }

    fn negated_failure_message(&self, actual: &String) -> String {
        <Self as Matcher<str>>::negated_failure_message(self, actual)
    }
}

impl<'a> Matcher<&'a str> for ContainsStrMatcher {
    fn matches(&self, actual: &&'a str) -> Result<bool, MatchError> {
        <Self as Matcher<str>>::matches(self, actual)
    }

    fn failure_message(&self, actual: &&'a str) -> String {
        <Self as Matcher<str>>::failure_message(self, actual)
    }

    fn negated_failure_message(&self, actual: &&'a str) -> String {
        <Self as Matcher<str>>::negated_failure_message(self, actual)
    }
}

/// Matches values for which `predicate` holds; `description` completes
/// "Expected ... to" in failure messages.
///
/// ```rust
/// use testkit_eventually::assertions::{satisfies, Matcher};
///
/// let m = satisfies(|x: &i32| *x % 2 == 0, "be even");
/// assert_eq!(m.matches(&4), Ok(true));
/// assert_eq!(m.matches(&3), Ok(false));
/// ```
pub fn satisfies<T, F>(predicate: F, description: &str) -> PredicateMatcher<T, F>
where
    F: Fn(&T) -> bool,
{
    PredicateMatcher {
        predicate,
        description: description.to_string(),
        _phantom: std::marker::PhantomData,
    }
}

/// Returned by [`satisfies`].
pub struct PredicateMatcher<T, F> {
    predicate: F,
    description: String,
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T: Debug, F: Fn(&T) -> bool> Matcher<T> for PredicateMatcher<T, F> {
    fn matches(&self, actual: &T) -> Result<bool, MatchError> {
        Ok((self.predicate)(actual))
    }

    fn failure_message(&self, actual: &T) -> String {
        expectation_of(actual, &format!("to {}", self.description))
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        expectation_of(actual, &format!("not to {}", self.description))
    }
}

/// Matches `None`.
pub fn be_none() -> BeNone {
    BeNone
}

/// Matcher returned by [`be_none`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BeNone;

impl<V: Debug> Matcher<Option<V>> for BeNone {
    fn matches(&self, actual: &Option<V>) -> Result<bool, MatchError> {
        Ok(actual.is_none())
    }

    fn failure_message(&self, actual: &Option<V>) -> String {
        expectation_of(actual, "to be None")
    }

    fn negated_failure_message(&self, actual: &Option<V>) -> String {
        expectation_of(actual, "not to be None")
    }
}

/// Matches any `Some`.
pub fn be_some() -> BeSome {
    BeSome
}

/// Matcher returned by [`be_some`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BeSome;

impl<V: Debug> Matcher<Option<V>> for BeSome {
    fn matches(&self, actual: &Option<V>) -> Result<bool, MatchError> {
        Ok(actual.is_some())
    }

    fn failure_message(&self, actual: &Option<V>) -> String {
        expectation_of(actual, "to be Some")
    }

    fn negated_failure_message(&self, actual: &Option<V>) -> String {
        expectation_of(actual, "not to be Some")
    }
}

// Combinators

/// Matches when every inner matcher does.
///
/// Matchers are consulted in order and the first one that fails (or errors)
/// decides the verdict. For different matcher types, box them first.
///
/// ```rust
/// use testkit_eventually::assertions::{all_of, gt, lt, Matcher};
///
/// let above = all_of(vec![gt(0), gt(10), gt(20)]);
/// assert_eq!(above.matches(&50), Ok(true));
/// assert_eq!(above.matches(&15), Ok(false));
///
/// let mixed: Vec<Box<dyn Matcher<i32>>> = vec![Box::new(gt(0)), Box::new(lt(100))];
/// assert_eq!(all_of(mixed).matches(&50), Ok(true));
/// ```
pub fn all_of<T, M>(matchers: Vec<M>) -> AllOfMatcher<T>
where
    T: ?Sized,
    M: Matcher<T> + 'static,
{
    AllOfMatcher {
        matchers: matchers
            .into_iter()
            .map(|m| Box::new(m) as Box<dyn Matcher<T>>)
            .collect(),
    }
}

/// Returned by [`all_of`].
pub struct AllOfMatcher<T: ?Sized> {
    matchers: Vec<Box<dyn Matcher<T>>>,
}

impl<T: Debug + ?Sized> Matcher<T> for AllOfMatcher<T> {
    fn matches(&self, actual: &T) -> Result<bool, MatchError> {
        for matcher in &self.matchers {
            if !matcher.matches(actual)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn failure_message(&self, actual: &T) -> String {
        self.matchers
            .iter()
            .find(|m| !matches!(m.matches(actual), Ok(true)))
            .map_or_else(
                || expectation_of(actual, "to satisfy all matchers"),
                |m| m.failure_message(actual),
            )
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        expectation_of(
            actual,
            &format!("not to satisfy all of {} matchers", self.matchers.len()),
        )
    }

    fn no_future_change(&self, actual: &T) -> Option<String> {
        self.matchers
            .iter()
            .find(|m| !matches!(m.matches(actual), Ok(true)))
            .and_then(|m| m.no_future_change(actual))
    }
}

/// Matches when at least one inner matcher does.
///
/// ```rust
/// use testkit_eventually::assertions::{any_of, eq, Matcher};
///
/// let small = any_of(vec![eq(1), eq(2), eq(3)]);
/// assert_eq!(small.matches(&2), Ok(true));
/// assert_eq!(small.matches(&4), Ok(false));
/// ```
pub fn any_of<T, M>(matchers: Vec<M>) -> AnyOfMatcher<T>
where
    T: ?Sized,
    M: Matcher<T> + 'static,
{
    AnyOfMatcher {
        matchers: matchers
            .into_iter()
            .map(|m| Box::new(m) as Box<dyn Matcher<T>>)
            .collect(),
    }
}

/// Returned by [`any_of`].
pub struct AnyOfMatcher<T: ?Sized> {
    matchers: Vec<Box<dyn Matcher<T>>>,
}

impl<T: Debug + ?Sized> Matcher<T> for AnyOfMatcher<T> {
    fn matches(&self, actual: &T) -> Result<bool, MatchError> {
        for matcher in &self.matchers {
            if matcher.matches(actual)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn failure_message(&self, actual: &T) -> String {
        let reasons: Vec<_> = self
            .matchers
            .iter()
            .map(|m| m.failure_message(actual))
            .collect();
        format!(
            "{}\n{}",
            expectation_of(actual, "to satisfy at least one of:"),
            reasons.join("\nor\n")
        )
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        self.matchers
            .iter()
            .find(|m| matches!(m.matches(actual), Ok(true)))
            .map_or_else(
                || expectation_of(actual, "not to satisfy any matcher"),
                |m| m.negated_failure_message(actual),
            )
    }
}

/// Inverts a matcher, swapping its two failure messages.
///
/// Errors from the inner matcher are passed through unchanged.
///
/// ```rust
/// use testkit_eventually::assertions::{eq, not, Matcher};
///
/// let nonzero = not(eq(0));
/// assert_eq!(nonzero.matches(&1), Ok(true));
/// assert_eq!(nonzero.matches(&0), Ok(false));
/// ```
pub fn not<T, M>(matcher: M) -> NotMatcher<T>
where
    T: ?Sized,
    M: Matcher<T> + 'static,
{
    NotMatcher {
        inner: Box::new(matcher),
    }
}

/// Returned by [`not`].
pub struct NotMatcher<T: ?Sized> {
    inner: Box<dyn Matcher<T>>,
}

impl<T: ?Sized> Matcher<T> for NotMatcher<T> {
    fn matches(&self, actual: &T) -> Result<bool, MatchError> {
        self.inner.matches(actual).map(|matched| !matched)
    }

    fn failure_message(&self, actual: &T) -> String {
        self.inner.negated_failure_message(actual)
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        self.inner.failure_message(actual)
    }
}

// Boxed matchers nest inside combinators.
impl<T: ?Sized> Matcher<T> for Box<dyn Matcher<T>> {
    fn matches(&self, actual: &T) -> Result<bool, MatchError> {
        (**self).matches(actual)
    }

    fn failure_message(&self, actual: &T) -> String {
        (**self).failure_message(actual)
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        (**self).negated_failure_message(actual)
    }

    fn no_future_change(&self, actual: &T) -> Option<String> {
        (**self).no_future_change(actual)
    }

    fn as_callback_matcher(&self) -> Option<&dyn Matcher<CallbackOutcome>> {
        (**self).as_callback_matcher()
    }
}
