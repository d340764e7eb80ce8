//! Matchers for polled values.
//!
//! This module provides the matcher protocol used by
//! [`eventually`](crate::eventually) and [`consistently`](crate::consistently):
//!
//! - [`Matcher`] - the trait, with failure messages and early-exit hints
//! - Value matchers: [`eq`], [`gt`], [`gte`], [`lt`], [`lte`],
//!   [`contains_str`], [`satisfies`], [`be_none`], [`be_some`]
//! - Combinators: [`all_of`], [`any_of`], [`not`]
//! - Outcome matchers: [`succeed`], [`fail_with`]
//! - Channel matchers: [`receive`], [`be_closed`]
//! - [`assert_that!`](crate::assert_that) for direct use
//!
//! # Example
//!
//! ```rust
//! use testkit_eventually::{assert_that, assertions::{all_of, eq, gt}};
//!
//! assert_that!(42, eq(42));
//! assert_that!(50, all_of(vec![gt(0), gt(10)]));
//! ```

mod callback;
mod channel;
mod matcher;

pub use callback::{fail_with, succeed, FailWith, Succeed};
pub use channel::{be_closed, receive, BeClosed, Receive};
pub use matcher::{
    all_of, any_of, be_none, be_some, contains_str, eq, gt, gte, lt, lte, not, satisfies,
    AllOfMatcher, AnyOfMatcher, BeNone, BeSome, ContainsStrMatcher, EqMatcher, GtMatcher,
    GteMatcher, LtMatcher, LteMatcher, MatchError, Matcher, NotMatcher, PredicateMatcher,
};
