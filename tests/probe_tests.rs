//! Integration tests for probe shapes, forwarded arguments and contexts.

mod common;

use std::time::Duration;

use common::harness;
use testkit_eventually::polling::{Argument, CONFIGURATION_FAILURE_SKIP};
use testkit_eventually::prelude::*;

#[test]
fn test_forwards_arguments() {
    let (poller, recorder, _clock) = harness();
    let passed = poller
        .eventually(|a: i32, b: String| format!("{a} - {b}"))
        .with_arguments(args![10, "four"])
        .should(eq(String::from("10 - four")));
    assert!(passed);

    let passed = poller
        .eventually(|a: i32, b: String, c: Rest<i32>| {
            format!("{a} - {b} ({}{}{})", c.0[0], c.0[1], c.0[2])
        })
        .with_arguments(args![10, "four", 5, 1, 0])
        .should(eq(String::from("10 - four (510)")));
    assert!(passed);
    assert!(recorder.is_empty());
}

#[test]
fn test_with_arguments_replaces() {
    let (poller, recorder, _clock) = harness();
    poller
        .eventually(|a: i32| a)
        .with_arguments(args![1, 2])
        .with_arguments(args![3])
        .should(eq(3));
    assert!(recorder.is_empty());
}

#[test]
fn test_forwards_arguments_alongside_checker() {
    let (poller, recorder, _clock) = harness();
    poller
        .eventually(|g: Checker, a: i32, b: i32| g.expect(a).to(eq(b)))
        .with_arguments(args![10, 3])
        .should_not(succeed());
    poller
        .eventually(|g: Checker, a: i32, b: i32| g.expect(a).to(eq(b)))
        .with_arguments(args![3, 3])
        .should(succeed());
    assert!(recorder.is_empty());
}

#[test]
fn test_forwards_configured_context() {
    let (poller, recorder, _clock) = harness();
    let ctx = Context::background().with_value("key", String::from("value"));
    poller
        .eventually(|ctx: Context| ctx.value::<String>("key").unwrap_or_default())
        .with_context(ctx.clone())
        .should(eq(String::from("value")));
    assert!(recorder.is_empty());

    poller
        .eventually(|g: Checker, ctx: Context| {
            g.expect(ctx.value::<String>("key").unwrap_or_default())
                .to(eq("schmalue"));
        })
        .with_context(ctx)
        .should(fail_with(contains_str(
            "Expected\n    <String>: \"value\"\nto equal\n    <&str>: \"schmalue\"",
        )));
    assert!(recorder.is_empty());
}

#[test]
fn test_context_and_arguments_together() {
    let (poller, recorder, _clock) = harness();
    let ctx = Context::background().with_value("key", String::from("I have"));
    let probe = |g: Checker, ctx: Context, count: i32, zoo: Rest<String>| {
        let sentence = format!(
            "{} {count} animals: {}",
            ctx.value::<String>("key").unwrap_or_default(),
            zoo.0.join(", ")
        );
        g.expect(sentence).to(eq("I have 3 animals: dog, cat, pony"));
    };

    poller
        .eventually(probe)
        .with_arguments(args![3, "dog", "cat", "pony"])
        .with_context(ctx.clone())
        .should(succeed());
    assert!(recorder.is_empty());

    poller
        .eventually(probe)
        .with_arguments(args![2, "dog", "cat"])
        .with_context(ctx)
        .with_timeout(Duration::from_millis(20))
        .should(succeed());
    assert!(recorder
        .message()
        .contains("<String>: \"I have 2 animals: dog, cat\""));
}

#[test]
fn test_forwarded_context_overrides_configured() {
    let (poller, recorder, _clock) = harness();
    let a = Context::background().with_value("key", String::from("A"));
    let b = Context::background().with_value("key", String::from("B"));
    poller
        .eventually(|ctx: Context, s: String| {
            format!("{} {s}", ctx.value::<String>("key").unwrap_or_default())
        })
        .with_context(a)
        .with_arguments(args![b, "C"])
        .should(eq(String::from("B C")));
    assert!(recorder.is_empty());
}

#[test]
fn test_missing_context_is_a_configuration_error() {
    let (poller, recorder, _clock) = harness();
    let mut calls = 0;
    poller
        .eventually(|ctx: Context| {
            calls += 1;
            ctx.value::<String>("key")
        })
        .should(eq(Some(String::from("value"))));
    assert_eq!(calls, 0);
    assert_eq!(recorder.skips(), vec![CONFIGURATION_FAILURE_SKIP]);
    assert!(recorder.message().contains(
        "The function passed to Eventually requested a Context, but no context has been provided."
    ));
}

#[test]
fn test_argument_count_errors() {
    let (poller, recorder, _clock) = harness();
    poller
        .eventually(|a: i32| a.to_string())
        .should(eq(String::from("foo")));
    assert!(recorder.message().contains(
        "The function passed to Eventually has signature fn(i32) -> String takes 1 arguments but 0 have been provided."
    ));

    poller
        .eventually(|a: i32, b: i32| (a + b).to_string())
        .with_arguments(args![1])
        .should(eq(String::from("foo")));
    assert!(recorder.message().contains("takes 2 arguments but 1 has been provided"));

    poller
        .eventually(|a: i32, b: i32| (a + b).to_string())
        .with_arguments(args![1, 2, 3])
        .should(eq(String::from("foo")));
    assert!(recorder.message().contains("takes 2 arguments but 3 have been provided"));

    poller
        .eventually(|_g: Checker, a: i32, b: i32| (a + b).to_string())
        .with_arguments(args![1, 2, 3])
        .should(eq(String::from("foo")));
    assert!(recorder.message().contains(
        "has signature fn(Checker, i32, i32) -> String takes 3 arguments but 4 have been provided"
    ));

    poller
        .eventually(|a: i32, b: i32, c: Rest<i32>| (a + b + c.0.len() as i32).to_string())
        .with_arguments(args![1])
        .should(eq(String::from("foo")));
    assert!(recorder.message().contains(
        "has signature fn(i32, i32, ...i32) -> String takes 3 arguments but 1 has been provided"
    ));

    assert_eq!(recorder.skips(), vec![CONFIGURATION_FAILURE_SKIP; 5]);
}

#[test]
fn test_argument_type_error() {
    let (poller, recorder, _clock) = harness();
    poller
        .eventually(|a: i32| a)
        .with_arguments(vec![Argument::new(String::from("ten"))])
        .should(eq(10));
    assert!(recorder
        .message()
        .contains("expects i32 at position 0, but String has been provided"));
}

#[test]
fn test_invalid_signatures() {
    let (poller, recorder, _clock) = harness();
    poller.eventually(|| ()).should(eq(()));
    assert!(recorder
        .message()
        .contains("The function passed to Eventually had an invalid signature of fn()"));

    poller.consistently(|ctx: Context| drop(ctx)).should(eq(()));
    assert!(recorder
        .message()
        .contains("The function passed to Consistently had an invalid signature of fn(Context)"));

    poller
        .eventually(|ctx: Context, g: Checker| drop((ctx, g)))
        .with_context(Context::background())
        .should(eq(()));
    assert!(recorder
        .message()
        .contains("had an invalid signature of fn(Context, Checker)"));

    poller.eventually(|s: String| drop(s)).should(eq(()));
    assert!(recorder
        .message()
        .contains("had an invalid signature of fn(String)"));

    assert_eq!(recorder.skips(), vec![CONFIGURATION_FAILURE_SKIP; 4]);
}

#[test]
fn test_arg_wrapper_forwards_custom_types() {
    #[derive(Debug, Clone, PartialEq)]
    struct Point(i32, i32);

    let (poller, recorder, _clock) = harness();
    poller
        .eventually(|Arg(p): Arg<Point>| p.0 * p.1)
        .with_arguments(args![Point(3, 4)])
        .should(eq(12));
    assert!(recorder.is_empty());
}

#[test]
fn test_observed_values_are_reread() {
    let (poller, recorder, _clock) = harness();
    let passed = poller.eventually(None::<u8>).should(be_none());
    assert!(passed);
    assert!(recorder.is_empty());
}
