//! Integration tests for stopping early: stop signals and matcher hints.

mod common;

use std::sync::mpsc;
use std::time::Duration;

use common::harness;
use testkit_eventually::clock::Clock;
use testkit_eventually::prelude::*;

#[test]
fn test_returned_stop_succeeds_on_matching_final_attempt() {
    let (poller, recorder, _clock) = harness();
    let possibilities = ["A", "B", "C"];
    let mut i = 0;
    let passed = poller
        .eventually(|| {
            let possibility = possibilities[i];
            i += 1;
            let stop = (i == possibilities.len()).then(|| StopTrying::new("Reached the end"));
            Returns::new(possibility).with(stop)
        })
        .should(eq("C"));
    assert!(passed);
    assert_eq!(i, 3);
    assert!(recorder.is_empty());
}

#[test]
fn test_returned_stop_fails_otherwise() {
    let (poller, recorder, _clock) = harness();
    let possibilities = ["A", "B", "C"];
    let mut i = 0;
    let passed = poller
        .eventually(|| {
            let possibility = possibilities[i];
            i += 1;
            let stop = (i == possibilities.len()).then(|| StopTrying::new("Reached the end"));
            Returns::new(possibility).with(stop)
        })
        .should(eq("D"));
    assert!(!passed);
    assert_eq!(i, 3);
    let message = recorder.message();
    assert!(message.starts_with("Reached the end - after 0.020s.\n"));
    assert!(message.contains("Expected\n    <&str>: \"C\"\nto equal\n    <&str>: \"D\""));
}

#[test]
fn test_stop_as_primary_value() {
    let (poller, recorder, _clock) = harness();
    let passed = poller
        .eventually(|| Err::<(), _>(StopTrying::new("gave up")))
        .should(succeed());
    assert!(!passed);
    assert!(recorder.message().starts_with("gave up - after 0.000s."));
}

#[test]
fn test_stop_counts_as_success_for_consistently() {
    let (poller, recorder, _clock) = harness();
    let mut i = 0;
    let passed = poller
        .consistently(|| {
            i += 1;
            let stop = (i >= 10).then(|| stop_trying!("Reached the end at {}", 10));
            Returns::new(i).with(stop)
        })
        .with_timeout(Duration::from_secs(3600))
        .should(lte(10));
    assert!(passed);
    assert_eq!(i, 10);

    let mut i = 0;
    let passed = poller
        .consistently(|| {
            i += 1;
            if i >= 10 {
                StopTrying::new("Reached the end").now();
            }
            i
        })
        .with_timeout(Duration::from_secs(3600))
        .should(lte(10));
    assert!(passed);
    assert_eq!(i, 10);
    assert!(recorder.is_empty());
}

#[test]
fn test_raised_stop_keeps_last_failure() {
    let (poller, recorder, _clock) = harness();
    let possibilities = ["A", "B", "C"];
    let mut i: usize = 0;
    poller
        .eventually(|| {
            if i < possibilities.len() {
                i += 1;
                possibilities[i - 1]
            } else {
                StopTrying::new("Out of tries").now()
            }
        })
        .should(eq("D"));
    let message = recorder.message();
    assert!(message.starts_with("Out of tries - after 0.030s.\n"));
    assert!(message.contains("Expected\n    <&str>: \"C\"\nto equal\n    <&str>: \"D\""));
}

#[test]
fn test_raised_stop_with_checker_and_context() {
    let (poller, recorder, _clock) = harness();
    let ctx = Context::background().with_value("key", String::from("A"));
    let mut i = 0;
    poller
        .eventually(|g: Checker, ctx: Context, expected: String| {
            i += 1;
            if i >= 3 {
                StopTrying::new("Out of tries").now();
            }
            g.expect(ctx.value::<String>("key").unwrap_or_default())
                .to(eq(expected));
        })
        .with_context(ctx)
        .with_arguments(args!["B"])
        .should(succeed());
    assert_eq!(i, 3);
    let message = recorder.message();
    assert!(message.starts_with("Out of tries - after"));
    assert!(message.contains("Assertion in callback at"));
    assert!(message.contains("<String>: \"A\""));
}

#[test]
#[should_panic(expected = "welp")]
fn test_regular_panics_get_through() {
    let (poller, _recorder, _clock) = harness();
    poller
        .eventually(|| -> &'static str { panic!("welp") })
        .should(eq("A"));
}

#[test]
fn test_closed_channel_bails_out_early() {
    let (poller, recorder, clock) = harness();
    let (tx, rx) = mpsc::channel::<bool>();
    drop(tx);
    let passed = poller
        .eventually(rx)
        .with_timeout(Duration::from_millis(100))
        .should_with(receive(), "Receive gives up once the channel is closed");
    assert!(!passed);
    assert_eq!(clock.sleep_count(), 0);
    let message = recorder.message();
    assert!(message.starts_with("No future change is possible.  Bailing out early after 0.000s.\n"));
    assert!(message.contains("Receive gives up once the channel is closed\n"));
    assert!(message.contains("The channel is closed."));
}

#[test]
fn test_function_probes_never_bail_out() {
    let (poller, recorder, clock) = harness();
    let mut calls = 0;
    poller
        .eventually(|| {
            calls += 1;
            let (_tx, rx) = mpsc::channel::<bool>();
            rx
        })
        .with_timeout(Duration::from_millis(100))
        .should(receive());
    assert_eq!(calls, 10);
    assert_eq!(clock.now(), Duration::from_millis(100));
    assert!(!recorder.message().contains("No future change is possible."));
    assert!(recorder.message().starts_with("Timed out after 0.100s."));
}

#[test]
fn test_open_channel() {
    let (poller, recorder, _clock) = harness();
    let (tx, rx) = mpsc::channel();
    tx.send(7).unwrap();
    assert!(poller.eventually(rx).should(receive()));

    let (_tx, idle) = mpsc::channel::<i32>();
    assert!(poller
        .consistently(idle)
        .with_timeout(Duration::from_millis(50))
        .should_not(receive()));
    assert!(recorder.is_empty());
}

#[test]
fn test_be_closed_on_observed_channel() {
    let (poller, recorder, _clock) = harness();
    let (tx, rx) = mpsc::channel::<i32>();
    drop(tx);
    assert!(poller
        .consistently(rx)
        .with_timeout(Duration::from_millis(50))
        .should(be_closed()));
    assert!(recorder.is_empty());
}
