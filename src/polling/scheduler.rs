//! The polling loop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::evaluate::{evaluate, Direction, Judgement};
use super::probe::{Argument, Probe};
use super::report::Termination;
use crate::assertions::Matcher;
use crate::clock::Clock;
use crate::context::{Context, Detach, ProgressReporter};
use crate::error::Result;

/// Which kind of assertion is polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    /// Must hold at some point before the timeout.
    Eventually,
    /// Must hold on every attempt until the duration elapses.
    Consistently,
}

impl Kind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Eventually => "Eventually",
            Self::Consistently => "Consistently",
        }
    }
}

/// Everything a single run needs besides the probe and matcher.
pub(crate) struct Schedule<'r> {
    pub(crate) kind: Kind,
    pub(crate) direction: Direction,
    pub(crate) timeout: Duration,
    pub(crate) interval: Duration,
    pub(crate) context: Option<&'r Context>,
    pub(crate) arguments: &'r [Argument],
    pub(crate) clock: &'r dyn Clock,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Succeeded,
    Failed {
        termination: Termination,
        reason: String,
        elapsed: Duration,
    },
}

/// The last evaluated attempt.
#[derive(Debug, Default)]
struct Verdict {
    passed: bool,
    reason: String,
}

struct Run<'r> {
    schedule: &'r Schedule<'r>,
    started: Duration,
    attempts: usize,
    last: Option<Verdict>,
    progress: Arc<Mutex<String>>,
}

impl<'r> Run<'r> {
    fn elapsed(&self) -> Duration {
        self.schedule.clock.now().saturating_sub(self.started)
    }

    fn cancelled(&self) -> bool {
        self.schedule.context.is_some_and(Context::is_done)
    }

    fn reason(&self) -> String {
        self.last
            .as_ref()
            .map(|verdict| verdict.reason.clone())
            .unwrap_or_default()
    }

    fn fail(&self, termination: Termination, reason: String) -> Outcome {
        self.finish(Outcome::Failed {
            termination,
            reason,
            elapsed: self.elapsed(),
        })
    }

    fn succeed(&self) -> Outcome {
        self.finish(Outcome::Succeeded)
    }

    fn finish(&self, outcome: Outcome) -> Outcome {
        let schedule = self.schedule;
        debug!(
            kind = schedule.kind.name(),
            direction = ?schedule.direction,
            attempts = self.attempts,
            elapsed = ?self.elapsed(),
            outcome = ?outcome,
            "polling finished"
        );
        outcome
    }

    fn expired(&self) -> Outcome {
        match self.schedule.kind {
            Kind::Eventually => self.fail(Termination::TimedOut, self.reason()),
            Kind::Consistently => self.succeed(),
        }
    }

    fn record(&mut self, passed: bool, reason: String) {
        self.progress.lock().clone_from(&reason);
        self.last = Some(Verdict { passed, reason });
    }
}

/// Poll `probe` until the schedule decides.
///
/// Returns an error only if a parameter cannot be filled, which validation
/// before the first attempt rules out.
pub(crate) fn run<T, M>(probe: &mut Probe<'_, T>, matcher: &M, schedule: &Schedule<'_>) -> Result<Outcome>
where
    T: 'static,
    M: Matcher<T> + ?Sized,
{
    let oracle = schedule.kind == Kind::Eventually && probe.is_observed();
    let progress = Arc::new(Mutex::new(String::new()));
    let _detach = attach_progress(schedule.context, &progress);

    let mut run = Run {
        schedule,
        started: schedule.clock.now(),
        attempts: 0,
        last: None,
        progress,
    };

    loop {
        if run.cancelled() {
            return Ok(run.fail(Termination::Cancelled, run.reason()));
        }

        run.attempts += 1;
        let invocation = probe.invoke(schedule.kind.name(), schedule.context, schedule.arguments)?;
        match evaluate(invocation, matcher, schedule.direction, oracle) {
            Judgement::Interrupted(stop) => {
                trace!(attempt = run.attempts, reason = %stop, "probe raised a stop signal");
                let passed = run.last.as_ref().is_some_and(|verdict| verdict.passed);
                return Ok(match schedule.kind {
                    Kind::Consistently if passed => run.succeed(),
                    _ => run.fail(Termination::Stopped(stop.reason()), run.reason()),
                });
            }
            Judgement::Evaluated(evaluation) => {
                trace!(
                    attempt = run.attempts,
                    passed = evaluation.passed,
                    stop = evaluation.stop.is_some(),
                    "attempt evaluated"
                );
                let passed = evaluation.passed;
                run.record(passed, evaluation.reason.clone());

                match schedule.kind {
                    Kind::Eventually => {
                        if passed {
                            return Ok(run.succeed());
                        }
                        if let Some(stop) = evaluation.stop {
                            return Ok(run.fail(Termination::Stopped(stop.reason()), evaluation.reason));
                        }
                        if let Some(explanation) = evaluation.no_future_change {
                            return Ok(run.fail(Termination::NoFutureChange, explanation));
                        }
                    }
                    Kind::Consistently => {
                        if !passed {
                            let termination = evaluation
                                .stop
                                .map_or(Termination::Failed, |stop| Termination::Stopped(stop.reason()));
                            return Ok(run.fail(termination, evaluation.reason));
                        }
                        if evaluation.stop.is_some() {
                            return Ok(run.succeed());
                        }
                    }
                }
            }
        }

        if run.cancelled() {
            return Ok(run.fail(Termination::Cancelled, run.reason()));
        }
        let remaining = schedule.timeout.saturating_sub(run.elapsed());
        if remaining.is_zero() {
            return Ok(run.expired());
        }
        schedule
            .clock
            .sleep(schedule.interval.min(remaining), schedule.context);
        if run.cancelled() {
            return Ok(run.fail(Termination::Cancelled, run.reason()));
        }
        if run.elapsed() >= schedule.timeout {
            return Ok(run.expired());
        }
    }
}

fn attach_progress(context: Option<&Context>, progress: &Arc<Mutex<String>>) -> Option<Detach> {
    let attacher = context?.progress_attacher()?;
    let latest = Arc::clone(progress);
    let reporter: ProgressReporter = Arc::new(move || latest.lock().clone());
    Some(attacher.attach(reporter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::{eq, gt};
    use crate::clock::MockClock;
    use crate::polling::{IntoProbe, Returns, StopTrying};

    fn schedule<'r>(kind: Kind, clock: &'r MockClock, context: Option<&'r Context>) -> Schedule<'r> {
        Schedule {
            kind,
            direction: Direction::Positive,
            timeout: Duration::from_millis(100),
            interval: Duration::from_millis(10),
            context,
            arguments: &[],
            clock,
        }
    }

    fn probe<'a, M, P: IntoProbe<'a, M>>(actual: P) -> Probe<'a, P::Value> {
        actual.into_probe()
    }

    #[test]
    fn test_eventually_first_attempt_is_immediate() {
        let clock = MockClock::new();
        let mut p = probe(|| 1);
        let outcome = run(&mut p, &eq(1), &schedule(Kind::Eventually, &clock, None)).unwrap();
        assert_eq!(outcome, Outcome::Succeeded);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn test_eventually_times_out_with_last_reason() {
        let clock = MockClock::new();
        let mut calls = 0;
        let mut p = probe(|| {
            calls += 1;
            calls
        });
        let outcome = run(&mut p, &gt(1000), &schedule(Kind::Eventually, &clock, None)).unwrap();
        drop(p);
        assert_eq!(calls, 10);
        match outcome {
            Outcome::Failed {
                termination,
                reason,
                elapsed,
            } => {
                assert_eq!(termination, Termination::TimedOut);
                assert!(reason.contains("<i32>: 10"));
                assert_eq!(elapsed, Duration::from_millis(100));
            }
            Outcome::Succeeded => panic!("expected a timeout"),
        }
    }

    #[test]
    fn test_sleep_is_clamped_to_remaining_time() {
        let clock = MockClock::new();
        let mut p = probe(|| 0);
        let mut plan = schedule(Kind::Eventually, &clock, None);
        plan.timeout = Duration::from_millis(25);
        run(&mut p, &eq(1), &plan).unwrap();
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_millis(10),
                Duration::from_millis(10),
                Duration::from_millis(5)
            ]
        );
    }

    #[test]
    fn test_consistently_succeeds_at_duration() {
        let clock = MockClock::new();
        let mut p = probe(|| 1);
        let outcome = run(&mut p, &eq(1), &schedule(Kind::Consistently, &clock, None)).unwrap();
        assert_eq!(outcome, Outcome::Succeeded);
        assert_eq!(clock.now(), Duration::from_millis(100));
    }

    #[test]
    fn test_consistently_honours_returned_stop() {
        let clock = MockClock::new();
        let mut calls = 0;
        let mut p = probe(|| {
            calls += 1;
            let stop = (calls == 3).then(|| StopTrying::new("enough"));
            Returns::new(1).with(stop)
        });
        let outcome = run(&mut p, &eq(1), &schedule(Kind::Consistently, &clock, None)).unwrap();
        drop(p);
        assert_eq!(outcome, Outcome::Succeeded);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_interrupt_without_previous_attempt_fails() {
        let clock = MockClock::new();
        let mut p = probe(|| -> i32 { StopTrying::new("nope").now() });
        let outcome = run(&mut p, &eq(1), &schedule(Kind::Consistently, &clock, None)).unwrap();
        assert_eq!(
            outcome,
            Outcome::Failed {
                termination: Termination::Stopped(String::from("nope")),
                reason: String::new(),
                elapsed: Duration::ZERO,
            }
        );
    }

    #[test]
    fn test_cancelled_context_fails_before_first_attempt() {
        let clock = MockClock::new();
        let (ctx, cancel) = Context::background().with_cancel();
        cancel.cancel();
        let mut calls = 0;
        let mut p = probe(|| {
            calls += 1;
            1
        });
        let outcome = run(&mut p, &eq(1), &schedule(Kind::Eventually, &clock, Some(&ctx))).unwrap();
        drop(p);
        assert_eq!(calls, 0);
        assert!(matches!(
            outcome,
            Outcome::Failed {
                termination: Termination::Cancelled,
                ..
            }
        ));
    }
}
