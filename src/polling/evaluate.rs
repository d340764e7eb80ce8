//! Turning one attempt into a verdict.

use super::checker::CallbackOutcome;
use super::probe::Invocation;
use super::stop::{find_stop_signal, StopTrying};
use crate::assertions::Matcher;

/// Which way the matcher has to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// `should`: the matcher must match.
    Positive,
    /// `should_not`: the matcher must not match.
    Negative,
}

impl Direction {
    fn wants(self) -> bool {
        self == Self::Positive
    }
}

/// The verdict for one evaluated attempt.
#[derive(Debug)]
pub(crate) struct Evaluation {
    pub(crate) passed: bool,
    /// Why the attempt failed, or what a failure would have said.
    pub(crate) reason: String,
    /// A stop signal returned alongside the value.
    pub(crate) stop: Option<StopTrying>,
    /// The matcher's explanation that polling further is pointless.
    pub(crate) no_future_change: Option<String>,
}

impl Evaluation {
    fn error(text: impl std::fmt::Display, stop: Option<StopTrying>) -> Self {
        Self {
            passed: false,
            reason: format!("Error: {text}"),
            stop,
            no_future_change: None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Judgement {
    Evaluated(Evaluation),
    /// The probe raised a stop signal; nothing was judged.
    Interrupted(StopTrying),
}

/// Judge one invocation.
///
/// `oracle` enables [`Matcher::no_future_change`] and is only set for
/// `eventually` over an observed value.
pub(crate) fn evaluate<T, M>(
    invocation: Invocation<'_, T>,
    matcher: &M,
    direction: Direction,
    oracle: bool,
) -> Judgement
where
    M: Matcher<T> + ?Sized,
{
    let Invocation {
        value,
        extras,
        failure,
        stop,
        interrupted,
        returns_nothing,
    } = invocation;

    if interrupted {
        return match stop {
            Some(stop) => Judgement::Interrupted(stop),
            None => Judgement::Evaluated(Evaluation::error("probe was interrupted", None)),
        };
    }

    if returns_nothing {
        if let Some(callback) = matcher.as_callback_matcher() {
            let outcome = CallbackOutcome::from(failure);
            return Judgement::Evaluated(judge(callback, &outcome, direction, stop, false));
        }
    }

    if let Some(failure) = failure {
        return Judgement::Evaluated(Evaluation::error(failure, stop));
    }

    let Some(value) = value else {
        return Judgement::Evaluated(Evaluation::error("probe produced no value", stop));
    };

    let unexpected = extras
        .iter()
        .enumerate()
        .find(|(_, extra)| !extra.is_zero_value() && find_stop_signal(extra.as_any()).is_none());
    if let Some((index, extra)) = unexpected {
        let text = format!(
            "Unexpected non-nil/non-zero argument at index {}:\n\t<{}>: {}",
            index + 1,
            extra.type_name(),
            extra.render()
        );
        return Judgement::Evaluated(Evaluation::error(text, stop));
    }

    Judgement::Evaluated(judge(matcher, &*value, direction, stop, oracle))
}

fn judge<T, M>(
    matcher: &M,
    actual: &T,
    direction: Direction,
    stop: Option<StopTrying>,
    oracle: bool,
) -> Evaluation
where
    T: ?Sized,
    M: Matcher<T> + ?Sized,
{
    let (passed, reason) = match matcher.matches(actual) {
        Ok(matched) => {
            let reason = match direction {
                Direction::Positive => matcher.failure_message(actual),
                Direction::Negative => matcher.negated_failure_message(actual),
            };
            (matched == direction.wants(), reason)
        }
        Err(err) => (false, format!("Error: {err}")),
    };
    let no_future_change = if oracle && !passed {
        matcher.no_future_change(actual)
    } else {
        None
    };
    Evaluation {
        passed,
        reason,
        stop,
        no_future_change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::{eq, fail_with, gt, satisfies, succeed, MatchError};
    use crate::polling::{Checker, IntoProbe, Probe, Returns};

    fn probe<'a, M, P: IntoProbe<'a, M>>(actual: P) -> Probe<'a, P::Value> {
        actual.into_probe()
    }

    fn run<T: 'static, M: Matcher<T>>(
        p: &mut Probe<'_, T>,
        matcher: &M,
        direction: Direction,
    ) -> Evaluation {
        let oracle = p.is_observed();
        let invocation = p.invoke("Eventually", None, &[]).unwrap();
        match evaluate(invocation, matcher, direction, oracle) {
            Judgement::Evaluated(evaluation) => evaluation,
            Judgement::Interrupted(stop) => panic!("unexpected interrupt: {stop}"),
        }
    }

    struct Erroring;

    impl Matcher<i32> for Erroring {
        fn matches(&self, _actual: &i32) -> Result<bool, MatchError> {
            Err(MatchError::new("cannot judge"))
        }

        fn failure_message(&self, _actual: &i32) -> String {
            String::from("positive")
        }

        fn negated_failure_message(&self, _actual: &i32) -> String {
            String::from("negative")
        }
    }

    #[test]
    fn test_positive_and_negative() {
        let mut p = probe(|| 5);
        let evaluation = run(&mut p, &gt(3), Direction::Positive);
        assert!(evaluation.passed);
        assert!(evaluation.reason.contains("to be >"));

        let evaluation = run(&mut p, &gt(3), Direction::Negative);
        assert!(!evaluation.passed);
        assert!(evaluation.reason.contains("not to be >"));
    }

    #[test]
    fn test_matcher_error_fails_both_directions() {
        let mut p = probe(|| 1);
        for direction in [Direction::Positive, Direction::Negative] {
            let evaluation = run(&mut p, &Erroring, direction);
            assert!(!evaluation.passed);
            assert_eq!(evaluation.reason, "Error: cannot judge");
        }
    }

    #[test]
    fn test_non_zero_extra_is_an_error() {
        let mut p = probe(|| Returns::new(1).with(String::new()).with(Some(7_u8)));
        let evaluation = run(&mut p, &eq(1), Direction::Positive);
        assert!(!evaluation.passed);
        assert_eq!(
            evaluation.reason,
            "Error: Unexpected non-nil/non-zero argument at index 2:\n\t<Option<u8>>: Some(7)"
        );
    }

    #[test]
    fn test_returned_stop_is_judged() {
        let mut p = probe(|| Returns::new("C").with(Err::<(), _>(StopTrying::new("end"))));
        let evaluation = run(&mut p, &eq("C"), Direction::Positive);
        assert!(evaluation.passed);
        assert_eq!(evaluation.stop.unwrap().reason(), "end");
    }

    #[test]
    fn test_checker_failure_in_value_probe_is_an_error() {
        let mut p = probe(|g: Checker| {
            g.expect(false).to(eq(true));
            10
        });
        let evaluation = run(&mut p, &eq(10), Direction::Positive);
        assert!(!evaluation.passed);
        assert!(evaluation
            .reason
            .starts_with("Error: Assertion in callback at "));
    }

    #[test]
    fn test_callback_outcome_goes_to_callback_matcher() {
        let mut p = probe(|g: Checker| g.expect(1).to(eq(2)));
        let evaluation = run(&mut p, &succeed(), Direction::Positive);
        assert!(!evaluation.passed);
        assert!(evaluation.reason.contains("Assertion in callback at"));

        let evaluation = run(&mut p, &succeed(), Direction::Negative);
        assert!(evaluation.passed);

        let evaluation = run(
            &mut p,
            &fail_with(crate::assertions::contains_str("to equal")),
            Direction::Positive,
        );
        assert!(evaluation.passed);
    }

    #[test]
    fn test_clean_callback_matched_as_unit() {
        let mut p = probe(|g: Checker| g.expect(1).to(eq(1)));
        let evaluation = run(&mut p, &satisfies(|_: &()| true, "be unit"), Direction::Positive);
        assert!(evaluation.passed);

        let mut p = probe(|g: Checker| g.expect(1).to(eq(2)));
        let evaluation = run(&mut p, &satisfies(|_: &()| true, "be unit"), Direction::Positive);
        assert!(evaluation.reason.starts_with("Error: Assertion in callback"));
    }

    #[test]
    fn test_oracle_only_for_observed_failures() {
        let (tx, rx) = std::sync::mpsc::channel::<i32>();
        drop(tx);
        let mut observed = probe(rx);
        let evaluation = run(&mut observed, &crate::assertions::receive(), Direction::Positive);
        assert!(!evaluation.passed);
        assert!(evaluation.no_future_change.is_some());
    }

    #[test]
    fn test_raised_stop_interrupts() {
        let mut p = probe(|| -> i32 { StopTrying::new("out of tries").now() });
        let invocation = p.invoke("Eventually", None, &[]).unwrap();
        match evaluate(invocation, &eq(1), Direction::Positive, false) {
            Judgement::Interrupted(stop) => assert_eq!(stop.reason(), "out of tries"),
            Judgement::Evaluated(_) => panic!("expected an interrupt"),
        }
    }
}
