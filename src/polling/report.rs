//! Failure messages and where they go.

use std::fmt::{self, Display};
use std::panic::Location;
use std::time::Duration;

/// Frames between a failed `should` and the user's call site.
pub const POLLING_FAILURE_SKIP: usize = 3;

/// Frames between a rejected configuration and the user's call site.
pub const CONFIGURATION_FAILURE_SKIP: usize = 2;

/// Optional text printed above the failure reason.
///
/// Built from a literal, a template with `{}` placeholders and arguments
/// (see [`describe!`](crate::describe)), or a closure. Nothing is rendered
/// unless the assertion fails.
pub enum Description {
    /// Literal text.
    Text(String),
    /// `{}` placeholders filled in order; `{{` and `}}` escape braces.
    Template {
        /// The template.
        template: String,
        /// The arguments, one per placeholder.
        args: Vec<Box<dyn Display>>,
    },
    /// Produced on demand.
    Lazy(Box<dyn Fn() -> String>),
}

impl Description {
    /// A description rendered by `render` when a failure message is built.
    pub fn lazy(render: impl Fn() -> String + 'static) -> Self {
        Self::Lazy(Box::new(render))
    }

    /// A template filled with `args`.
    pub fn template(template: impl Into<String>, args: Vec<Box<dyn Display>>) -> Self {
        Self::Template {
            template: template.into(),
            args,
        }
    }

    /// The rendered text.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Template { template, args } => fill(template, args),
            Self::Lazy(render) => render(),
        }
    }
}

fn fill(template: &str, args: &[Box<dyn Display>]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('{', Some('{')) | ('}', Some('}')) => {
                chars.next();
                out.push(c);
            }
            ('{', Some('}')) => {
                chars.next();
                match args.next() {
                    Some(arg) => out.push_str(&arg.to_string()),
                    None => out.push_str("{}"),
                }
            }
            _ => out.push(c),
        }
    }
    out
}

impl From<&str> for Description {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Description {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Template { template, args } => f
                .debug_struct("Template")
                .field("template", template)
                .field("args", &args.len())
                .finish(),
            Self::Lazy(_) => f.write_str("Lazy"),
        }
    }
}

/// Build a [`Description`](crate::polling::Description) from a template
/// and arguments.
///
/// ```rust
/// use testkit_eventually::describe;
///
/// let description = describe!("boop {}", 17);
/// assert_eq!(description.render(), "boop 17");
/// ```
#[macro_export]
macro_rules! describe {
    ($template:expr $(,)?) => {
        $crate::polling::Description::from($template)
    };
    ($template:expr, $($arg:expr),+ $(,)?) => {
        $crate::polling::Description::template(
            $template,
            ::std::vec![$(::std::boxed::Box::new($arg) as ::std::boxed::Box<dyn ::std::fmt::Display>),+],
        )
    };
}

/// A terminal assertion failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// The full failure message.
    pub message: String,
    /// Frames to skip when attributing the failure.
    pub caller_skip: usize,
    /// Where `should`/`should_not` was called.
    pub location: &'static Location<'static>,
}

/// Receives assertion failures.
pub trait FailureHandler: Send + Sync {
    /// Handle one failure.
    fn fail(&self, failure: Failure);
}

/// Panics with the failure message. The default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicFailureHandler;

impl FailureHandler for PanicFailureHandler {
    fn fail(&self, failure: Failure) {
        panic!("{}\n\nat {}", failure.message, failure.location);
    }
}

/// How a polling run ended without success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Termination {
    TimedOut,
    Cancelled,
    Failed,
    /// Stopped by a signal with this reason.
    Stopped(String),
    NoFutureChange,
}

impl Termination {
    fn preamble(&self) -> String {
        match self {
            Self::TimedOut => String::from("Timed out"),
            Self::Cancelled => String::from("Context was cancelled"),
            Self::Failed => String::from("Failed"),
            Self::Stopped(reason) => format!("{reason} -"),
            Self::NoFutureChange => {
                String::from("No future change is possible.  Bailing out early")
            }
        }
    }
}

/// Assemble the failure message.
pub(crate) fn render(
    termination: &Termination,
    elapsed: Duration,
    description: Option<&Description>,
    reason: &str,
) -> String {
    let mut description = description.map(Description::render).unwrap_or_default();
    if !description.is_empty() {
        description.push('\n');
    }
    format!(
        "{} after {:.3}s.\n{description}{reason}",
        termination.preamble(),
        elapsed.as_secs_f64()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_fills_in_order() {
        let description = describe!("{} and {}", "cats", 2);
        assert_eq!(description.render(), "cats and 2");
    }

    #[test]
    fn test_template_escapes_and_missing_args() {
        let description = Description::template("{{{}}} {}", vec![Box::new(1) as Box<dyn Display>]);
        assert_eq!(description.render(), "{1} {}");
    }

    #[test]
    fn test_lazy_description_renders_on_demand() {
        let description = Description::lazy(|| String::from("boop"));
        assert_eq!(description.render(), "boop");
    }

    #[test]
    fn test_render_preambles() {
        let elapsed = Duration::from_millis(200);
        assert_eq!(
            render(&Termination::TimedOut, elapsed, None, "no match"),
            "Timed out after 0.200s.\nno match"
        );
        assert_eq!(
            render(&Termination::Stopped(String::from("Reached the end")), elapsed, None, "r"),
            "Reached the end - after 0.200s.\nr"
        );
        assert!(render(&Termination::NoFutureChange, elapsed, None, "")
            .starts_with("No future change is possible.  Bailing out early after"));
        assert!(render(&Termination::Cancelled, elapsed, None, "")
            .starts_with("Context was cancelled after"));
    }

    #[test]
    fn test_render_description_line() {
        let description = Description::from("boop");
        assert_eq!(
            render(&Termination::Failed, Duration::ZERO, Some(&description), "reason"),
            "Failed after 0.000s.\nboop\nreason"
        );
        let empty = Description::from("");
        assert_eq!(
            render(&Termination::Failed, Duration::ZERO, Some(&empty), "reason"),
            "Failed after 0.000s.\nreason"
        );
    }

    #[test]
    #[should_panic(expected = "Timed out after")]
    fn test_panic_handler_panics_with_message() {
        PanicFailureHandler.fail(Failure {
            message: String::from("Timed out after 1.000s."),
            caller_skip: POLLING_FAILURE_SKIP,
            location: Location::caller(),
        });
    }
}
