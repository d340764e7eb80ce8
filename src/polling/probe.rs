//! Probe adaptation.
//!
//! Anything handed to `eventually` or `consistently` becomes a [`Probe`]:
//!
//! - a plain value (anything `Debug` that is not a function) is observed
//!   anew on every attempt;
//! - a closure is called on every attempt. Its parameters are filled in
//!   order: an optional [`Checker`], an optional [`Context`], then forwarded
//!   arguments (see [`args!`](crate::args)), optionally ending in a
//!   [`Rest`] that swallows the remainder.
//!
//! A closure returns its value directly, returns [`Returns`] to attach
//! extra values that must all be zero, or returns nothing when it takes a
//! `Checker` and reports through it.
//!
//! Closure parameters must be annotated (`|g: Checker, n: i32| ...`) so
//! the shape can be read from the type.

use std::any::{Any, TypeId};
use std::fmt::{self, Debug};
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use super::checker::{CallbackFailure, Checker, CheckerAbort};
use super::stop::{find_stop_signal, StopTrying};
use super::zero::Extra;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::format;

// =============================================================================
// Forwarded arguments
// =============================================================================

/// A type-erased argument forwarded to a probe.
#[derive(Clone)]
pub struct Argument {
    value: Arc<dyn Any + Send + Sync>,
    type_name: String,
}

impl Argument {
    /// Wrap `value`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: format::type_name::<T>(),
        }
    }

    /// Whether the argument holds a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// A clone of the argument if it holds a `T`.
    #[must_use]
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }

    /// Short type name of the held value.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Argument(<{}>)", self.type_name)
    }
}

/// Build a list of [`Argument`](crate::polling::Argument)s for
/// `with_arguments`.
///
/// ```rust
/// use testkit_eventually::args;
///
/// let forwarded = args![1, "two", 3.0];
/// assert_eq!(forwarded.len(), 3);
/// assert_eq!(forwarded[1].type_name(), "&str");
/// ```
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        ::std::vec![$($crate::polling::Argument::new($value)),*]
    };
}

/// A value that can be filled from a forwarded [`Argument`].
///
/// Implemented for primitives, `String` (which also accepts `&'static str`
/// arguments), `&'static str`, `Duration` and [`Arg`]. Implement it to
/// forward your own types without the `Arg` wrapper.
pub trait Forwarded: Sized + 'static {
    /// Name shown in signatures and errors.
    fn type_name() -> String {
        format::type_name::<Self>()
    }

    /// Extract the value, or `None` if the argument has another type.
    fn from_argument(argument: &Argument) -> Option<Self>;
}

macro_rules! forwarded_by_clone {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Forwarded for $ty {
                fn from_argument(argument: &Argument) -> Option<Self> {
                    argument.get::<Self>()
                }
            }
        )+
    };
}

forwarded_by_clone!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    Duration, &'static str,
);

impl Forwarded for String {
    fn from_argument(argument: &Argument) -> Option<Self> {
        argument
            .get::<String>()
            .or_else(|| argument.get::<&'static str>().map(str::to_owned))
    }
}

/// Forwards any clonable value.
///
/// ```rust
/// use testkit_eventually::prelude::*;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Point(i32, i32);
///
/// let passed = eventually(|Arg(p): Arg<Point>| p.0 + p.1)
///     .with_arguments(args![Point(1, 2)])
///     .should(eq(3));
/// assert!(passed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg<T>(pub T);

impl<T: Any + Clone + Send + Sync> Forwarded for Arg<T> {
    fn type_name() -> String {
        format::type_name::<T>()
    }

    fn from_argument(argument: &Argument) -> Option<Self> {
        argument.get::<T>().map(Arg)
    }
}

/// Collects every remaining forwarded argument.
///
/// Must be the last parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rest<T>(pub Vec<T>);

// =============================================================================
// Parameters
// =============================================================================

/// How a probe parameter is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A fresh [`Checker`] for the attempt.
    Checker,
    /// The configured (or first forwarded) [`Context`].
    Context,
    /// One forwarded argument.
    Fixed,
    /// All remaining forwarded arguments.
    Variadic,
}

impl ParamKind {
    fn rank(self) -> u8 {
        match self {
            Self::Checker => 0,
            Self::Context => 1,
            Self::Fixed => 2,
            Self::Variadic => 3,
        }
    }
}

/// A type that may appear as a probe parameter.
pub trait ProbeParam: Sized + 'static {
    /// How the parameter is filled.
    const KIND: ParamKind;

    /// Name shown in signatures and errors.
    fn type_name() -> String;

    /// Whether a forwarded argument can fill this parameter.
    fn accepts(argument: &Argument) -> bool;

    /// Produce the value for one call.
    fn fetch(source: &mut ParamSource<'_>) -> Option<Self>;
}

impl ProbeParam for Checker {
    const KIND: ParamKind = ParamKind::Checker;

    fn type_name() -> String {
        String::from("Checker")
    }

    fn accepts(_argument: &Argument) -> bool {
        false
    }

    fn fetch(source: &mut ParamSource<'_>) -> Option<Self> {
        Some(source.checker.clone())
    }
}

impl ProbeParam for Context {
    const KIND: ParamKind = ParamKind::Context;

    fn type_name() -> String {
        String::from("Context")
    }

    fn accepts(argument: &Argument) -> bool {
        argument.is::<Context>()
    }

    fn fetch(source: &mut ParamSource<'_>) -> Option<Self> {
        source.context()
    }
}

impl<T: Forwarded> ProbeParam for T {
    const KIND: ParamKind = ParamKind::Fixed;

    fn type_name() -> String {
        <T as Forwarded>::type_name()
    }

    fn accepts(argument: &Argument) -> bool {
        T::from_argument(argument).is_some()
    }

    fn fetch(source: &mut ParamSource<'_>) -> Option<Self> {
        source.next_argument().and_then(T::from_argument)
    }
}

impl<T: Forwarded> ProbeParam for Rest<T> {
    const KIND: ParamKind = ParamKind::Variadic;

    fn type_name() -> String {
        format!("...{}", <T as Forwarded>::type_name())
    }

    fn accepts(argument: &Argument) -> bool {
        T::from_argument(argument).is_some()
    }

    fn fetch(source: &mut ParamSource<'_>) -> Option<Self> {
        source
            .rest()
            .iter()
            .map(T::from_argument)
            .collect::<Option<Vec<_>>>()
            .map(Rest)
    }
}

/// Supplies parameter values for one probe call.
pub struct ParamSource<'s> {
    kind: &'static str,
    signature: &'s str,
    checker: &'s Checker,
    context: Option<&'s Context>,
    arguments: &'s [Argument],
    cursor: usize,
    position: usize,
}

impl<'s> ParamSource<'s> {
    fn new(
        kind: &'static str,
        signature: &'s str,
        checker: &'s Checker,
        context: Option<&'s Context>,
        arguments: &'s [Argument],
    ) -> Self {
        Self {
            kind,
            signature,
            checker,
            context,
            arguments,
            cursor: 0,
            position: 0,
        }
    }

    /// The context for this call. A `Context` forwarded as the first
    /// argument takes precedence over the configured one.
    pub fn context(&mut self) -> Option<Context> {
        if self.cursor == 0 {
            if let Some(ctx) = self.arguments.first().and_then(Argument::get::<Context>) {
                self.cursor = 1;
                return Some(ctx);
            }
        }
        self.context.cloned()
    }

    /// The next forwarded argument.
    pub fn next_argument(&mut self) -> Option<&'s Argument> {
        let argument = self.arguments.get(self.cursor)?;
        self.cursor += 1;
        Some(argument)
    }

    /// Every forwarded argument not yet taken.
    pub fn rest(&mut self) -> &'s [Argument] {
        let rest = self.arguments.get(self.cursor..).unwrap_or_default();
        self.cursor = self.arguments.len();
        rest
    }

    fn fetch<P: ProbeParam>(&mut self) -> Result<P> {
        let position = self.position;
        self.position += 1;
        let found = self
            .arguments
            .get(self.cursor)
            .map_or_else(|| String::from("nothing"), |a| a.type_name().to_owned());
        P::fetch(self).ok_or_else(|| match P::KIND {
            ParamKind::Context => Error::MissingContext { kind: self.kind },
            _ => Error::ArgumentType {
                kind: self.kind,
                signature: self.signature.to_owned(),
                position,
                expected: P::type_name(),
                found,
            },
        })
    }
}

#[derive(Debug, Clone)]
struct ParamInfo {
    kind: ParamKind,
    type_name: String,
    accepts: fn(&Argument) -> bool,
}

impl ParamInfo {
    fn of<P: ProbeParam>() -> Self {
        Self {
            kind: P::KIND,
            type_name: P::type_name(),
            accepts: P::accepts,
        }
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// What a probe returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// `()`: the probe reports through its `Checker`.
    Nothing,
    /// A single value.
    Value,
    /// A value plus extras, via [`Returns`].
    ValueWithExtras,
}

/// A primary value together with extra values that must all be zero.
///
/// ```rust
/// use testkit_eventually::polling::Returns;
///
/// let out = Returns::new(3).with(None::<String>).with(0_u8);
/// # let _ = out;
/// ```
// Must not implement Debug: plain outputs are selected by `Debug`.
pub struct Returns<V> {
    value: V,
    extras: Vec<Box<dyn Extra>>,
}

impl<V> Returns<V> {
    /// Start with the primary value.
    pub fn new(value: V) -> Self {
        Self {
            value,
            extras: Vec::new(),
        }
    }

    /// Append an extra value.
    #[must_use]
    pub fn with<E: Extra>(mut self, extra: E) -> Self {
        self.extras.push(Box::new(extra));
        self
    }
}

/// A probe result split into its parts.
pub struct Parts<V> {
    value: V,
    extras: Vec<Box<dyn Extra>>,
}

/// Output types a probe may return. `M` is a marker that keeps the impls
/// apart.
pub trait ProbeOutput<M>: Sized + 'static {
    /// The value handed to the matcher.
    type Value: 'static;

    /// Shape of the output.
    fn shape() -> ReturnShape;

    /// Split into parts.
    fn into_parts(self) -> Parts<Self::Value>;
}

/// Marker types distinguishing probe impls.
#[doc(hidden)]
pub mod markers {
    /// A value observed on every attempt.
    pub struct Observed;
    /// A closure called on every attempt.
    pub struct Function;
    /// A single returned value.
    pub struct Single;
    /// A value with extras.
    pub struct WithExtras;
}

impl<V: Debug + 'static> ProbeOutput<markers::Single> for V {
    type Value = V;

    fn shape() -> ReturnShape {
        if TypeId::of::<V>() == TypeId::of::<()>() {
            ReturnShape::Nothing
        } else {
            ReturnShape::Value
        }
    }

    fn into_parts(self) -> Parts<V> {
        Parts {
            value: self,
            extras: Vec::new(),
        }
    }
}

impl<V: 'static> ProbeOutput<markers::WithExtras> for Returns<V> {
    type Value = V;

    fn shape() -> ReturnShape {
        ReturnShape::ValueWithExtras
    }

    fn into_parts(self) -> Parts<V> {
        Parts {
            value: self.value,
            extras: self.extras,
        }
    }
}

// =============================================================================
// Shapes
// =============================================================================

/// The parameter and return structure of a function probe.
#[derive(Debug, Clone)]
pub struct ProbeShape {
    params: Vec<ParamInfo>,
    returns: ReturnShape,
    signature: String,
}

impl ProbeShape {
    fn new<Out: 'static>(params: Vec<ParamInfo>, returns: ReturnShape) -> Self {
        let names: Vec<_> = params.iter().map(|p| p.type_name.as_str()).collect();
        let mut signature = format!("fn({})", names.join(", "));
        if returns != ReturnShape::Nothing {
            signature.push_str(" -> ");
            signature.push_str(&format::type_name::<Out>());
        }
        Self {
            params,
            returns,
            signature,
        }
    }

    /// Whether the first parameter is a [`Checker`].
    #[must_use]
    pub fn takes_checker(&self) -> bool {
        self.params
            .first()
            .is_some_and(|p| p.kind == ParamKind::Checker)
    }

    /// Whether a [`Context`] parameter is declared.
    #[must_use]
    pub fn takes_context(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::Context)
    }

    /// Number of single forwarded-argument parameters.
    #[must_use]
    pub fn fixed_args(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Fixed)
            .count()
    }

    /// Whether the last parameter is a [`Rest`].
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.params
            .last()
            .is_some_and(|p| p.kind == ParamKind::Variadic)
    }

    /// What the probe returns.
    #[must_use]
    pub fn returns(&self) -> ReturnShape {
        self.returns
    }

    /// Rendered signature, e.g. `fn(Checker, i32) -> String`.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    fn well_ordered(&self) -> bool {
        let mut previous = None;
        for param in &self.params {
            let rank = param.kind.rank();
            if let Some(prev) = previous {
                let repeated = rank == prev && param.kind != ParamKind::Fixed;
                if rank < prev || repeated {
                    return false;
                }
            }
            previous = Some(rank);
        }
        true
    }

    /// Check the shape against what the assertion will supply.
    pub(crate) fn validate(
        &self,
        kind: &'static str,
        context: Option<&Context>,
        arguments: &[Argument],
    ) -> Result<()> {
        if !self.well_ordered()
            || (self.returns == ReturnShape::Nothing && !self.takes_checker())
        {
            return Err(Error::InvalidSignature {
                kind,
                signature: self.signature.clone(),
            });
        }

        let forwarded_context =
            self.takes_context() && arguments.first().is_some_and(Argument::is::<Context>);
        let injected_context = self.takes_context() && !forwarded_context;
        if injected_context && context.is_none() {
            return Err(Error::MissingContext { kind });
        }

        let supplied =
            usize::from(self.takes_checker()) + usize::from(injected_context) + arguments.len();
        let declared = self.params.len();
        let fits = if self.is_variadic() {
            supplied + 1 >= declared
        } else {
            supplied == declared
        };
        if !fits {
            return Err(Error::argument_count(
                kind,
                self.signature.as_str(),
                declared,
                supplied,
            ));
        }

        let mut forwarded = arguments.iter().skip(usize::from(forwarded_context));
        for (position, param) in self.params.iter().enumerate() {
            let candidates: Vec<&Argument> = match param.kind {
                ParamKind::Checker | ParamKind::Context => continue,
                ParamKind::Fixed => forwarded.next().into_iter().collect(),
                ParamKind::Variadic => forwarded.by_ref().collect(),
            };
            if let Some(mismatch) = candidates.into_iter().find(|a| !(param.accepts)(a)) {
                return Err(Error::ArgumentType {
                    kind,
                    signature: self.signature.clone(),
                    position,
                    expected: param.type_name.clone(),
                    found: mismatch.type_name().to_owned(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Probes
// =============================================================================

type ProbeFn<'a, T> = Box<dyn FnMut(&mut ParamSource<'_>) -> Result<Parts<T>> + 'a>;

/// An adapted probe.
pub struct Probe<'a, T> {
    inner: ProbeInner<'a, T>,
}

enum ProbeInner<'a, T> {
    Observed(T),
    Function {
        shape: ProbeShape,
        checker: Checker,
        call: ProbeFn<'a, T>,
    },
}

impl<'a, T: 'static> Probe<'a, T> {
    fn observed(value: T) -> Self {
        Self {
            inner: ProbeInner::Observed(value),
        }
    }

    fn function<F>(shape: ProbeShape, call: F) -> Self
    where
        F: FnMut(&mut ParamSource<'_>) -> Result<Parts<T>> + 'a,
    {
        Self {
            inner: ProbeInner::Function {
                shape,
                checker: Checker::new(),
                call: Box::new(call),
            },
        }
    }

    /// The shape of a function probe; `None` for observed values.
    #[must_use]
    pub fn shape(&self) -> Option<&ProbeShape> {
        match &self.inner {
            ProbeInner::Observed(_) => None,
            ProbeInner::Function { shape, .. } => Some(shape),
        }
    }

    /// Whether the probe observes a value rather than calling a function.
    #[must_use]
    pub fn is_observed(&self) -> bool {
        matches!(self.inner, ProbeInner::Observed(_))
    }

    pub(crate) fn validate(
        &self,
        kind: &'static str,
        context: Option<&Context>,
        arguments: &[Argument],
    ) -> Result<()> {
        match self.shape() {
            None => Ok(()),
            Some(shape) => shape.validate(kind, context, arguments),
        }
    }

    /// Run one attempt.
    ///
    /// Stop signals and checker aborts raised by the probe are recovered;
    /// any other panic continues to unwind.
    pub(crate) fn invoke(
        &mut self,
        kind: &'static str,
        context: Option<&Context>,
        arguments: &[Argument],
    ) -> Result<Invocation<'_, T>> {
        let (shape, checker, call) = match &mut self.inner {
            ProbeInner::Observed(value) => return Ok(Invocation::observed(value)),
            ProbeInner::Function {
                shape,
                checker,
                call,
            } => (&*shape, &*checker, call),
        };
        let returns_nothing = shape.returns == ReturnShape::Nothing;

        checker.reset();
        let mut source = ParamSource::new(kind, &shape.signature, checker, context, arguments);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(&mut source)));

        match outcome {
            Ok(parts) => {
                let Parts { value, extras } = parts?;
                let stop = find_stop_signal(&value)
                    .or_else(|| extras.iter().find_map(|e| find_stop_signal(e.as_any())));
                Ok(Invocation {
                    value: Some(Actual::Owned(value)),
                    extras,
                    failure: checker.take_failure(),
                    stop,
                    interrupted: false,
                    returns_nothing,
                })
            }
            Err(payload) => {
                let payload = match payload.downcast::<StopTrying>() {
                    Ok(stop) => return Ok(Invocation::interrupted(*stop, returns_nothing)),
                    Err(payload) => payload,
                };
                if payload.is::<CheckerAbort>() {
                    return Ok(Invocation::aborted(checker.take_failure(), returns_nothing));
                }
                panic::resume_unwind(payload)
            }
        }
    }
}

impl<T> Debug for Probe<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ProbeInner::Observed(_) => f.write_str("Probe::Observed"),
            ProbeInner::Function { shape, .. } => {
                write!(f, "Probe::Function({})", shape.signature)
            }
        }
    }
}

/// The value an attempt produced.
pub(crate) enum Actual<'p, T> {
    Borrowed(&'p T),
    Owned(T),
}

impl<T> Deref for Actual<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Self::Borrowed(value) => value,
            Self::Owned(value) => value,
        }
    }
}

/// Everything one attempt produced.
pub(crate) struct Invocation<'p, T> {
    /// `None` when the probe was aborted or interrupted.
    pub(crate) value: Option<Actual<'p, T>>,
    pub(crate) extras: Vec<Box<dyn Extra>>,
    pub(crate) failure: Option<CallbackFailure>,
    pub(crate) stop: Option<StopTrying>,
    /// The stop signal was raised rather than returned.
    pub(crate) interrupted: bool,
    pub(crate) returns_nothing: bool,
}

impl<'p, T> Invocation<'p, T> {
    fn observed(value: &'p T) -> Self {
        Self {
            value: Some(Actual::Borrowed(value)),
            extras: Vec::new(),
            failure: None,
            stop: None,
            interrupted: false,
            returns_nothing: false,
        }
    }

    fn interrupted(stop: StopTrying, returns_nothing: bool) -> Self {
        Self {
            value: None,
            extras: Vec::new(),
            failure: None,
            stop: Some(stop),
            interrupted: true,
            returns_nothing,
        }
    }

    fn aborted(failure: Option<CallbackFailure>, returns_nothing: bool) -> Self {
        Self {
            value: None,
            extras: Vec::new(),
            failure,
            stop: None,
            interrupted: false,
            returns_nothing,
        }
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Anything that can be polled. `M` is inferred; never name it.
pub trait IntoProbe<'a, M> {
    /// The value handed to the matcher on every attempt.
    type Value: 'static;

    /// Adapt into a probe.
    fn into_probe(self) -> Probe<'a, Self::Value>;
}

impl<'a, T: Debug + 'static> IntoProbe<'a, markers::Observed> for T {
    type Value = T;

    fn into_probe(self) -> Probe<'a, T> {
        Probe::observed(self)
    }
}

macro_rules! impl_into_probe {
    ($($param:ident $arg:ident),*) => {
        impl<'a, Func, Out, OutMarker, $($param),*>
            IntoProbe<'a, (markers::Function, OutMarker, fn($($param),*) -> Out)> for Func
        where
            Func: FnMut($($param),*) -> Out + 'a,
            Out: ProbeOutput<OutMarker>,
            OutMarker: 'static,
            $($param: ProbeParam,)*
        {
            type Value = Out::Value;

            #[allow(unused_variables, unused_mut)]
            fn into_probe(self) -> Probe<'a, Self::Value> {
                let params = vec![$(ParamInfo::of::<$param>()),*];
                let shape = ProbeShape::new::<Out>(params, Out::shape());
                let mut func = self;
                Probe::function(shape, move |source: &mut ParamSource<'_>| {
                    $(let $arg = source.fetch::<$param>()?;)*
                    Ok(func($($arg),*).into_parts())
                })
            }
        }
    };
}

impl_into_probe!();
impl_into_probe!(P0 p0);
impl_into_probe!(P0 p0, P1 p1);
impl_into_probe!(P0 p0, P1 p1, P2 p2);
impl_into_probe!(P0 p0, P1 p1, P2 p2, P3 p3);
impl_into_probe!(P0 p0, P1 p1, P2 p2, P3 p3, P4 p4);
impl_into_probe!(P0 p0, P1 p1, P2 p2, P3 p3, P4 p4, P5 p5);
