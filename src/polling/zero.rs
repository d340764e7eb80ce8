//! Zero-value checks for extra probe results.
//!
//! Every value a probe returns beyond the first must be "zero" for an
//! attempt to count: `None`, `Ok(())`, `0`, `false`, an empty string or
//! collection. Anything else is reported as an unexpected value.

use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use super::StopTrying;
use crate::format;

/// Whether a value is its type's zero value.
///
/// Implemented for primitives, strings, collections, `Option` (only `None`
/// is zero), `Result` (`Ok` of a zero value), tuples, and pointer-like types
/// (which check the pointee). Implement it for your own types, or use
/// [`impl_is_zero!`](crate::impl_is_zero) for types that are `Default +
/// PartialEq`.
pub trait IsZero {
    /// Returns `true` for the zero value.
    fn is_zero(&self) -> bool;
}

macro_rules! zero_by_eq {
    ($zero:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl IsZero for $ty {
                fn is_zero(&self) -> bool {
                    *self == $zero
                }
            }
        )+
    };
}

zero_by_eq!(0 => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
zero_by_eq!(0.0 => f32, f64);
zero_by_eq!(false => bool);
zero_by_eq!('\0' => char);
zero_by_eq!(Duration::ZERO => Duration);

impl IsZero for () {
    fn is_zero(&self) -> bool {
        true
    }
}

impl IsZero for str {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for Cow<'_, str> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! zero_when_empty {
    ($($ty:ident<$($param:ident),+>),+ $(,)?) => {
        $(
            impl<$($param),+> IsZero for $ty<$($param),+> {
                fn is_zero(&self) -> bool {
                    self.is_empty()
                }
            }
        )+
    };
}

zero_when_empty!(Vec<T>, VecDeque<T>, HashMap<K, V>, HashSet<T>, BTreeMap<K, V>, BTreeSet<T>);

impl<T> IsZero for [T] {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsZero for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T: IsZero, E> IsZero for Result<T, E> {
    fn is_zero(&self) -> bool {
        self.as_ref().is_ok_and(IsZero::is_zero)
    }
}

impl<T: IsZero + ?Sized> IsZero for &T {
    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }
}

impl<T: IsZero + ?Sized> IsZero for Box<T> {
    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }
}

impl<T: IsZero + ?Sized> IsZero for Rc<T> {
    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }
}

impl<T: IsZero + ?Sized> IsZero for Arc<T> {
    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }
}

macro_rules! zero_tuple {
    ($($name:ident),+) => {
        impl<$($name: IsZero),+> IsZero for ($($name,)+) {
            #[allow(non_snake_case)]
            fn is_zero(&self) -> bool {
                let ($($name,)+) = self;
                true $(&& $name.is_zero())+
            }
        }
    };
}

zero_tuple!(A);
zero_tuple!(A, B);
zero_tuple!(A, B, C);
zero_tuple!(A, B, C, D);

impl IsZero for StopTrying {
    fn is_zero(&self) -> bool {
        false
    }
}

/// Implement [`IsZero`](crate::polling::IsZero) for types that are
/// `Default + PartialEq`: a value is zero when it equals the default.
///
/// ```rust
/// use testkit_eventually::impl_is_zero;
/// use testkit_eventually::polling::IsZero;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Foo {
///     bar: String,
/// }
///
/// impl_is_zero!(Foo);
///
/// assert!(Foo::default().is_zero());
/// assert!(!Foo { bar: "hi".into() }.is_zero());
/// ```
#[macro_export]
macro_rules! impl_is_zero {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::polling::IsZero for $ty {
                fn is_zero(&self) -> bool {
                    *self == <$ty as ::core::default::Default>::default()
                }
            }
        )+
    };
}

/// A type-erased extra value returned alongside a probe's primary value.
pub trait Extra: Any {
    /// Whether the value is zero; [`IsZero::is_zero`] behind the erasure.
    fn is_zero_value(&self) -> bool;

    /// `Debug` rendering of the value.
    fn render(&self) -> String;

    /// Short type name of the value.
    fn type_name(&self) -> String;

    /// Upcast for signal detection.
    fn as_any(&self) -> &dyn Any;
}

impl<T: IsZero + Debug + Any> Extra for T {
    fn is_zero_value(&self) -> bool {
        self.is_zero()
    }

    fn render(&self) -> String {
        format!("{self:?}")
    }

    fn type_name(&self) -> String {
        format::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
