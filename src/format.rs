//! Rendering values for failure messages.
//!
//! ```rust
//! use testkit_eventually::format;
//!
//! assert_eq!(format::object(&Some(3_u8)), "<Option<u8>>: Some(3)");
//! assert_eq!(format::type_name::<Vec<String>>(), "Vec<String>");
//! ```

use std::fmt::Debug;

/// Indentation used for values nested inside a message.
pub const INDENT: &str = "    ";

/// Renders `value` as `<type>: value`.
pub fn object<T: Debug + ?Sized>(value: &T) -> String {
    format!("<{}>: {:?}", type_name::<T>(), value)
}

/// The type name of `T` with module paths stripped.
#[must_use]
pub fn type_name<T: ?Sized>() -> String {
    short_type_name(std::any::type_name::<T>())
}

/// Strips module paths from a full type name:
/// `core::option::Option<alloc::string::String>` becomes `Option<String>`.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            out.push_str(last_component(&segment));
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(last_component(&segment));
    out
}

fn last_component(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
