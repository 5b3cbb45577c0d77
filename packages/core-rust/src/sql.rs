//! SQL text helpers used by the filter and widget compilers.
//!
//! String literals are dollar-quoted with an `$escape_N$` tag rather than
//! single-quoted, so values containing quotes need no escaping. The tag index
//! is bumped until the tag cannot terminate the literal early.

use serde_json::Number;

/// Wraps `value` in a dollar-quote delimiter that does not occur inside it.
///
/// # Examples
///
/// ```
/// use layergroup_core::sql::quote_literal;
///
/// assert_eq!(quote_literal("Spain"), "$escape_0$Spain$escape_0$");
/// assert_eq!(quote_literal("O'Hare"), "$escape_0$O'Hare$escape_0$");
/// assert_eq!(
///     quote_literal("a$escape_0$b"),
///     "$escape_1$a$escape_0$b$escape_1$"
/// );
/// ```
#[must_use]
pub fn quote_literal(value: &str) -> String {
    let mut index = 0usize;
    loop {
        let delimiter = format!("$escape_{index}$");
        // The closing delimiter must first appear where we put it.
        let body = format!("{value}{delimiter}");
        if body.find(&delimiter) == Some(value.len()) {
            return format!("{delimiter}{body}");
        }
        index += 1;
    }
}

/// Formats a numeric bound as a bare SQL number literal.
///
/// Integers keep their exact JSON text, so values beyond `f64` precision are
/// not rounded. Floats go through `f64`'s `Display`, which never uses
/// exponent notation.
#[must_use]
pub fn number_literal(value: &Number) -> String {
    match value.as_f64() {
        Some(float) if value.is_f64() => format!("{float}"),
        _ => value.to_string(),
    }
}

/// Returns `true` if `name` can be interpolated as an unquoted SQL identifier.
///
/// Accepts ASCII letters, digits and `_`, not starting with a digit.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
