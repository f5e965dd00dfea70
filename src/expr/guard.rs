//! First-pass rejection of forbidden expression text.
//!
//! The grammar in [`super::parser`] already has no way to reach attributes,
//! imports or statements. This filter keeps assumptions documents written for
//! looser evaluators failing loudly with a dedicated error instead of a
//! generic syntax error.

use crate::{Error, Result};

/// Substrings that are never allowed anywhere in an expression.
pub const FORBIDDEN_PATTERNS: [&str; 9] = [
    "__",
    "import",
    "exec",
    "eval",
    "open",
    "os.",
    "sys.",
    "subprocess",
    ";",
];

/// Reject `expression` if it contains any of [`FORBIDDEN_PATTERNS`].
///
/// Matching is plain, case-sensitive substring search.
///
/// # Errors
/// Returns [`Error::UnsafeExpression`] naming the first pattern found.
pub fn check_safe(expression: &str) -> Result<()> {
    match FORBIDDEN_PATTERNS.iter().find(|p| expression.contains(**p)) {
        Some(pattern) => Err(Error::UnsafeExpression {
            expression: expression.to_string(),
            pattern: (*pattern).to_string(),
        }),
        None => Ok(()),
    }
}
