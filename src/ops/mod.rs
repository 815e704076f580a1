//! Purpose: The operations the bridge exposes to its host, in native (string) form.
//! Exports: `Operation`, `ConvertOperation`, `ExpressionOperation`, `PARSE`, `PARSE_EXPRESSION`.
//! Role: Operation-specific logic behind each registered name; knows nothing about host values.
//! Invariants: Each operation runs to completion synchronously and returns exactly one outcome.
use crate::core::error::{Error, ErrorKind};

mod convert;
mod expression;

pub use convert::ConvertOperation;
pub use expression::ExpressionOperation;

pub const PARSE: &str = "parse";
pub const PARSE_EXPRESSION: &str = "parseExpression";

pub trait Operation {
    /// Registered name.
    fn name(&self) -> &'static str;

    /// Run with the invocation's parameters (callback already removed).
    fn call(&self, params: &[String]) -> Result<String, Error>;
}

/// Both operations are positional `(label, text)`; anything shorter is an argument error.
fn require_params<'a>(name: &str, params: &'a [String]) -> Result<(&'a str, &'a str), Error> {
    match params {
        [] => Err(Error::new(ErrorKind::Argument)
            .with_message("insufficient arguments: no arguments provided")
            .with_hint(format!("`{name}` expects (label, text, callback)"))),
        [_] => Err(Error::new(ErrorKind::Argument)
            .with_message(format!(
                "insufficient arguments: `{name}` expects 2 arguments, got 1"
            ))
            .with_hint(format!("`{name}` expects (label, text, callback)"))),
        [label, text, ..] => Ok((label.as_str(), text.as_str())),
    }
}
