//! Purpose: Adapters over the `hcl-edit` parser used by the bridge operations.
//! Exports: `convert` (document to JSON), `expr` (expression to AST JSON), `merge`, `files`.
//! Role: External-collaborator seam; grammar lives in `hcl-edit`, JSON shape rules live here.
//! Invariants: Source text is sliced only through parser-reported spans.
use std::fmt;
use std::ops::Range;

use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

pub mod convert;
pub mod expr;
#[cfg(not(target_arch = "wasm32"))]
pub mod files;
pub mod merge;

/// Render an HCL number as a JSON number, falling back to its text form.
pub(crate) fn number_value(number: &impl fmt::Display) -> Value {
    let text = number.to_string();
    match serde_json::from_str::<serde_json::Number>(&text) {
        Ok(number) => Value::Number(number),
        Err(_) => Value::String(text),
    }
}

pub(crate) fn slice_span<'a>(
    source: &'a str,
    span: Option<Range<usize>>,
    kind: ErrorKind,
) -> Result<&'a str, Error> {
    let span = span.ok_or_else(|| {
        Error::new(kind).with_message("parser did not report a source range for an expression")
    })?;
    source.get(span.clone()).ok_or_else(|| {
        Error::new(kind).with_message(format!(
            "source range {}..{} is outside the input",
            span.start, span.end
        ))
    })
}
