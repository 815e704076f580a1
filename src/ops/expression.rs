//! Purpose: The `parseExpression` operation: raw text in, syntax tree JSON out.
//! Exports: `ExpressionOperation`.
//! Invariants: Input is wrapped as `"<text>"` verbatim (no escaping) and parsed from the configured start.
//! Invariants: Parse diagnostics and serialization failures are distinct error kinds.
use tracing::debug;

use super::{Operation, PARSE_EXPRESSION, require_params};
use crate::config::{EXPRESSION_LABEL, Pos};
use crate::core::error::{Error, ErrorKind};
use crate::hcl::expr;

#[derive(Clone, Debug)]
pub struct ExpressionOperation {
    label: String,
    start: Pos,
}

impl Default for ExpressionOperation {
    fn default() -> Self {
        Self::new(EXPRESSION_LABEL, Pos::START)
    }
}

impl ExpressionOperation {
    pub fn new(label: impl Into<String>, start: Pos) -> Self {
        Self {
            label: label.into(),
            start,
        }
    }
}

/// The text handed to the parser for `raw`.
pub(crate) fn synthesize_source(raw: &str) -> String {
    format!("\"{raw}\"")
}

impl Operation for ExpressionOperation {
    fn name(&self) -> &'static str {
        PARSE_EXPRESSION
    }

    fn call(&self, params: &[String]) -> Result<String, Error> {
        let (_unused, raw) = require_params(PARSE_EXPRESSION, params)?;
        let source = synthesize_source(raw);
        debug!(label = %self.label, bytes = source.len(), "parsing expression");
        let tree = expr::parse_expression(source.as_bytes(), &self.label, self.start).map_err(
            |diags| {
                Error::new(ErrorKind::ExpressionParse)
                    .with_message("Can not parse expression")
                    .with_source(diags)
            },
        )?;
        serde_json::to_string(&tree).map_err(|err| {
            Error::new(ErrorKind::Serialization)
                .with_message("Can not convert result to JSON")
                .with_source(err)
        })
    }
}
