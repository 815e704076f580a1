//! Purpose: The `parse` operation: HCL document text in, JSON text out.
//! Exports: `ConvertOperation`.
//! Invariants: The filename label is only used in diagnostics; no file access happens here.
//! Invariants: Converter errors are surfaced verbatim; no partial result is ever returned.
use tracing::debug;

use super::{Operation, PARSE, require_params};
use crate::config::ConvertOptions;
use crate::core::error::{Error, ErrorKind};
use crate::hcl::convert;

#[derive(Clone, Copy, Debug, Default)]
pub struct ConvertOperation {
    options: ConvertOptions,
}

impl ConvertOperation {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }
}

impl Operation for ConvertOperation {
    fn name(&self) -> &'static str {
        PARSE
    }

    fn call(&self, params: &[String]) -> Result<String, Error> {
        let (filename, document) = require_params(PARSE, params)?;
        debug!(filename, bytes = document.len(), "converting document");
        let json = convert::to_json(document.as_bytes(), filename, self.options)?;
        String::from_utf8(json).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("converter produced non UTF-8 output")
                .with_source(err)
        })
    }
}
