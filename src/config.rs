//! Purpose: Fixed configuration the bridge registers its operations with.
//! Exports: `BridgeConfig`, `ConvertOptions`, `Pos`, `NAMESPACE_GLOBAL`.
//! Role: One place for the constants the host contract depends on.
//! Invariants: Defaults reproduce the registered behavior exactly (label "test", start 1:1).
//! Invariants: Configuration is captured at registration and never changes afterwards.
use serde::{Deserialize, Serialize};

/// Global identifier under which the host publishes the namespace object.
pub const NAMESPACE_GLOBAL: &str = "__parse_terraform_config_wasm__";

/// Diagnostic label used when parsing expression fragments.
pub const EXPRESSION_LABEL: &str = "test";

/// A position in source text. Lines and columns are 1-based; `byte` is 0-based.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pos {
    pub line: usize,
    pub column: usize,
    pub byte: usize,
}

impl Pos {
    pub const START: Pos = Pos {
        line: 1,
        column: 1,
        byte: 0,
    };
}

impl Default for Pos {
    fn default() -> Self {
        Pos::START
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConvertOptions {
    /// Skip the repeated-attribute check; the last definition wins.
    pub no_key_validation: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    pub namespace: String,
    pub expression_label: String,
    pub expression_start: Pos,
    pub convert: ConvertOptions,
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: NAMESPACE_GLOBAL.to_string(),
            expression_label: EXPRESSION_LABEL.to_string(),
            expression_start: Pos::START,
            convert: ConvertOptions::default(),
            log_filter: "warn".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn with_convert_options(mut self, convert: ConvertOptions) -> Self {
        self.convert = convert;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}
