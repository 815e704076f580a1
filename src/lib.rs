//! Purpose: HCL bridge library: document-to-JSON conversion and expression syntax trees,
//! exposed to hosts through a `(error, result)` callback convention.
//! Exports: `core` (errors), `config`, `hcl` (converters), `ops` (operations),
//! `marshal`/`adapter`/`registry` (host boundary), `lifecycle`, `logging`, `native`.
//! Role: Compiled as a wasm32 module for JavaScript hosts and as an rlib for the `hcl2json` CLI.
//! Invariants: Operation logic is host-agnostic; only `wasm` and `native` know a concrete value type.
pub mod adapter;
pub mod config;
pub mod core;
pub mod hcl;
pub mod lifecycle;
pub mod logging;
pub mod marshal;
pub mod native;
pub mod ops;
pub mod registry;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
