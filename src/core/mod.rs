//! Purpose: Host-independent building blocks shared by every bridge layer.
//! Exports: `error`.
pub mod error;
