//! UI primitives for the Quire CLI.
//!
//! - **Context**: environment detection (TTY, width, color)
//! - **Mode**: output mode resolution (json, plain, pretty)
//! - **Theme**: badges and colors
//! - **Render**: tables, key-value lines, receipts, hints
//! - **Progress**: spinners around slow key derivation
//! - **Format**: string utilities

mod context;
pub mod format;
mod mode;
pub mod progress;
pub mod render;
pub mod theme;

pub use context::UiContext;
pub use theme::{styled, styles, Badge};

pub use render::{badge, hint, kv, print, receipt, table, Column};

pub use progress::with_spinner;

pub use format::{format_datetime, short_id, single_line, truncate};
