//! Output formatting helpers for the CLI.

mod json;
mod text;

pub use json::{groups_json, note_json, notes_json, strength_json};
pub use text::{print_note, print_note_list, print_strength};
