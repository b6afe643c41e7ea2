//! Input and parsing helper functions for the CLI.
//!
//! - Passphrase prompting and note body reading (`input`)
//! - Note id resolution (`parsing`)

mod input;
mod parsing;

pub use input::{
    confirm, prompt_new_passphrase, prompt_passphrase, read_note_body, secret_from_env,
};
pub use parsing::resolve_note_id;
