//! CLI errors that carry an exit code and an optional hint.

use std::fmt;

use quire_core::QuireError;

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_NOT_FOUND: i32 = 3;
pub const EXIT_AUTH_FAILED: i32 = 4;
pub const EXIT_LOCKED_OUT: i32 = 5;

#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub hint: Option<String>,
    pub code: i32,
}

impl CliError {
    pub fn new(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            hint: None,
            code,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::new(message, EXIT_NOT_FOUND).with_hint(hint)
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(message, EXIT_AUTH_FAILED)
    }

    pub fn locked_out(minutes_left: u64) -> Self {
        Self::new(
            format!(
                "Too many failed attempts. Try again in {} minute{}.",
                minutes_left,
                if minutes_left == 1 { "" } else { "s" }
            ),
            EXIT_LOCKED_OUT,
        )
    }

    pub fn not_initialized() -> Self {
        Self::not_found("No passphrase has been set for this store.", "Run `quire init` first.")
    }

    /// Print to stderr and exit the process.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self.message);
        if let Some(hint) = &self.hint {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(self.code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Map core errors that have a dedicated exit code.
pub fn classify(err: &QuireError) -> Option<CliError> {
    match err {
        QuireError::LockedOut { minutes_left } => Some(CliError::locked_out(*minutes_left)),
        QuireError::IncorrectPassphrase { attempts_remaining } => Some(
            CliError::auth_failed(format!(
                "Incorrect passphrase. {} attempt{} remaining.",
                attempts_remaining,
                if *attempts_remaining == 1 { "" } else { "s" }
            )),
        ),
        QuireError::Locked => Some(
            CliError::auth_failed("The store is locked.")
                .with_hint("Set QUIRE_PASSPHRASE or run from a terminal."),
        ),
        QuireError::NotFound(message) => Some(CliError::not_found(
            message.clone(),
            "Run `quire list` to find note IDs.",
        )),
        _ => None,
    }
}
