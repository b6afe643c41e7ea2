mod export;
mod import;

pub use export::handle_export;
pub use import::handle_import;

use secrecy::{ExposeSecret, SecretString};

use quire_core::crypto::validate_passphrase;

use crate::helpers::{prompt_new_passphrase, prompt_passphrase, secret_from_env};

pub const EXPORT_PASSWORD_ENV: &str = "QUIRE_EXPORT_PASSWORD";

/// Password for a new protected backup, confirmed when prompted.
fn new_export_password(interactive: bool) -> anyhow::Result<SecretString> {
    let password = match secret_from_env(EXPORT_PASSWORD_ENV) {
        Some(password) => password,
        None => prompt_new_passphrase("Export password", interactive)?,
    };
    validate_passphrase(password.expose_secret())?;
    Ok(password)
}

fn existing_export_password(interactive: bool) -> anyhow::Result<SecretString> {
    match secret_from_env(EXPORT_PASSWORD_ENV) {
        Some(password) => Ok(password),
        None => prompt_passphrase("Backup password", interactive),
    }
}
