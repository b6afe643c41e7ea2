//! Session unlock with passphrase retry logic.

use std::io::IsTerminal;

use quire_core::{QuireError, Session};

use crate::errors::{classify, CliError};
use crate::helpers::{prompt_passphrase, secret_from_env};
use crate::ui::with_spinner;

use super::context::AppContext;

pub const PASSPHRASE_ENV: &str = "QUIRE_PASSPHRASE";

/// Prompts per invocation. The core rate limiter still counts every miss.
const MAX_PROMPTS: u32 = 3;

/// Map a core error to a CLI error with an exit code where one applies.
pub fn into_cli_error(err: QuireError) -> anyhow::Error {
    match classify(&err) {
        Some(cli_err) => cli_err.into(),
        None => err.into(),
    }
}

/// Unlock `session` from `QUIRE_PASSPHRASE` or interactive prompts.
///
/// A lockout is reported before any passphrase is read.
pub async fn unlock_with_retry(
    ctx: &AppContext<'_>,
    session: &Session,
    no_input: bool,
) -> anyhow::Result<()> {
    if session.is_unlocked().await {
        return Ok(());
    }
    if !session.is_initialized().await? {
        return Err(CliError::not_initialized().into());
    }
    let status = session.rate_limiter().check_lockout().await?;
    if status.locked {
        return Err(CliError::locked_out(status.minutes_left).into());
    }

    let ui = ctx.default_ui()?;
    if let Some(passphrase) = secret_from_env(PASSPHRASE_ENV) {
        return with_spinner(&ui, "Unlocking", session.unlock(&passphrase))
            .await
            .map_err(into_cli_error);
    }

    let interactive = std::io::stdin().is_terminal() && !no_input;
    let test_attempts = if !interactive && cfg!(feature = "test-support") {
        std::env::var("QUIRE_TEST_PASSPHRASE_ATTEMPTS")
            .ok()
            .map(|value| {
                value
                    .split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect::<Vec<String>>()
            })
    } else {
        None
    };
    let max_prompts = if interactive || test_attempts.is_some() {
        MAX_PROMPTS
    } else {
        1
    };

    let mut prompts: u32 = 0;
    loop {
        prompts += 1;
        let passphrase = match test_attempts.as_ref() {
            Some(values) => values
                .get((prompts - 1) as usize)
                .cloned()
                .map(secrecy::SecretString::from)
                .ok_or_else(|| anyhow::anyhow!("No passphrase attempts remaining"))?,
            None => prompt_passphrase("Passphrase", interactive)?,
        };

        match with_spinner(&ui, "Unlocking", session.unlock(&passphrase)).await {
            Ok(()) => return Ok(()),
            Err(QuireError::IncorrectPassphrase { attempts_remaining })
                if prompts < max_prompts && attempts_remaining > 0 =>
            {
                eprintln!(
                    "Incorrect passphrase. {} attempt{} remaining.",
                    attempts_remaining,
                    if attempts_remaining == 1 { "" } else { "s" }
                );
            }
            Err(err) => return Err(into_cli_error(err)),
        }
    }
}
