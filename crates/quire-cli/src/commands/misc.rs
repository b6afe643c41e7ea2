use std::io::IsTerminal;

use clap::CommandFactory;
use clap_complete::generate;
use secrecy::ExposeSecret;

use quire_core::crypto::check_strength;

use crate::app::{AppContext, PASSPHRASE_ENV};
use crate::cli::{Cli, StrengthArgs};
use crate::helpers::{prompt_passphrase, secret_from_env};
use crate::output::{print_strength, strength_json};

pub fn handle_strength(ctx: &AppContext<'_>, args: &StrengthArgs) -> anyhow::Result<()> {
    let passphrase = match secret_from_env(PASSPHRASE_ENV) {
        Some(passphrase) => passphrase,
        None => prompt_passphrase("Passphrase to rate", std::io::stdin().is_terminal())?,
    };
    let strength = check_strength(passphrase.expose_secret());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&strength_json(&strength))?);
    } else {
        print_strength(&ctx.default_ui()?, &strength);
    }
    Ok(())
}

pub fn handle_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "quire", &mut std::io::stdout());
    Ok(())
}
