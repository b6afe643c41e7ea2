use std::io::IsTerminal;

use secrecy::ExposeSecret;

use quire_core::crypto::{check_strength, StrengthLevel};

use crate::app::{into_cli_error, AppContext, PASSPHRASE_ENV};
use crate::cli::InitArgs;
use crate::config::{write_config, QuireConfig};
use crate::errors::{CliError, EXIT_FAILURE};
use crate::helpers::{prompt_new_passphrase, secret_from_env};
use crate::ui::{badge, receipt, with_spinner, Badge};

pub async fn handle_init(ctx: &AppContext<'_>, args: &InitArgs) -> anyhow::Result<()> {
    let data_dir = ctx.data_dir()?;
    let storage = ctx.open_storage().await?;
    let session = storage.session().await?;

    if session.is_initialized().await? {
        return Err(CliError::new(
            format!("A note store already exists at {}", data_dir.display()),
            EXIT_FAILURE,
        )
        .with_hint("Run `quire unlock` to check your passphrase.")
        .into());
    }

    let interactive = std::io::stdin().is_terminal() && !args.no_input;
    let passphrase = match secret_from_env(PASSPHRASE_ENV) {
        Some(passphrase) => passphrase,
        None => prompt_new_passphrase("Choose a passphrase", interactive)?,
    };

    let ui = ctx.default_ui()?;
    let strength = check_strength(passphrase.expose_secret());
    if matches!(strength.level, StrengthLevel::Empty | StrengthLevel::Weak) && !ctx.quiet() {
        eprintln!("{}", badge(&ui, Badge::Warn, "This passphrase is weak."));
        for line in &strength.feedback {
            eprintln!("  - {}", line);
        }
    }

    with_spinner(&ui, "Deriving master key", session.initialize(&passphrase))
        .await
        .map_err(into_cli_error)?;

    let config_path = crate::app::resolve_config_path(ctx.cli())?;
    if !config_path.exists() {
        let mut config = QuireConfig::default();
        config.storage.data_dir = Some(data_dir.to_string_lossy().to_string());
        write_config(&config_path, &config)?;
    }

    storage.shutdown().await;
    tracing::info!(data_dir = %data_dir.display(), "note store initialized");

    if !ctx.quiet() {
        let data_dir = data_dir.display().to_string();
        let config_path = config_path.display().to_string();
        println!(
            "{}",
            receipt(
                &ui,
                "Initialized note store",
                &[("Data dir", data_dir.as_str()), ("Config", config_path.as_str())],
            )
        );
    }
    Ok(())
}
