use std::io::IsTerminal;

use serde_json::Value;

use quire_core::backup::{self, ImportKeys};

use crate::app::{into_cli_error, kdf_params, AppContext};
use crate::cli::ImportArgs;
use crate::ui::{receipt, with_spinner};

use super::existing_export_password;

/// Whether the file looks like a password-protected backup.
fn needs_password(json: &str) -> bool {
    serde_json::from_str::<Value>(json)
        .ok()
        .map(|doc| {
            doc.get("format").and_then(Value::as_str) == Some(backup::FORMAT_PASSWORD_PROTECTED)
                || doc.get("type").and_then(Value::as_str) == Some(backup::TYPE_PROTECTED_NOTE)
        })
        .unwrap_or(false)
}

pub async fn handle_import(ctx: &AppContext<'_>, args: &ImportArgs) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&args.source)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.source.display(), e))?;
    let interactive = std::io::stdin().is_terminal() && !args.no_input;
    let password = if needs_password(&json) {
        Some(existing_export_password(interactive)?)
    } else {
        None
    };

    let ui = ctx.default_ui()?;
    let storage = ctx.open_storage().await?;
    let device_key = storage.device_key().await?;
    let notes = with_spinner(
        &ui,
        "Verifying backup",
        backup::import(
            &json,
            ImportKeys {
                device_key,
                password: password.as_ref(),
                params: kdf_params(),
            },
        ),
    )
    .await
    .map_err(into_cli_error)?;

    let session = ctx.unlock(&storage, args.no_input).await?;
    let master = session.require_master_key().await?;
    let records = storage.records().await?;
    for note in &notes {
        records
            .save(note, Some(&master))
            .await
            .map_err(into_cli_error)?;
    }
    storage.shutdown().await;
    tracing::info!(count = notes.len(), "backup imported");

    if !ctx.quiet() {
        let count = notes.len().to_string();
        println!(
            "{}",
            receipt(&ui, "Imported backup", &[("Notes", count.as_str())])
        );
    }
    Ok(())
}
