use std::io::IsTerminal;

use quire_core::backup;
use quire_core::crypto::MasterKey;
use quire_core::{Note, StorageContext};

use crate::app::{into_cli_error, kdf_params, AppContext};
use crate::cli::ExportArgs;
use crate::commands::notes::{find_note_id, load_note};
use crate::ui::{badge, receipt, with_spinner, Badge};

use super::new_export_password;

/// Drop the note-layer fields from a decrypted note before it leaves the
/// store.
fn detach_envelope(mut note: Note) -> Note {
    note.encrypted = false;
    note.ciphertext = None;
    note.nonce = None;
    note
}

async fn decrypted_notes(
    ctx: &AppContext<'_>,
    storage: &StorageContext,
    no_input: bool,
) -> anyhow::Result<Vec<Note>> {
    let records = storage.records().await?;
    let listed = records.list_notes().await?;

    let mut master: Option<MasterKey> = None;
    if listed.iter().any(|note| note.note_envelope().is_some()) {
        let session = ctx.unlock(storage, no_input).await?;
        master = Some(session.require_master_key().await?);
    }

    let mut notes = Vec::with_capacity(listed.len());
    for note in listed {
        let loaded = records
            .load(&note.id, master.as_ref())
            .await
            .map_err(into_cli_error)?;
        notes.push(detach_envelope(loaded));
    }
    Ok(notes)
}

pub async fn handle_export(ctx: &AppContext<'_>, args: &ExportArgs) -> anyhow::Result<()> {
    let interactive = std::io::stdin().is_terminal() && !args.no_input;
    let ui = ctx.default_ui()?;
    let storage = ctx.open_storage().await?;

    let (json, count, format) = match &args.note {
        Some(query) => {
            let id = find_note_id(&storage, query).await?;
            let note = detach_envelope(load_note(ctx, &storage, &id, args.no_input).await?);
            let password = new_export_password(interactive)?;
            let json = with_spinner(
                &ui,
                "Encrypting note",
                backup::export_protected_note(&note, &password, kdf_params()),
            )
            .await?;
            (json, 1, backup::TYPE_PROTECTED_NOTE)
        }
        None => {
            let notes = decrypted_notes(ctx, &storage, args.no_input).await?;
            if args.protected {
                let password = new_export_password(interactive)?;
                let json = with_spinner(
                    &ui,
                    "Encrypting backup",
                    backup::export_protected(&notes, &password, kdf_params()),
                )
                .await?;
                (json, notes.len(), backup::FORMAT_PASSWORD_PROTECTED)
            } else {
                let json = backup::export_plaintext(&notes, storage.device_key().await?)?;
                (json, notes.len(), backup::FORMAT_PLAINTEXT)
            }
        }
    };

    quire_core::fs::write_atomic(&args.destination, json.as_bytes())?;
    storage.shutdown().await;
    tracing::info!(count, format, "backup exported");

    if format == backup::FORMAT_PLAINTEXT && !ctx.quiet() {
        eprintln!(
            "{}",
            badge(
                &ui,
                Badge::Warn,
                "Plaintext backups are readable by anyone with the file and only verify on this device."
            )
        );
    }
    if !ctx.quiet() {
        let path = args.destination.display().to_string();
        let count = count.to_string();
        println!(
            "{}",
            receipt(
                &ui,
                "Exported backup",
                &[
                    ("Path", path.as_str()),
                    ("Notes", count.as_str()),
                    ("Format", format),
                ],
            )
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_envelope_clears_note_layer() {
        let mut note = Note::new("t", "body");
        note.encrypted = true;
        note.ciphertext = Some("c".to_string());
        note.nonce = Some("n".to_string());

        let detached = detach_envelope(note);
        assert!(!detached.encrypted);
        assert!(detached.ciphertext.is_none());
        assert!(detached.nonce.is_none());
        assert_eq!(detached.content, "body");
    }
}
