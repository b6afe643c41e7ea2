use quire_core::Note;

use crate::app::{into_cli_error, AppContext};
use crate::cli::NewArgs;
use crate::helpers::read_note_body;
use crate::ui::receipt;

pub async fn handle_new(ctx: &AppContext<'_>, args: &NewArgs) -> anyhow::Result<()> {
    let mut note = match &args.from_markdown {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
            let mut note = Note::from_markdown(&text);
            note.encrypted = false;
            note.ciphertext = None;
            note.nonce = None;
            note
        }
        None => {
            let body = read_note_body(args.no_input, args.body.clone(), ctx.editor()?, None)?;
            Note::new("", body)
        }
    };
    if let Some(title) = &args.title {
        note.title = title.clone();
    }
    if !args.tag.is_empty() {
        note.set_tags(args.tag.as_slice());
    }
    if let Some(folder) = &args.folder {
        note.set_folder(Some(folder));
    }
    if let Some(color) = &args.color {
        note.set_color(Some(color));
    }
    if note.title.trim().is_empty() && note.content.trim().is_empty() {
        return Err(anyhow::anyhow!("Note is empty; nothing to save"));
    }

    let storage = ctx.open_storage().await?;
    let master = if args.plain {
        None
    } else {
        let session = ctx.unlock(&storage, args.no_input).await?;
        Some(session.require_master_key().await?)
    };

    storage
        .records()
        .await?
        .save(&note, master.as_ref())
        .await
        .map_err(into_cli_error)?;
    storage.shutdown().await;

    if !ctx.quiet() {
        let ui = ctx.default_ui()?;
        let title = note.display_title();
        let encrypted = if master.is_some() && !note.content.is_empty() {
            "yes"
        } else {
            "no"
        };
        println!(
            "{}",
            receipt(
                &ui,
                "Saved note",
                &[
                    ("ID", note.id.as_str()),
                    ("Title", title.as_str()),
                    ("Encrypted", encrypted),
                ],
            )
        );
    }
    Ok(())
}
