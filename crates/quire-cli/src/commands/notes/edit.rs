use quire_core::QuireError;

use crate::app::{into_cli_error, AppContext};
use crate::cli::EditArgs;
use crate::helpers::read_note_body;
use crate::ui::receipt;

use super::find_note_id;

pub async fn handle_edit(ctx: &AppContext<'_>, args: &EditArgs) -> anyhow::Result<()> {
    let storage = ctx.open_storage().await?;
    let id = find_note_id(&storage, &args.id).await?;
    let records = storage.records().await?;
    let stored = records
        .get_note_metadata(&id)
        .await?
        .ok_or_else(|| into_cli_error(QuireError::NotFound(format!("Note {}", id))))?;

    // Title, tag, favorite, folder and colour changes leave an encrypted body sealed.
    let metadata_only = args.body.is_none()
        && (args.title.is_some()
            || !args.tag.is_empty()
            || args.favorite.is_some()
            || args.folder.is_some()
            || args.color.is_some());

    let master = if metadata_only || stored.note_envelope().is_none() {
        None
    } else {
        let session = ctx.unlock(&storage, args.no_input).await?;
        Some(session.require_master_key().await?)
    };

    let mut note = if metadata_only {
        stored
    } else {
        let mut note = records
            .load(&id, master.as_ref())
            .await
            .map_err(into_cli_error)?;
        note.content = read_note_body(
            args.no_input,
            args.body.clone(),
            ctx.editor()?,
            Some(&note.content),
        )?;
        note
    };

    if let Some(title) = &args.title {
        note.title = title.clone();
    }
    if !args.tag.is_empty() {
        note.set_tags(args.tag.as_slice());
    }
    if let Some(favorite) = args.favorite {
        note.favorite = favorite;
    }
    if let Some(folder) = &args.folder {
        note.set_folder(Some(folder));
    }
    if let Some(color) = &args.color {
        note.set_color(Some(color));
    }
    note.touch();

    records
        .save(&note, master.as_ref())
        .await
        .map_err(into_cli_error)?;
    storage.shutdown().await;

    if !ctx.quiet() {
        let ui = ctx.default_ui()?;
        let title = note.display_title();
        println!(
            "{}",
            receipt(
                &ui,
                "Updated note",
                &[
                    ("ID", note.id.as_str()),
                    ("Title", title.as_str()),
                    ("Folder", note.folder.as_deref().unwrap_or("/")),
                ],
            )
        );
    }
    Ok(())
}
