use std::io::IsTerminal;

use crate::app::{into_cli_error, AppContext};
use crate::cli::DeleteArgs;
use crate::helpers::confirm;
use crate::ui::receipt;

use super::find_note_id;

pub async fn handle_delete(ctx: &AppContext<'_>, args: &DeleteArgs) -> anyhow::Result<()> {
    let storage = ctx.open_storage().await?;
    let id = find_note_id(&storage, &args.id).await?;
    let records = storage.records().await?;

    if !args.yes {
        if !std::io::stdin().is_terminal() {
            return Err(anyhow::anyhow!(
                "Refusing to delete without confirmation; pass --yes"
            ));
        }
        let title = records
            .get_note_metadata(&id)
            .await?
            .map(|note| note.display_title())
            .unwrap_or_else(|| id.clone());
        if !confirm(&format!("Delete \"{}\"?", title), false)? {
            return Err(anyhow::anyhow!("Delete cancelled"));
        }
    }

    records.delete(&id).await.map_err(into_cli_error)?;
    storage.shutdown().await;

    if !ctx.quiet() {
        let ui = ctx.default_ui()?;
        println!("{}", receipt(&ui, "Deleted note", &[("ID", id.as_str())]));
    }
    Ok(())
}
