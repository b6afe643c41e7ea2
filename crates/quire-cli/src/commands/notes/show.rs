use crate::app::AppContext;
use crate::cli::{OutputArgs, ShowArgs};
use crate::output::{note_json, print_note};

use super::{find_note_id, load_note};

pub async fn handle_show(ctx: &AppContext<'_>, args: &ShowArgs) -> anyhow::Result<()> {
    let storage = ctx.open_storage().await?;
    let id = find_note_id(&storage, &args.id).await?;
    let note = load_note(ctx, &storage, &id, args.no_input).await?;
    storage.shutdown().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&note_json(&note, true))?);
    } else if args.markdown {
        println!("{}", note.to_markdown());
    } else {
        let ui = ctx.ui(&OutputArgs::default())?;
        print_note(&ui, &note, ctx.quiet());
    }
    Ok(())
}
