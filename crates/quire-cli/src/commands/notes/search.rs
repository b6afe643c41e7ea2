use crate::app::AppContext;
use crate::cli::SearchArgs;
use crate::output::{notes_json, print_note_list};

pub async fn handle_search(ctx: &AppContext<'_>, args: &SearchArgs) -> anyhow::Result<()> {
    let ui = ctx.ui(&args.output)?;
    let storage = ctx.open_storage().await?;
    let notes = storage.records().await?.search(&args.query).await?;
    storage.shutdown().await;

    if ui.mode.is_json() {
        println!("{}", serde_json::to_string_pretty(&notes_json(&notes))?);
    } else {
        print_note_list(&ui, &notes, ctx.quiet());
    }
    Ok(())
}
