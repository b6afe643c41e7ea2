use quire_core::note::{
    folder_display_name, group_by_date, group_by_folders, group_by_tags, sort_notes, Grouping,
    Groups, SortBy, SortOrder,
};

use crate::app::AppContext;
use crate::cli::ListArgs;
use crate::output::{groups_json, notes_json, print_note_list};
use crate::ui::{styled, styles, UiContext};

fn group(notes: &[quire_core::Note], grouping: Grouping) -> Groups {
    match grouping {
        Grouping::Date => group_by_date(notes, chrono::Utc::now()),
        Grouping::Tags => group_by_tags(notes),
        Grouping::Folders => group_by_folders(notes)
            .into_iter()
            .map(|(path, notes)| {
                let label = if path.is_empty() {
                    folder_display_name(&path).to_string()
                } else {
                    path
                };
                (label, notes)
            })
            .collect(),
    }
}

fn print_groups(ui: &UiContext, groups: &Groups, quiet: bool) {
    if groups.is_empty() {
        print_note_list(ui, &[], quiet);
        return;
    }
    for (index, (label, notes)) in groups.iter().enumerate() {
        if index > 0 {
            println!();
        }
        if ui.mode.is_pretty() {
            println!("{}", styled(label, styles::bold(), ui.color));
        } else {
            println!("# {}", label);
        }
        print_note_list(ui, notes, quiet);
    }
}

pub async fn handle_list(ctx: &AppContext<'_>, args: &ListArgs) -> anyhow::Result<()> {
    let ui = ctx.ui(&args.output)?;
    let sort = args.sort.as_deref().map(str::parse::<SortBy>).transpose()?;
    let order = args
        .order
        .as_deref()
        .map(str::parse::<SortOrder>)
        .transpose()?
        .unwrap_or_default();
    let grouping = args.group_by.as_deref().map(str::parse::<Grouping>).transpose()?;

    let storage = ctx.open_storage().await?;
    let mut notes = storage.records().await?.list_notes().await?;
    storage.shutdown().await;

    if let Some(tag) = &args.tag {
        let wanted = tag.trim().to_lowercase();
        notes.retain(|note| note.tags.iter().any(|t| t.to_lowercase() == wanted));
    }
    if let Some(folder) = &args.folder {
        notes.retain(|note| note.in_folder(folder));
    }
    if args.favorites {
        notes.retain(|note| note.favorite);
    }
    if let Some(sort) = sort {
        sort_notes(&mut notes, sort, order);
    }
    if let Some(limit) = args.limit {
        notes.truncate(limit);
    }

    match grouping {
        Some(grouping) => {
            let groups = group(&notes, grouping);
            if ui.mode.is_json() {
                println!("{}", serde_json::to_string_pretty(&groups_json(&groups))?);
            } else {
                print_groups(&ui, &groups, ctx.quiet());
            }
        }
        None if ui.mode.is_json() => {
            println!("{}", serde_json::to_string_pretty(&notes_json(&notes))?);
        }
        None => print_note_list(&ui, &notes, ctx.quiet()),
    }
    Ok(())
}
