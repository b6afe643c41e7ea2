//! Text and table output formatting for notes.

use quire_core::crypto::PassphraseStrength;
use quire_core::note::preview_text;
use quire_core::Note;

use crate::ui::{format_datetime, kv, short_id, single_line, table, truncate, Column, UiContext};

const TITLE_MAX: usize = 40;
const PREVIEW_MAX: usize = 60;

fn lock_marker(note: &Note) -> &'static str {
    if note.encrypted {
        "locked"
    } else {
        "plain"
    }
}

/// Print a single note with its header block.
pub fn print_note(ctx: &UiContext, note: &Note, quiet: bool) {
    if !quiet {
        println!("{}", kv(ctx, "ID", &note.id));
        println!("{}", kv(ctx, "Title", &note.display_title()));
        println!(
            "{}",
            kv(ctx, "Updated", &format_datetime(&note.updated, ctx.mode.is_pretty()))
        );
        if !note.tags.is_empty() {
            println!("{}", kv(ctx, "Tags", &note.tags.join(", ")));
        }
        if let Some(folder) = &note.folder {
            println!("{}", kv(ctx, "Folder", folder));
        }
        if let Some(color) = &note.color {
            println!("{}", kv(ctx, "Color", color));
        }
        if note.favorite {
            println!("{}", kv(ctx, "Favorite", "yes"));
        }
        println!();
    }
    println!("{}", note.content);
}

/// Print a list of notes as a table (pretty) or tab-separated rows (plain).
pub fn print_note_list(ctx: &UiContext, notes: &[Note], quiet: bool) {
    if notes.is_empty() {
        if !quiet {
            println!("No notes found.");
        }
        return;
    }

    let pretty = ctx.mode.is_pretty();
    let columns = [
        Column::new("ID"),
        Column::new("UPDATED"),
        Column::new("TITLE"),
        Column::new("TAGS"),
        Column::new("BODY"),
    ];
    let rows: Vec<Vec<String>> = notes
        .iter()
        .map(|note| {
            let body = if note.encrypted {
                lock_marker(note).to_string()
            } else {
                truncate(&single_line(&preview_text(&note.content)), PREVIEW_MAX)
            };
            vec![
                if pretty {
                    short_id(&note.id)
                } else {
                    note.id.clone()
                },
                format_datetime(&note.updated, pretty),
                truncate(&single_line(&note.display_title()), TITLE_MAX),
                note.tags.join(","),
                body,
            ]
        })
        .collect();

    println!("{}", table(ctx, &columns, &rows));
}

pub fn print_strength(ctx: &UiContext, strength: &PassphraseStrength) {
    println!("{}", kv(ctx, "Score", &strength.score.to_string()));
    println!("{}", kv(ctx, "Level", strength.level.label()));
    for line in &strength.feedback {
        println!("{}", kv(ctx, "Feedback", line));
    }
}
