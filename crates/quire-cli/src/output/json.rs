//! JSON output formatting for notes.

use quire_core::crypto::PassphraseStrength;
use quire_core::note::{preview_text, Groups};
use quire_core::Note;

/// A note as printed by `--json`. `content` is omitted when the body was not
/// decrypted.
pub fn note_json(note: &Note, include_content: bool) -> serde_json::Value {
    let mut value = serde_json::json!({
        "id": note.id,
        "title": note.display_title(),
        "tags": note.tags,
        "folder": note.folder,
        "color": note.color,
        "created": note.created,
        "updated": note.updated,
        "favorite": note.favorite,
        "encrypted": note.encrypted,
        "mode": note.mode,
    });
    if include_content {
        value["content"] = serde_json::Value::String(note.content.clone());
    } else if !note.encrypted {
        value["preview"] = serde_json::Value::String(preview_text(&note.content));
    }
    value
}

pub fn notes_json(notes: &[Note]) -> Vec<serde_json::Value> {
    notes.iter().map(|note| note_json(note, false)).collect()
}

/// Grouped listing: `[{"group": label, "notes": [...]}, ...]`.
pub fn groups_json(groups: &Groups) -> Vec<serde_json::Value> {
    groups
        .iter()
        .map(|(label, notes)| {
            serde_json::json!({
                "group": label,
                "notes": notes_json(notes),
            })
        })
        .collect()
}

pub fn strength_json(strength: &PassphraseStrength) -> serde_json::Value {
    serde_json::json!({
        "score": strength.score,
        "level": strength.level.label(),
        "feedback": strength.feedback,
    })
}
