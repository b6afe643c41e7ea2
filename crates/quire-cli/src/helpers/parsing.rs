//! Note id resolution.

use quire_core::Note;

use crate::errors::CliError;

/// Resolve a full id or unique prefix against the stored notes.
pub fn resolve_note_id(notes: &[Note], query: &str) -> anyhow::Result<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(anyhow::anyhow!("Note ID cannot be empty"));
    }
    if let Some(note) = notes.iter().find(|note| note.id == query) {
        return Ok(note.id.clone());
    }

    let matches: Vec<&Note> = notes
        .iter()
        .filter(|note| note.id.starts_with(query))
        .collect();
    match matches.as_slice() {
        [single] => Ok(single.id.clone()),
        [] => Err(CliError::not_found(
            format!("No note matches \"{}\"", query),
            "Run `quire list` to find note IDs.",
        )
        .into()),
        many => Err(anyhow::anyhow!(
            "\"{}\" matches {} notes; use a longer prefix",
            query,
            many.len()
        )),
    }
}
