mod delete;
mod edit;
mod list;
mod new;
mod search;
mod show;

pub use delete::handle_delete;
pub use edit::handle_edit;
pub use list::handle_list;
pub use new::handle_new;
pub use search::handle_search;
pub use show::handle_show;

use quire_core::{Note, QuireError, StorageContext};

use crate::app::{into_cli_error, AppContext};
use crate::helpers::resolve_note_id;

/// Resolve `query` (full id or prefix) to a stored note id.
pub(crate) async fn find_note_id(storage: &StorageContext, query: &str) -> anyhow::Result<String> {
    let notes = storage.records().await?.list_notes().await?;
    resolve_note_id(&notes, query)
}

/// Load a note, unlocking the session only when its body is encrypted.
pub(crate) async fn load_note(
    ctx: &AppContext<'_>,
    storage: &StorageContext,
    id: &str,
    no_input: bool,
) -> anyhow::Result<Note> {
    let records = storage.records().await?;
    match records.load(id, None).await {
        Ok(note) => Ok(note),
        Err(QuireError::Locked) => {
            let session = ctx.unlock(storage, no_input).await?;
            let master = session.require_master_key().await?;
            records.load(id, Some(&master)).await.map_err(into_cli_error)
        }
        Err(err) => Err(into_cli_error(err)),
    }
}
