use crate::app::AppContext;
use crate::cli::StatusArgs;
use crate::ui::{hint, kv, print};

/// Report store state without asking for the passphrase.
pub async fn handle_status(ctx: &AppContext<'_>, args: &StatusArgs) -> anyhow::Result<()> {
    let ui = ctx.ui(&args.output)?;
    let data_dir = ctx.data_dir()?;
    let storage = ctx.open_storage().await?;
    let session = storage.session().await?;

    let initialized = session.is_initialized().await?;
    let limiter = session.rate_limiter();
    let lockout = limiter.check_lockout().await?;
    let failed = limiter.failed_attempts().await?;
    let remaining = limiter.remaining_attempts().await?;
    let notes = storage.records().await?.list_notes().await?;
    let encrypted = notes.iter().filter(|note| note.encrypted).count();
    storage.shutdown().await;

    if ui.mode.is_json() {
        let value = serde_json::json!({
            "data_dir": data_dir,
            "initialized": initialized,
            "locked_out": lockout.locked,
            "minutes_left": lockout.minutes_left,
            "failed_attempts": failed,
            "attempts_remaining": remaining,
            "notes": notes.len(),
            "encrypted_notes": encrypted,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    print(&ui, &kv(&ui, "Data dir", &data_dir.display().to_string()));
    print(&ui, &kv(&ui, "Initialized", yes_no(initialized)));
    print(&ui, &kv(&ui, "Notes", &notes.len().to_string()));
    print(&ui, &kv(&ui, "Encrypted notes", &encrypted.to_string()));
    print(&ui, &kv(&ui, "Failed attempts", &failed.to_string()));
    if lockout.locked {
        print(
            &ui,
            &kv(&ui, "Locked out", &format!("{} minute(s) left", lockout.minutes_left)),
        );
    } else {
        print(&ui, &kv(&ui, "Attempts remaining", &remaining.to_string()));
    }
    if !initialized && !ctx.quiet() {
        print(&ui, &hint(&ui, "Run `quire init` to set a passphrase."));
    }
    Ok(())
}
