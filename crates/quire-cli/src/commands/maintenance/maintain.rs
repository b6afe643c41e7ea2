use crate::app::AppContext;
use crate::ui::{receipt, with_spinner};

pub async fn handle_maintain(ctx: &AppContext<'_>) -> anyhow::Result<()> {
    let ui = ctx.default_ui()?;
    let storage = ctx.open_storage().await?;
    let records = storage.records().await?;
    let report = with_spinner(&ui, "Migrating records", records.cleanup_and_migrate()).await?;
    storage.shutdown().await;

    if !ctx.quiet() {
        let migrated = report.migrated.to_string();
        let cleaned = report.cleaned.to_string();
        println!(
            "{}",
            receipt(
                &ui,
                "Maintenance complete",
                &[("Migrated", migrated.as_str()), ("Removed", cleaned.as_str())],
            )
        );
    }
    Ok(())
}
