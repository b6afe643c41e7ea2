use crate::app::AppContext;
use crate::cli::UnlockArgs;
use crate::ui::{badge, Badge};

pub async fn handle_unlock(ctx: &AppContext<'_>, args: &UnlockArgs) -> anyhow::Result<()> {
    let storage = ctx.open_storage().await?;
    ctx.unlock(&storage, args.no_input).await?;
    storage.shutdown().await;

    if !ctx.quiet() {
        let ui = ctx.default_ui()?;
        println!("{}", badge(&ui, Badge::Ok, "Passphrase accepted"));
    }
    Ok(())
}
