//! Spinners for slow operations (key derivation mostly).

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::context::UiContext;

fn spinner(ctx: &UiContext, message: &str) -> Option<ProgressBar> {
    if !ctx.allows_animation() {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}...") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

/// Run `work` with a spinner on TTYs. The spinner is cleared when the
/// future completes, whatever the outcome.
pub async fn with_spinner<F, T>(ctx: &UiContext, message: &str, work: F) -> T
where
    F: Future<Output = T>,
{
    let bar = spinner(ctx, message);
    let result = work.await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    result
}
