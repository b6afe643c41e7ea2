//! Interactive session: unlock once, run commands until `exit`, EOF, or the
//! idle timer locks the session.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use quire_core::session::DEFAULT_AUTO_LOCK;
use quire_core::{AutoLock, QuireError, Session, StorageContext};

use crate::app::AppContext;
use crate::cli::ShellArgs;
use crate::helpers::resolve_note_id;
use crate::output::{print_note, print_note_list};
use crate::ui::{badge, kv, Badge, UiContext};

#[derive(Parser)]
#[command(name = "quire>", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// List notes
    List,
    /// Find notes by exact title or tag
    Search { query: String },
    /// Show a note
    Show { id: String },
    /// Lock the session now
    Lock,
    /// Unlock the session again
    Unlock,
    /// Session and auto-lock state
    Status,
    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

struct ShellState<'a> {
    ctx: &'a AppContext<'a>,
    ui: UiContext,
    storage: &'a StorageContext,
    session: Arc<Session>,
    auto_lock: AutoLock,
}

fn read_line() -> io::Result<Option<String>> {
    print!("quire> ");
    io::stdout().flush()?;
    let mut line = String::new();
    match io::stdin().read_line(&mut line)? {
        0 => Ok(None),
        _ => Ok(Some(line)),
    }
}

pub async fn handle_shell(ctx: &AppContext<'_>, args: &ShellArgs) -> anyhow::Result<()> {
    let timeout = match args.auto_lock_minutes {
        Some(0) => None,
        Some(minutes) => Some(Duration::from_secs(minutes * 60)),
        None => ctx.config()?.auto_lock(),
    };

    let storage = ctx.open_storage().await?;
    let session = ctx.unlock(&storage, false).await?;
    let auto_lock = AutoLock::start(Arc::clone(&session), timeout.unwrap_or(DEFAULT_AUTO_LOCK));
    auto_lock.set_enabled(timeout.is_some());

    let state = ShellState {
        ctx,
        ui: ctx.default_ui()?,
        storage: &storage,
        session,
        auto_lock,
    };

    loop {
        let Some(line) = tokio::task::spawn_blocking(read_line).await?? else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        state.auto_lock.record_activity();

        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(err) => {
                let _ = err.print();
                continue;
            }
        };
        match run_command(&state, parsed.command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => eprintln!("{}", badge(&state.ui, Badge::Err, &format!("{:#}", err))),
        }
    }

    drop(state);
    storage.shutdown().await;
    Ok(())
}

/// Run one shell command. `Ok(false)` ends the loop.
async fn run_command(state: &ShellState<'_>, command: ShellCommand) -> anyhow::Result<bool> {
    let records = state.storage.records().await?;
    let quiet = state.ctx.quiet();

    match command {
        ShellCommand::List => {
            print_note_list(&state.ui, &records.list_notes().await?, quiet);
        }
        ShellCommand::Search { query } => {
            print_note_list(&state.ui, &records.search(&query).await?, quiet);
        }
        ShellCommand::Show { id } => {
            let id = resolve_note_id(&records.list_notes().await?, &id)?;
            let master = state.session.master_key().await;
            match records.load(&id, master.as_ref()).await {
                Ok(note) => print_note(&state.ui, &note, quiet),
                Err(QuireError::Locked) => {
                    eprintln!(
                        "{}",
                        badge(
                            &state.ui,
                            Badge::Warn,
                            "Session is locked. Type `unlock` to continue."
                        )
                    )
                }
                Err(err) => return Err(err.into()),
            }
        }
        ShellCommand::Lock => {
            state.session.lock().await;
            println!("{}", badge(&state.ui, Badge::Info, "Session locked."));
        }
        ShellCommand::Unlock => {
            state.ctx.unlock(state.storage, false).await?;
            state.auto_lock.record_activity();
            println!("{}", badge(&state.ui, Badge::Info, "Session unlocked."));
        }
        ShellCommand::Status => {
            let unlocked = state.session.is_unlocked().await;
            println!(
                "{}",
                kv(&state.ui, "Unlocked", if unlocked { "yes" } else { "no" })
            );
            if state.auto_lock.is_enabled() && unlocked {
                let left = state.auto_lock.time_until_lock().await.as_secs();
                println!(
                    "{}",
                    kv(
                        &state.ui,
                        "Auto-lock in",
                        &format!("{}m {:02}s", left / 60, left % 60)
                    )
                );
            } else {
                println!("{}", kv(&state.ui, "Auto-lock", "off"));
            }
        }
        ShellCommand::Exit => return Ok(false),
    }
    Ok(true)
}
