use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use quire_core::VERSION;

/// Quire - an encrypted, local-first note store
#[derive(Parser)]
#[command(name = "quire")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding notes.db and secure.db
    #[arg(short, long, global = true, env = "QUIRE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to config.toml
    #[arg(long, global = true, env = "QUIRE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output flags shared by read commands
#[derive(Args, Clone, Default)]
pub struct OutputArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Output format (pretty, plain)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,
}

#[derive(Args)]
pub struct InitArgs {
    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Args)]
pub struct UnlockArgs {
    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct NewArgs {
    /// Note title (derived from the body when omitted)
    #[arg(long)]
    pub title: Option<String>,

    /// Note body (overrides stdin/editor)
    #[arg(long)]
    pub body: Option<String>,

    /// Read the note from a markdown file with frontmatter
    #[arg(long, value_name = "FILE", conflicts_with = "body")]
    pub from_markdown: Option<PathBuf>,

    /// Add tags to the note
    #[arg(short, long, value_name = "TAG")]
    pub tag: Vec<String>,

    /// Folder to file the note under (`a/b` for nested folders)
    #[arg(long)]
    pub folder: Option<String>,

    /// Highlight colour
    #[arg(long)]
    pub color: Option<String>,

    /// Store the body without passphrase encryption
    #[arg(long)]
    pub plain: bool,

    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Args)]
pub struct EditArgs {
    /// Note ID (full or prefix)
    #[arg(value_name = "ID")]
    pub id: String,

    /// Replace the title
    #[arg(long)]
    pub title: Option<String>,

    /// Replace the body (overrides stdin/editor)
    #[arg(long)]
    pub body: Option<String>,

    /// Replace the tags
    #[arg(short, long, value_name = "TAG")]
    pub tag: Vec<String>,

    /// Toggle the favorite flag
    #[arg(long)]
    pub favorite: Option<bool>,

    /// Move to a folder ("" for the root)
    #[arg(long)]
    pub folder: Option<String>,

    /// Set the highlight colour ("" to clear)
    #[arg(long)]
    pub color: Option<String>,

    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Note ID (full or prefix)
    #[arg(value_name = "ID")]
    pub id: String,

    /// Print as markdown with frontmatter
    #[arg(long, conflicts_with = "json")]
    pub markdown: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only notes carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Only favorite notes
    #[arg(long)]
    pub favorites: bool,

    /// Only notes in this folder or its subfolders
    #[arg(long)]
    pub folder: Option<String>,

    /// Sort by date, alphabetical or favorites
    #[arg(long, value_name = "FIELD")]
    pub sort: Option<String>,

    /// Sort order: desc (default) or asc
    #[arg(long, value_name = "ORDER", requires = "sort")]
    pub order: Option<String>,

    /// Split the listing by date, tags or folders
    #[arg(long, value_name = "GROUPING")]
    pub group_by: Option<String>,

    /// Limit number of results
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Exact title or tag to look for (case-insensitive)
    #[arg(value_name = "QUERY")]
    pub query: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Note ID (full or prefix)
    #[arg(value_name = "ID")]
    pub id: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Destination file
    #[arg(value_name = "DEST")]
    pub destination: PathBuf,

    /// Encrypt the backup under an export password
    #[arg(long)]
    pub protected: bool,

    /// Export a single note (always password protected)
    #[arg(long, value_name = "ID")]
    pub note: Option<String>,

    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Backup file to restore
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Args)]
pub struct StrengthArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ShellArgs {
    /// Idle minutes before the session locks (overrides config)
    #[arg(long)]
    pub auto_lock_minutes: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set the passphrase for a new note store
    Init(InitArgs),

    /// Show whether the store is initialized and any active lockout
    Status(StatusArgs),

    /// Check a passphrase against the store
    Unlock(UnlockArgs),

    /// Create a note
    New(NewArgs),

    /// Edit a note
    Edit(EditArgs),

    /// Show a note
    Show(ShowArgs),

    /// List notes, newest first
    List(ListArgs),

    /// Find notes by exact title or tag
    Search(SearchArgs),

    /// Delete a note
    Delete(DeleteArgs),

    /// Write a signed backup file
    Export(ExportArgs),

    /// Restore notes from a backup file
    Import(ImportArgs),

    /// Migrate legacy records and remove corrupt ones
    Maintain,

    /// Rate a passphrase
    Strength(StrengthArgs),

    /// Unlock once and run commands until idle timeout or exit
    Shell(ShellArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}
