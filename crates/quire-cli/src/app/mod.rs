//! Application-level utilities for the Quire CLI.
//!
//! - Path resolution for the config file and data directory
//! - Lazily loaded config and storage opening
//! - Passphrase handling with retry logic

mod context;
mod passphrase;
mod resolver;

pub use context::{kdf_params, AppContext};
pub use passphrase::{into_cli_error, PASSPHRASE_ENV};
pub use resolver::resolve_config_path;
