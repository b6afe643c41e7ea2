//! Path resolution for the config file and data directory.

use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::{default_config_path, default_data_dir, QuireConfig};

/// Resolve the config file path: `--config` / `QUIRE_CONFIG`, else XDG.
pub fn resolve_config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => default_config_path(),
    }
}

/// Resolve the data directory: `--data-dir` / `QUIRE_DATA_DIR`, then the
/// config file, then XDG.
pub fn resolve_data_dir(cli: &Cli, config: &QuireConfig) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &cli.data_dir {
        return Ok(dir.clone());
    }
    if let Some(dir) = config.storage.data_dir.as_deref() {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    default_data_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_flag_beats_config() {
        let cli = Cli::parse_from(["quire", "--data-dir", "/tmp/flag", "list"]);
        let mut config = QuireConfig::default();
        config.storage.data_dir = Some("/tmp/config".to_string());
        assert_eq!(
            resolve_data_dir(&cli, &config).unwrap(),
            PathBuf::from("/tmp/flag")
        );
    }

    #[test]
    fn test_config_used_without_flag() {
        let cli = Cli::parse_from(["quire", "list"]);
        if cli.data_dir.is_some() {
            // QUIRE_DATA_DIR is set in this environment
            return;
        }
        let mut config = QuireConfig::default();
        config.storage.data_dir = Some("/tmp/config".to_string());
        assert_eq!(
            resolve_data_dir(&cli, &config).unwrap(),
            PathBuf::from("/tmp/config")
        );
    }
}
