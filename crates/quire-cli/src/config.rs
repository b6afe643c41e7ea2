use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use quire_core::rate_limit::LockoutPolicy;
use quire_core::records::RetryPolicy;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuireConfig {
    pub storage: StorageSection,
    pub security: SecuritySection,
    pub delete: DeleteSection,
    pub ui: UiSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub data_dir: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub auto_lock_minutes: u64,
    pub max_failed_attempts: u32,
    pub lockout_minutes: u64,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            auto_lock_minutes: 15,
            max_failed_attempts: 5,
            lockout_minutes: 15,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteSection {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for DeleteSection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 200,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSection {
    pub editor: Option<String>,
}

impl QuireConfig {
    /// Reject values the core cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.security.max_failed_attempts == 0 {
            return Err(anyhow::anyhow!(
                "security.max_failed_attempts must be at least 1"
            ));
        }
        if self.security.lockout_minutes == 0 {
            return Err(anyhow::anyhow!("security.lockout_minutes must be at least 1"));
        }
        if self.delete.max_attempts == 0 {
            return Err(anyhow::anyhow!("delete.max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_attempts: self.security.max_failed_attempts,
            lockout: Duration::from_secs(self.security.lockout_minutes * 60),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.delete.max_attempts,
            initial_backoff: Duration::from_millis(self.delete.backoff_ms),
        }
    }

    /// Zero disables auto-lock.
    pub fn auto_lock(&self) -> Option<Duration> {
        match self.security.auto_lock_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(minutes * 60)),
        }
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_data_dir() -> anyhow::Result<PathBuf> {
    xdg_data_dir()
}

/// Read a config file. A missing file yields the defaults.
pub fn read_config(path: &Path) -> anyhow::Result<QuireConfig> {
    if !path.exists() {
        return Ok(QuireConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    let config: QuireConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))?;
    config.validate()?;
    Ok(config)
}

pub fn write_config(path: &Path, config: &QuireConfig) -> anyhow::Result<()> {
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    quire_core::fs::write_atomic(path, contents.as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("quire"));
        }
    }
    Ok(home_dir()?.join(".config").join("quire"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("quire"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("quire"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}
