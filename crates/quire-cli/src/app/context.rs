//! Application context for the Quire CLI.
//!
//! Bundles CLI arguments with the lazily-loaded config file and opens the
//! core storage context for handlers.

use std::path::PathBuf;
use std::sync::Arc;

use once_cell::unsync::OnceCell;

use quire_core::crypto::KdfParams;
use quire_core::{CoreOptions, Session, StorageContext};

use crate::cli::{Cli, OutputArgs};
use crate::config::{read_config, QuireConfig};
use crate::ui::{with_spinner, UiContext};

use super::passphrase::unlock_with_retry;
use super::resolver::{resolve_config_path, resolve_data_dir};

/// KDF parameters for this process.
///
/// Builds with `test-support` honor `QUIRE_TEST_FAST_KDF` so integration
/// tests do not pay the full derivation cost on every invocation.
pub fn kdf_params() -> KdfParams {
    if cfg!(feature = "test-support") && std::env::var_os("QUIRE_TEST_FAST_KDF").is_some() {
        return KdfParams::insecure_for_tests();
    }
    KdfParams::CURRENT
}

pub struct AppContext<'a> {
    cli: &'a Cli,
    config: OnceCell<QuireConfig>,
}

impl<'a> AppContext<'a> {
    pub fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            config: OnceCell::new(),
        }
    }

    pub fn cli(&self) -> &Cli {
        self.cli
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// The config file, loaded on first use. A missing file gives defaults.
    pub fn config(&self) -> anyhow::Result<&QuireConfig> {
        self.config
            .get_or_try_init(|| read_config(&resolve_config_path(self.cli)?))
    }

    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        resolve_data_dir(self.cli, self.config()?)
    }

    pub fn editor(&self) -> anyhow::Result<Option<&str>> {
        Ok(self.config()?.ui.editor.as_deref())
    }

    pub fn core_options(&self) -> anyhow::Result<CoreOptions> {
        let config = self.config()?;
        Ok(CoreOptions {
            kdf: kdf_params(),
            retry: config.retry_policy(),
            lockout: config.lockout_policy(),
            ..CoreOptions::default()
        })
    }

    pub fn ui(&self, output: &OutputArgs) -> anyhow::Result<UiContext> {
        UiContext::from_env(output.json, output.format.as_deref(), self.cli.no_color)
    }

    /// UI context for commands without output flags.
    pub fn default_ui(&self) -> anyhow::Result<UiContext> {
        self.ui(&OutputArgs::default())
    }

    /// Open the store and derive the device key.
    pub async fn open_storage(&self) -> anyhow::Result<StorageContext> {
        let data_dir = self.data_dir()?;
        let storage = StorageContext::open(&data_dir, self.core_options()?).await?;
        let ui = self.default_ui()?;
        with_spinner(&ui, "Opening note store", storage.device_key()).await?;
        tracing::debug!(data_dir = %data_dir.display(), "note store opened");
        Ok(storage)
    }

    /// Unlock the session, prompting as needed.
    pub async fn unlock(
        &self,
        storage: &StorageContext,
        no_input: bool,
    ) -> anyhow::Result<Arc<Session>> {
        let session = storage.session().await?;
        unlock_with_retry(self, &session, no_input).await?;
        Ok(session)
    }
}
