//! Storage context: database handles, the device key, and the session.
//!
//! One context per process. It opens `secure.db` and `notes.db` under a data
//! directory, derives the device key on first use, and owns the
//! [`Session`] holding the master key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::OnceCell;

use crate::crypto::{derive_key, generate_device_id, DeviceKey, KdfParams, Salt};
use crate::error::{QuireError, Result};
use crate::rate_limit::{Clock, LockoutPolicy, RateLimiter, SystemClock};
use crate::records::{RecordStore, RetryPolicy, SqliteRecordBackend};
use crate::secure_store::{keys, SecureStore};
use crate::session::Session;

pub const NOTES_DB: &str = "notes.db";
pub const SECURE_DB: &str = "secure.db";

/// Tunables for a [`StorageContext`].
#[derive(Clone)]
pub struct CoreOptions {
    pub kdf: KdfParams,
    pub retry: RetryPolicy,
    pub lockout: LockoutPolicy,
    pub clock: Arc<dyn Clock>,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            kdf: KdfParams::CURRENT,
            retry: RetryPolicy::default(),
            lockout: LockoutPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

pub struct StorageContext {
    data_dir: PathBuf,
    options: CoreOptions,
    secure: SecureStore,
    backend: SqliteRecordBackend,
    session: Arc<Session>,
    device_key: OnceCell<DeviceKey>,
    records: OnceCell<RecordStore>,
}

impl StorageContext {
    /// Open (creating if needed) the databases under `data_dir`.
    pub async fn open(data_dir: &Path, options: CoreOptions) -> Result<Self> {
        let secure = SecureStore::open(&data_dir.join(SECURE_DB)).await?;
        let backend = SqliteRecordBackend::open(&data_dir.join(NOTES_DB)).await?;
        let limiter =
            RateLimiter::with_clock(secure.clone(), options.lockout, Arc::clone(&options.clock));
        let session = Arc::new(Session::new(secure.clone(), limiter, options.kdf));

        tracing::debug!(data_dir = %data_dir.display(), "storage context opened");
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            options,
            secure,
            backend,
            session,
            device_key: OnceCell::new(),
            records: OnceCell::new(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn options(&self) -> &CoreOptions {
        &self.options
    }

    /// The device key, derived once per context.
    ///
    /// Reads (or creates) the device id and salt, stretches them with the
    /// KDF, and turns on sealing in the secure store.
    pub async fn device_key(&self) -> Result<&DeviceKey> {
        self.device_key
            .get_or_try_init(|| async {
                let device_id = match self.secure.get(keys::DEVICE_ID).await? {
                    Some(id) => id,
                    None => {
                        let id = generate_device_id()?;
                        self.secure.set(keys::DEVICE_ID, &id).await?;
                        tracing::info!("generated new device id");
                        id
                    }
                };
                let salt = match self.secure.get(keys::DEVICE_SALT).await? {
                    Some(encoded) => Salt::parse(&encoded)?,
                    None => {
                        let salt = Salt::generate()?;
                        self.secure.set(keys::DEVICE_SALT, salt.as_str()).await?;
                        salt
                    }
                };

                let secret = SecretString::from(device_id);
                let key = DeviceKey::new(derive_key(&secret, &salt, self.options.kdf).await?);
                self.secure.enable_sealing(&key);
                tracing::debug!("device key ready");
                Ok::<_, QuireError>(key)
            })
            .await
    }

    /// The session. The device key is prepared first so lockout state is
    /// sealed at rest.
    pub async fn session(&self) -> Result<Arc<Session>> {
        self.device_key().await?;
        Ok(Arc::clone(&self.session))
    }

    /// The record store.
    pub async fn records(&self) -> Result<&RecordStore> {
        self.records
            .get_or_try_init(|| async {
                let device_key = self.device_key().await?.clone();
                Ok::<_, QuireError>(
                    RecordStore::new(Arc::new(self.backend.clone()), device_key)
                        .with_retry(self.options.retry),
                )
            })
            .await
    }

    /// Lock the session and release the context.
    pub async fn shutdown(self) {
        self.session.lock().await;
        tracing::debug!("storage context shut down");
    }
}
