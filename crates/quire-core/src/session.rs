//! Unlock session and idle auto-lock.
//!
//! The master key exists only inside [`Session`]. Unlocking checks the
//! lockout first, derives the key, and proves it by opening a known marker
//! from the secure store. Only a proven key is kept.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::crypto::{decrypt, derive_key, encrypt, validate_passphrase, Envelope, KdfParams, MasterKey, Salt};
use crate::error::{QuireError, Result};
use crate::rate_limit::RateLimiter;
use crate::secure_store::{keys, SecureStore};

/// Known plaintext sealed under the master key at setup.
const VERIFIER_PLAINTEXT: &str = "quire-master-key-verifier-v1";

pub const DEFAULT_AUTO_LOCK: Duration = Duration::from_secs(15 * 60);

pub struct Session {
    store: SecureStore,
    limiter: RateLimiter,
    params: KdfParams,
    master: RwLock<Option<MasterKey>>,
}

impl Session {
    pub fn new(store: SecureStore, limiter: RateLimiter, params: KdfParams) -> Self {
        Self {
            store,
            limiter,
            params,
            master: RwLock::new(None),
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Whether a passphrase has been set up.
    pub async fn is_initialized(&self) -> Result<bool> {
        Ok(self.store.get(keys::MASTER_KEY_VERIFIER).await?.is_some())
    }

    /// The stored master salt. Only `initialize` creates one.
    async fn master_salt(&self) -> Result<Salt> {
        match self.store.get(keys::MASTER_KEY_SALT).await? {
            Some(encoded) => Salt::parse(&encoded),
            None => Err(QuireError::Validation("master key salt missing".to_string())),
        }
    }

    async fn master_salt_or_create(&self) -> Result<Salt> {
        match self.store.get(keys::MASTER_KEY_SALT).await? {
            Some(encoded) => Salt::parse(&encoded),
            None => {
                let salt = Salt::generate()?;
                self.store.set(keys::MASTER_KEY_SALT, salt.as_str()).await?;
                Ok(salt)
            }
        }
    }

    /// Set the passphrase for a fresh installation and unlock.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the passphrase is too weak
    /// - `Validation` if a passphrase is already set
    pub async fn initialize(&self, passphrase: &SecretString) -> Result<()> {
        validate_passphrase(passphrase.expose_secret())?;
        if self.is_initialized().await? {
            return Err(QuireError::Validation(
                "A passphrase is already set".to_string(),
            ));
        }

        let salt = self.master_salt_or_create().await?;
        let key = MasterKey::new(derive_key(passphrase, &salt, self.params).await?);
        let marker = encrypt(VERIFIER_PLAINTEXT, key.key())?;
        self.store
            .set(keys::MASTER_KEY_VERIFIER, &serde_json::to_string(&marker)?)
            .await?;
        self.limiter.reset_failed_attempts().await?;

        *self.master.write().await = Some(key);
        tracing::info!("passphrase initialized");
        Ok(())
    }

    /// Unlock with a passphrase.
    ///
    /// # Errors
    ///
    /// - `LockedOut` if the rate limiter refuses attempts (no KDF work is done)
    /// - `IncorrectPassphrase` with the attempts left on a wrong passphrase
    /// - `NotFound` if no passphrase has been set up
    pub async fn unlock(&self, passphrase: &SecretString) -> Result<()> {
        let status = self.limiter.check_lockout().await?;
        if status.locked {
            return Err(QuireError::LockedOut {
                minutes_left: status.minutes_left,
            });
        }

        let marker = self
            .store
            .get(keys::MASTER_KEY_VERIFIER)
            .await?
            .ok_or_else(|| QuireError::NotFound("No passphrase has been set".to_string()))?;
        let marker: Envelope = serde_json::from_str(&marker)
            .map_err(|e| QuireError::Validation(format!("Corrupt verifier marker: {}", e)))?;

        let salt = self.master_salt().await?;
        let key = MasterKey::new(derive_key(passphrase, &salt, self.params).await?);

        match decrypt(&marker, key.key()) {
            Ok(plaintext) if plaintext == VERIFIER_PLAINTEXT => {
                self.limiter.reset_failed_attempts().await?;
                *self.master.write().await = Some(key);
                tracing::info!("session unlocked");
                Ok(())
            }
            Ok(_) | Err(QuireError::DecryptionFailed(_)) => {
                let outcome = self.limiter.record_failed_attempt().await?;
                tracing::warn!(
                    attempts_remaining = outcome.attempts_remaining,
                    "unlock failed"
                );
                if outcome.locked {
                    Err(QuireError::LockedOut {
                        minutes_left: outcome.minutes_left,
                    })
                } else {
                    Err(QuireError::IncorrectPassphrase {
                        attempts_remaining: outcome.attempts_remaining,
                    })
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the master key. Safe to call when already locked.
    pub async fn lock(&self) {
        if self.master.write().await.take().is_some() {
            tracing::info!("session locked");
        }
    }

    pub async fn is_unlocked(&self) -> bool {
        self.master.read().await.is_some()
    }

    /// A copy of the master key, if unlocked.
    pub async fn master_key(&self) -> Option<MasterKey> {
        self.master.read().await.clone()
    }

    /// The master key, or `Locked`.
    pub async fn require_master_key(&self) -> Result<MasterKey> {
        self.master_key().await.ok_or(QuireError::Locked)
    }
}

struct AutoLockState {
    enabled: bool,
    timeout: Duration,
    last_activity: Instant,
}

struct Shared {
    state: Mutex<AutoLockState>,
    notify: Notify,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, AutoLockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn deadline(&self) -> Option<Instant> {
        let state = self.state();
        state.enabled.then(|| state.last_activity + state.timeout)
    }
}

/// Locks a [`Session`] after a period without activity.
///
/// The timer task stops when the `AutoLock` is dropped.
pub struct AutoLock {
    session: Arc<Session>,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl AutoLock {
    /// Start the idle timer. Must be called inside a tokio runtime.
    pub fn start(session: Arc<Session>, timeout: Duration) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(AutoLockState {
                enabled: true,
                timeout,
                last_activity: Instant::now(),
            }),
            notify: Notify::new(),
        });
        let task = tokio::spawn(run(Arc::clone(&session), Arc::clone(&shared)));
        Self {
            session,
            shared,
            task,
        }
    }

    /// Restart the idle timer.
    pub fn record_activity(&self) {
        self.shared.state().last_activity = Instant::now();
        self.shared.notify.notify_one();
    }

    pub fn set_enabled(&self, enabled: bool) {
        {
            let mut state = self.shared.state();
            state.enabled = enabled;
            state.last_activity = Instant::now();
        }
        self.shared.notify.notify_one();
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.state().enabled
    }

    pub fn set_timeout(&self, timeout: Duration) {
        {
            let mut state = self.shared.state();
            state.timeout = timeout;
            state.last_activity = Instant::now();
        }
        self.shared.notify.notify_one();
    }

    pub fn timeout(&self) -> Duration {
        self.shared.state().timeout
    }

    /// Time left before the session locks; zero when disabled or already locked.
    pub async fn time_until_lock(&self) -> Duration {
        if !self.session.is_unlocked().await {
            return Duration::ZERO;
        }
        match self.shared.deadline() {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }
}

impl Drop for AutoLock {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(session: Arc<Session>, shared: Arc<Shared>) {
    loop {
        let Some(deadline) = shared.deadline() else {
            shared.notify.notified().await;
            continue;
        };

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                let expired = shared.deadline().is_some_and(|d| d <= Instant::now());
                if expired {
                    if session.is_unlocked().await {
                        tracing::info!("auto-locking after inactivity");
                        session.lock().await;
                    }
                    shared.notify.notified().await;
                }
            }
            _ = shared.notify.notified() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::LockoutPolicy;

    const PARAMS: KdfParams = KdfParams::insecure_for_tests();

    fn session() -> Session {
        let store = SecureStore::open_in_memory().unwrap();
        let limiter = RateLimiter::new(store.clone(), LockoutPolicy::default());
        Session::new(store, limiter, PARAMS)
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn test_initialize_then_unlock() {
        let session = session();
        assert!(!session.is_initialized().await.unwrap());
        session.initialize(&secret("correct-horse")).await.unwrap();
        assert!(session.is_unlocked().await);

        session.lock().await;
        assert!(!session.is_unlocked().await);
        assert!(session.master_key().await.is_none());

        session.unlock(&secret("correct-horse")).await.unwrap();
        assert!(session.is_unlocked().await);
    }

    #[tokio::test]
    async fn test_initialize_rejects_weak_and_repeat() {
        let session = session();
        assert!(matches!(
            session.initialize(&secret("short")).await,
            Err(QuireError::InvalidInput(_))
        ));
        session.initialize(&secret("correct-horse")).await.unwrap();
        assert!(matches!(
            session.initialize(&secret("another-pass")).await,
            Err(QuireError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unlock_before_initialize_is_not_found() {
        assert!(matches!(
            session().unlock(&secret("correct-horse")).await,
            Err(QuireError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_passphrase_counts_down_then_locks_out() {
        let session = session();
        session.initialize(&secret("correct-horse")).await.unwrap();
        session.lock().await;

        let mut remaining = Vec::new();
        for _ in 0..4 {
            match session.unlock(&secret("wrong-horse")).await {
                Err(QuireError::IncorrectPassphrase { attempts_remaining }) => {
                    remaining.push(attempts_remaining)
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(remaining, vec![4, 3, 2, 1]);

        assert!(matches!(
            session.unlock(&secret("wrong-horse")).await,
            Err(QuireError::LockedOut { minutes_left: 15 })
        ));
        assert!(matches!(
            session.unlock(&secret("correct-horse")).await,
            Err(QuireError::LockedOut { .. })
        ));
        assert!(!session.is_unlocked().await);
    }

    #[tokio::test]
    async fn test_unlock_with_sealed_store() {
        let store = SecureStore::open_in_memory().unwrap();
        store.enable_sealing(&crate::crypto::DeviceKey::new(
            crate::crypto::SymmetricKey::from_bytes([9; 32]),
        ));
        let limiter = RateLimiter::new(store.clone(), LockoutPolicy::default());
        let session = Session::new(store, limiter, PARAMS);

        session.initialize(&secret("correct-horse")).await.unwrap();
        session.lock().await;
        session.unlock(&secret("correct-horse")).await.unwrap();
        assert!(session.is_unlocked().await);
    }

    #[tokio::test]
    async fn test_unlock_without_master_salt_does_not_create_one() {
        let session = session();
        session.initialize(&secret("correct-horse")).await.unwrap();
        session.lock().await;
        session.store.delete(keys::MASTER_KEY_SALT).await.unwrap();

        assert!(matches!(
            session.unlock(&secret("correct-horse")).await,
            Err(QuireError::Validation(_))
        ));
        assert!(session.store.get(keys::MASTER_KEY_SALT).await.unwrap().is_none());
        assert_eq!(session.rate_limiter().failed_attempts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_auto_lock_fires_after_timeout() {
        let session = Arc::new(session());
        session.initialize(&secret("correct-horse")).await.unwrap();

        let auto_lock = AutoLock::start(Arc::clone(&session), Duration::from_millis(50));
        assert!(auto_lock.time_until_lock().await > Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!session.is_unlocked().await);
        assert_eq!(auto_lock.time_until_lock().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_activity_postpones_auto_lock() {
        let session = Arc::new(session());
        session.initialize(&secret("correct-horse")).await.unwrap();
        let auto_lock = AutoLock::start(Arc::clone(&session), Duration::from_millis(200));

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(80)).await;
            auto_lock.record_activity();
        }
        assert!(session.is_unlocked().await);
    }

    #[tokio::test]
    async fn test_disabled_auto_lock_never_fires() {
        let session = Arc::new(session());
        session.initialize(&secret("correct-horse")).await.unwrap();
        let auto_lock = AutoLock::start(Arc::clone(&session), Duration::from_millis(30));
        auto_lock.set_enabled(false);
        assert!(!auto_lock.is_enabled());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(session.is_unlocked().await);
        assert_eq!(auto_lock.time_until_lock().await, Duration::ZERO);
    }
}
