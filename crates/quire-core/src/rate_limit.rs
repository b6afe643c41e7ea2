//! Failed-unlock counter and lockout window.
//!
//! State lives in the secure store so it survives restarts and cannot be
//! cleared by wiping ordinary app data. Reads fail closed: a store error
//! refuses the unlock rather than reporting zero failures.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{QuireError, Result};
use crate::secure_store::{keys, SecureStore};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Attempt threshold and lockout window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lockout: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutStatus {
    pub locked: bool,
    pub minutes_left: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub locked: bool,
    pub minutes_left: u64,
    pub attempts_remaining: u32,
}

fn ceil_minutes(millis: i64) -> u64 {
    if millis <= 0 {
        return 0;
    }
    ((millis + MILLIS_PER_MINUTE - 1) / MILLIS_PER_MINUTE) as u64
}

#[derive(Clone)]
pub struct RateLimiter {
    store: SecureStore,
    clock: Arc<dyn Clock>,
    policy: LockoutPolicy,
}

impl RateLimiter {
    pub fn new(store: SecureStore, policy: LockoutPolicy) -> Self {
        Self::with_clock(store, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(store: SecureStore, policy: LockoutPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Consecutive failed unlocks since the last reset.
    pub async fn failed_attempts(&self) -> Result<u32> {
        match self.store.get(keys::FAILED_ATTEMPTS).await? {
            Some(value) => value.trim().parse().map_err(|_| {
                QuireError::Validation(format!("Corrupt failed-attempt counter: {:?}", value))
            }),
            None => Ok(0),
        }
    }

    async fn lockout_until(&self) -> Result<i64> {
        match self.store.get(keys::LOCKOUT_UNTIL).await? {
            Some(value) => value.trim().parse().map_err(|_| {
                QuireError::Validation(format!("Corrupt lockout timestamp: {:?}", value))
            }),
            None => Ok(0),
        }
    }

    /// Whether unlocks are currently refused. Read only.
    pub async fn check_lockout(&self) -> Result<LockoutStatus> {
        let remaining = self.lockout_until().await? - self.clock.now_millis();
        if remaining > 0 {
            Ok(LockoutStatus {
                locked: true,
                minutes_left: ceil_minutes(remaining),
            })
        } else {
            Ok(LockoutStatus {
                locked: false,
                minutes_left: 0,
            })
        }
    }

    /// Count a failed unlock, starting the lockout window at the threshold.
    pub async fn record_failed_attempt(&self) -> Result<AttemptOutcome> {
        let failed = self.failed_attempts().await?.saturating_add(1);
        self.store
            .set(keys::FAILED_ATTEMPTS, &failed.to_string())
            .await?;

        if failed >= self.policy.max_attempts {
            let window = self.policy.lockout.as_millis() as i64;
            let until = self.clock.now_millis() + window;
            self.store
                .set(keys::LOCKOUT_UNTIL, &until.to_string())
                .await?;
            tracing::warn!(failed, "unlock locked out after repeated failures");
            return Ok(AttemptOutcome {
                locked: true,
                minutes_left: ceil_minutes(window),
                attempts_remaining: 0,
            });
        }

        Ok(AttemptOutcome {
            locked: false,
            minutes_left: 0,
            attempts_remaining: self.policy.max_attempts - failed,
        })
    }

    /// Clear the counter and any lockout. Call only after a verified unlock.
    pub async fn reset_failed_attempts(&self) -> Result<()> {
        self.store.delete(keys::FAILED_ATTEMPTS).await?;
        self.store.delete(keys::LOCKOUT_UNTIL).await
    }

    pub async fn remaining_attempts(&self) -> Result<u32> {
        Ok(self
            .policy
            .max_attempts
            .saturating_sub(self.failed_attempts().await?))
    }
}
