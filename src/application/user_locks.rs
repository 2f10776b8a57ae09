//! Per-user mutual exclusion.
//!
//! Every read-modify-write of a user's subscription runs while holding that
//! user's lock. Locks for different users are independent, so operations on
//! different users never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::UserId;
use crate::domain::membership::MembershipError;

/// Registry size above which idle entries are dropped.
const PRUNE_THRESHOLD: usize = 1024;

/// Keyed async locks with bounded acquisition time.
#[derive(Debug)]
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
    timeout: Duration,
}

/// Held lock for one user; released on drop.
#[derive(Debug)]
pub struct UserLockGuard {
    user_id: UserId,
    _guard: OwnedMutexGuard<()>,
}

impl UserLockGuard {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

impl UserLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Acquires the user's lock, failing with `Busy` after the timeout.
    pub async fn acquire(&self, user_id: &UserId) -> Result<UserLockGuard, MembershipError> {
        let lock = self.entry(user_id);
        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(UserLockGuard {
                user_id: user_id.clone(),
                _guard: guard,
            }),
            Err(_) => {
                tracing::debug!(user_id = %user_id, timeout = ?self.timeout, "User lock busy");
                Err(MembershipError::Busy(user_id.clone()))
            }
        }
    }

    /// Number of users with a registered lock.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, user_id: &UserId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.len() >= PRUNE_THRESHOLD {
            // Only the registry holds a reference to an idle lock.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(locks.entry(user_id.clone()).or_default())
    }
}
