use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use quiz_core::model::{Session, UserId};

use crate::error::StoreError;

//
// ─── SESSION STORE ─────────────────────────────────────────────────────────────
//

/// Process-wide table of active sessions, keyed by user.
///
/// At most one session exists per user; `create` is last-start-wins. The
/// restart-confirmation flag lives here too, in its own set, because the
/// session it follows has already been deleted by the time the offer goes
/// out.
///
/// The mutex makes individual operations safe from any task, but callers
/// must not run two transitions for the same user concurrently; the
/// dispatcher serializes per-process, which covers that.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<UserId, Session>,
    restart_pending: HashSet<UserId>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    /// Create a fresh session for `user`, replacing any existing one and
    /// clearing a pending restart confirmation. Always succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store lock is poisoned.
    pub fn create(&self, user: UserId, now: DateTime<Utc>) -> Result<Session, StoreError> {
        let mut guard = self.lock()?;
        let session = Session::new(user, now);
        guard.sessions.insert(user, session.clone());
        guard.restart_pending.remove(&user);
        Ok(session)
    }

    /// Snapshot of the user's session, if one is active.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store lock is poisoned.
    pub fn get(&self, user: UserId) -> Result<Option<Session>, StoreError> {
        Ok(self.lock()?.sessions.get(&user).cloned())
    }

    /// Apply a state transition to the user's session, if present.
    ///
    /// Returns `None` without calling `f` when no session exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store lock is poisoned.
    pub fn mutate<T>(
        &self,
        user: UserId,
        f: impl FnOnce(&mut Session) -> T,
    ) -> Result<Option<T>, StoreError> {
        Ok(self.lock()?.sessions.get_mut(&user).map(f))
    }

    /// Remove the user's session. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store lock is poisoned.
    pub fn delete(&self, user: UserId) -> Result<bool, StoreError> {
        Ok(self.lock()?.sessions.remove(&user).is_some())
    }

    /// Remove and return the user's session in one step.
    ///
    /// Classification works on the returned value, so a finished session
    /// is gone from the table before any result is presented and can
    /// never be scored twice.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store lock is poisoned.
    pub fn take_for_finish(&self, user: UserId) -> Result<Option<Session>, StoreError> {
        Ok(self.lock()?.sessions.remove(&user))
    }

    /// Put a session taken with [`take_for_finish`] back in the table,
    /// so the finish can run again after a failed presentation.
    ///
    /// If the user started over in the meantime the newer session wins
    /// and the returned one is dropped.
    ///
    /// [`take_for_finish`]: SessionStore::take_for_finish
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store lock is poisoned.
    pub fn restore(&self, session: Session) -> Result<(), StoreError> {
        self.lock()?
            .sessions
            .entry(session.user_id())
            .or_insert(session);
        Ok(())
    }

    /// Number of active sessions.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store lock is poisoned.
    pub fn active_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.sessions.len())
    }

    /// Flag the user as awaiting restart confirmation.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store lock is poisoned.
    pub fn mark_restart_pending(&self, user: UserId) -> Result<(), StoreError> {
        self.lock()?.restart_pending.insert(user);
        Ok(())
    }

    /// Clear the confirmation flag, reporting whether it was set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store lock is poisoned.
    pub fn take_restart_pending(&self, user: UserId) -> Result<bool, StoreError> {
        Ok(self.lock()?.restart_pending.remove(&user))
    }

    /// Drop sessions idle for longer than `max_idle`, returning the
    /// affected users.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store lock is poisoned.
    pub fn expire_idle(
        &self,
        now: DateTime<Utc>,
        max_idle: Duration,
    ) -> Result<Vec<UserId>, StoreError> {
        let mut guard = self.lock()?;
        let expired: Vec<UserId> = guard
            .sessions
            .values()
            .filter(|s| now - s.last_activity_at() > max_idle)
            .map(Session::user_id)
            .collect();
        for user in &expired {
            guard.sessions.remove(user);
            guard.restart_pending.remove(user);
        }
        Ok(expired)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
