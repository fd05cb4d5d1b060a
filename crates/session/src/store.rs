//! In-process session store keyed by channel + sender.
//!
//! Sessions are created on first use and guarded by a per-session
//! `tokio::sync::Mutex`. `begin_turn` waits its turn; `try_begin_turn`
//! fails fast when a turn is already running. Different sessions share
//! nothing and proceed fully concurrently.

use copperclaw_core::error::SessionError;
use copperclaw_core::session::{Session, SessionKey};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Exclusive access to one session for the duration of a turn.
///
/// Derefs to [`Session`]. Dropping the guard ends the turn and lets the
/// next caller in.
#[derive(Debug)]
pub struct TurnGuard {
    guard: OwnedMutexGuard<Session>,
}

impl Deref for TurnGuard {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.guard
    }
}

impl DerefMut for TurnGuard {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.guard
    }
}

/// The session store: a map from identity to locked session slots.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionKey, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of sessions currently held.
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a session exists for this identity.
    pub fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.read().unwrap().contains_key(key)
    }

    /// All known session identities.
    pub fn keys(&self) -> Vec<SessionKey> {
        self.sessions.read().unwrap().keys().cloned().collect()
    }

    /// Drop a session from the store. A turn already holding the slot
    /// keeps it alive until its guard is released; the store just stops
    /// handing it out. Returns whether the session existed.
    pub fn remove(&self, key: &SessionKey) -> bool {
        self.sessions.write().unwrap().remove(key).is_some()
    }

    /// Drop all sessions.
    pub fn clear(&self) {
        self.sessions.write().unwrap().clear();
    }

    fn slot(&self, key: &SessionKey) -> Arc<Mutex<Session>> {
        if let Some(slot) = self.sessions.read().unwrap().get(key) {
            return slot.clone();
        }

        let mut sessions = self.sessions.write().unwrap();
        // Re-check under the write lock; another caller may have won.
        sessions
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(session = %key, "Created session");
                Arc::new(Mutex::new(Session::new(key.clone())))
            })
            .clone()
    }

    /// Begin a turn on the session for `key`, creating the session on
    /// first use. Waits until any in-flight turn on the same session
    /// finishes.
    pub async fn begin_turn(&self, key: &SessionKey) -> TurnGuard {
        let guard = self.slot(key).lock_owned().await;
        TurnGuard { guard }
    }

    /// Begin a turn without waiting. Fails with
    /// [`SessionError::TurnInProgress`] when the session is busy.
    pub fn try_begin_turn(&self, key: &SessionKey) -> Result<TurnGuard, SessionError> {
        match self.slot(key).try_lock_owned() {
            Ok(guard) => Ok(TurnGuard { guard }),
            Err(_) => Err(SessionError::TurnInProgress {
                session: key.to_string(),
            }),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
