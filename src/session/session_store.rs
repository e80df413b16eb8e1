use super::{Session, SessionHandle};
use crate::store::{StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

pub trait SessionStore: Send + Sync {
    /// Adds a new session. Fails with `Conflict` if the handle is already taken.
    fn insert_session(&self, session: &Session) -> StoreResult<()>;

    /// Returns the session bound to `handle`, if any.
    fn get_session(&self, handle: &SessionHandle) -> StoreResult<Option<Session>>;

    /// Updates the last-used timestamp of a session.
    fn touch_session(&self, handle: &SessionHandle, when: SystemTime) -> StoreResult<()>;

    /// Removes a session, returns whether it existed.
    fn delete_session(&self, handle: &SessionHandle) -> StoreResult<bool>;

    /// Removes sessions idle since before `idle_cutoff` or created before `created_cutoff`.
    fn delete_expired_sessions(
        &self,
        idle_cutoff: SystemTime,
        created_cutoff: SystemTime,
    ) -> StoreResult<usize>;
}

/// Process-local session store, lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionHandle, Session>>,
}

impl InMemorySessionStore {
    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<SessionHandle, Session>>> {
        self.sessions
            .lock()
            .map_err(|_| StoreError::Unavailable("session map lock poisoned".to_string()))
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.lock()?.is_empty())
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert_session(&self, session: &Session) -> StoreResult<()> {
        let mut sessions = self.lock()?;
        if sessions.contains_key(&session.handle) {
            return Err(StoreError::Conflict(format!(
                "session {} already exists",
                session.handle.short()
            )));
        }
        sessions.insert(session.handle.clone(), session.clone());
        Ok(())
    }

    fn get_session(&self, handle: &SessionHandle) -> StoreResult<Option<Session>> {
        Ok(self.lock()?.get(handle).cloned())
    }

    fn touch_session(&self, handle: &SessionHandle, when: SystemTime) -> StoreResult<()> {
        if let Some(session) = self.lock()?.get_mut(handle) {
            session.last_used = when;
        }
        Ok(())
    }

    fn delete_session(&self, handle: &SessionHandle) -> StoreResult<bool> {
        Ok(self.lock()?.remove(handle).is_some())
    }

    fn delete_expired_sessions(
        &self,
        idle_cutoff: SystemTime,
        created_cutoff: SystemTime,
    ) -> StoreResult<usize> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_used >= idle_cutoff && s.created >= created_cutoff);
        Ok(before - sessions.len())
    }
}
