use super::{Session, SessionHandle, SessionStore};
use crate::audit;
use crate::catalog::Tier;
use crate::store::StoreError;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store failure: {0}")]
    Store(StoreError),

    #[error("malformed session record: {0}")]
    MalformedRecord(String),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Malformed { reason, .. } => SessionError::MalformedRecord(reason),
            other => SessionError::Store(other),
        }
    }
}

/// Result of resolving a handle. A missing, expired or destroyed handle is
/// `Unauthenticated`, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    Active(Session),
    Unauthenticated,
}

impl SessionLookup {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionLookup::Active(session) => Some(session),
            SessionLookup::Unauthenticated => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// A session unused for longer than this is expired.
    pub idle_timeout: Duration,
    /// A session older than this is expired regardless of activity.
    pub max_lifetime: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        SessionPolicy {
            idle_timeout: Duration::from_secs(5 * 60),
            max_lifetime: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl SessionPolicy {
    fn is_expired(&self, session: &Session, now: SystemTime) -> bool {
        let idle = now.duration_since(session.last_used).unwrap_or_default();
        let age = now.duration_since(session.created).unwrap_or_default();
        idle > self.idle_timeout || age > self.max_lifetime
    }
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    policy: SessionPolicy,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, policy: SessionPolicy) -> SessionManager {
        SessionManager { store, policy }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Binds a fresh handle to the given identity and tier.
    pub fn create_session(
        &self,
        account_id: usize,
        identity: &str,
        tier: Tier,
    ) -> Result<SessionHandle, SessionError> {
        self.create_session_at(account_id, identity, tier, SystemTime::now())
    }

    pub fn create_session_at(
        &self,
        account_id: usize,
        identity: &str,
        tier: Tier,
        now: SystemTime,
    ) -> Result<SessionHandle, SessionError> {
        let session = Session {
            handle: SessionHandle::generate(),
            account_id,
            identity: identity.to_string(),
            tier,
            created: now,
            last_used: now,
        };
        self.store.insert_session(&session)?;
        audit::session_created(session.handle.short(), identity, tier);
        Ok(session.handle)
    }

    /// Looks up a handle, refreshing its idle timer if it is still live.
    pub fn resolve_session(&self, handle: &SessionHandle) -> Result<SessionLookup, SessionError> {
        self.resolve_session_at(handle, SystemTime::now())
    }

    pub fn resolve_session_at(
        &self,
        handle: &SessionHandle,
        now: SystemTime,
    ) -> Result<SessionLookup, SessionError> {
        let Some(mut session) = self.store.get_session(handle)? else {
            debug!("no session for handle {}", handle.short());
            return Ok(SessionLookup::Unauthenticated);
        };

        if self.policy.is_expired(&session, now) {
            audit::session_expired(handle.short(), &session.identity);
            if let Err(err) = self.store.delete_session(handle) {
                warn!("failed to drop expired session {}: {}", handle.short(), err);
            }
            return Ok(SessionLookup::Unauthenticated);
        }

        self.store.touch_session(handle, now)?;
        session.last_used = now;
        Ok(SessionLookup::Active(session))
    }

    /// Ends a session. Destroying an unknown or already destroyed handle is a no-op.
    pub fn destroy_session(&self, handle: &SessionHandle) -> Result<(), SessionError> {
        if self.store.delete_session(handle)? {
            audit::session_destroyed(handle.short());
        }
        Ok(())
    }

    pub fn prune_expired(&self) -> Result<usize, SessionError> {
        self.prune_expired_at(SystemTime::now())
    }

    pub fn prune_expired_at(&self, now: SystemTime) -> Result<usize, SessionError> {
        let idle_cutoff = now
            .checked_sub(self.policy.idle_timeout)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let created_cutoff = now
            .checked_sub(self.policy.max_lifetime)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let removed = self
            .store
            .delete_expired_sessions(idle_cutoff, created_cutoff)?;
        if removed > 0 {
            audit::sessions_pruned(removed);
        }
        Ok(removed)
    }
}
