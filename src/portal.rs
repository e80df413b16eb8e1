//! The portal core: authentication, sessions and tier routing wired together.

use crate::access::{AccessError, AccessRouter, HomeContent, HomeView, ViewPlan};
use crate::session::{
    SessionError, SessionHandle, SessionLookup, SessionManager, SessionPolicy, SessionStore,
};
use crate::store::CredentialStore;
use crate::user::{AuthResult, AuthenticatedUser, Authenticator, RejectReason};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn {
        handle: SessionHandle,
        user: AuthenticatedUser,
        home: HomeView,
    },
    Rejected(RejectReason),
}

#[derive(Clone)]
pub struct Portal {
    authenticator: Authenticator,
    sessions: SessionManager,
    router: AccessRouter,
}

impl Portal {
    pub fn new(
        credential_store: Arc<dyn CredentialStore>,
        session_store: Arc<dyn SessionStore>,
        session_policy: SessionPolicy,
    ) -> Portal {
        Portal {
            authenticator: Authenticator::new(credential_store.clone()),
            sessions: SessionManager::new(session_store, session_policy),
            router: AccessRouter::new(credential_store),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn router(&self) -> &AccessRouter {
        &self.router
    }

    /// Authenticates and, only when accepted, opens a session.
    pub fn login(&self, identity: &str, credential: &str) -> Result<LoginOutcome, SessionError> {
        match self.authenticator.authenticate(identity, credential) {
            AuthResult::Rejected(reason) => Ok(LoginOutcome::Rejected(reason)),
            AuthResult::Accepted(user) => {
                let handle = self
                    .sessions
                    .create_session(user.account_id, &user.identity, user.tier)?;
                Ok(LoginOutcome::LoggedIn {
                    handle,
                    home: HomeView::for_tier(user.tier),
                    user,
                })
            }
        }
    }

    pub fn logout(&self, handle: &SessionHandle) -> Result<(), SessionError> {
        self.sessions.destroy_session(handle)
    }

    /// A request without a handle is simply unauthenticated.
    pub fn resolve(&self, handle: Option<&SessionHandle>) -> Result<SessionLookup, SessionError> {
        match handle {
            Some(handle) => self.sessions.resolve_session(handle),
            None => Ok(SessionLookup::Unauthenticated),
        }
    }

    /// Home content for a resolved session, `None` when the caller must log in.
    pub fn home(&self, lookup: &SessionLookup) -> Result<Option<HomeContent>, AccessError> {
        let plan = self.router.route(lookup);
        match (&plan, lookup.session()) {
            (ViewPlan::Home { .. }, Some(session)) => {
                self.router.execute(&plan, session).map(Some)
            }
            _ => Ok(None),
        }
    }
}
