mod session_manager;
mod session_store;

pub use session_manager::{SessionError, SessionLookup, SessionManager, SessionPolicy};
pub use session_store::{InMemorySessionStore, SessionStore};

use crate::catalog::Tier;
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

const SESSION_HANDLE_LEN: usize = 64;

/// Opaque per-client session key carried by the transport (cookie or header).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(pub String);

impl SessionHandle {
    pub fn generate() -> SessionHandle {
        let random_string: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_HANDLE_LEN)
            .map(char::from)
            .collect();
        SessionHandle(random_string)
    }

    /// A prefix safe to put in logs.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionHandle({}…)", self.short())
    }
}

/// Server-side binding of a client to an authenticated identity and tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub handle: SessionHandle,
    pub account_id: usize,
    pub identity: String,
    pub tier: Tier,
    pub created: SystemTime,
    pub last_used: SystemTime,
}
