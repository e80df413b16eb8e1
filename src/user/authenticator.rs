use super::AuthenticatedUser;
use crate::audit;
use crate::store::CredentialStore;
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// Why a login was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Unknown identity, wrong secret or empty input.
    InvalidCredentials,
    /// More than one account carries the identity. Shown to the user exactly
    /// like `InvalidCredentials`.
    AmbiguousIdentity,
    /// The store could not answer; the attempt may be retried.
    StoreUnavailable,
}

impl RejectReason {
    pub fn is_retryable(self) -> bool {
        matches!(self, RejectReason::StoreUnavailable)
    }

    /// Message safe to show to whoever submitted the form.
    pub fn user_message(self) -> &'static str {
        match self {
            RejectReason::InvalidCredentials | RejectReason::AmbiguousIdentity => {
                "Invalid email or password."
            }
            RejectReason::StoreUnavailable => {
                "The service is temporarily unavailable, please try again."
            }
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::InvalidCredentials => "invalid_credentials",
            RejectReason::AmbiguousIdentity => "ambiguous_identity",
            RejectReason::StoreUnavailable => "store_unavailable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Accepted(AuthenticatedUser),
    Rejected(RejectReason),
}

#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Authenticator {
        Authenticator { store }
    }

    /// Checks `credential` against the single account whose identity matches
    /// `identity` exactly.
    pub fn authenticate(&self, identity: &str, credential: &str) -> AuthResult {
        let result = self.evaluate(identity, credential);
        match &result {
            AuthResult::Accepted(user) => audit::login_accepted(&user.identity, user.account_id),
            AuthResult::Rejected(reason) => audit::login_rejected(identity, &reason.to_string()),
        }
        result
    }

    fn evaluate(&self, identity: &str, credential: &str) -> AuthResult {
        if identity.is_empty() || credential.is_empty() {
            return AuthResult::Rejected(RejectReason::InvalidCredentials);
        }

        let mut users = match self.store.find_users_by_identity(identity) {
            Ok(users) => users,
            Err(err) => {
                audit::login_failed(identity, &err.to_string());
                return AuthResult::Rejected(RejectReason::StoreUnavailable);
            }
        };

        let user = match users.len() {
            0 => return AuthResult::Rejected(RejectReason::InvalidCredentials),
            1 => users.remove(0),
            n => {
                audit::duplicate_identity(identity, n);
                return AuthResult::Rejected(RejectReason::AmbiguousIdentity);
            }
        };

        match user.credential.verify(credential) {
            Ok(true) => AuthResult::Accepted(AuthenticatedUser::from(&user)),
            Ok(false) => AuthResult::Rejected(RejectReason::InvalidCredentials),
            Err(err) => {
                error!(
                    "Stored credential of account {} is unreadable: {}",
                    user.account_id, err
                );
                AuthResult::Rejected(RejectReason::StoreUnavailable)
            }
        }
    }
}
