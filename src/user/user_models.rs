use serde::Serialize;

use super::auth::StoredCredential;
use crate::catalog::Tier;

/// A user row as the store holds it.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub account_id: usize,
    pub identity: String,
    pub credential: StoredCredential,
    pub tier: Tier,
}

/// The part of a user that survives a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub account_id: usize,
    pub identity: String,
    pub tier: Tier,
}

impl From<&UserRecord> for AuthenticatedUser {
    fn from(record: &UserRecord) -> Self {
        AuthenticatedUser {
            account_id: record.account_id,
            identity: record.identity.clone(),
            tier: record.tier,
        }
    }
}
