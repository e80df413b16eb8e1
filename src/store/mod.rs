//! Credential store: the relational collaborator holding users, content and playlists.

mod sqlite_store;

pub use sqlite_store::SqliteStore;

use crate::catalog::{ContentItem, ContentKind, Playlist, Tier};
use crate::user::{StoredCredential, UserRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached, was busy past its timeout, or failed mid-query.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A row did not match its typed shape.
    #[error("malformed {table} row: {reason}")]
    Malformed { table: &'static str, reason: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(err.to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read queries the portal core depends on.
pub trait CredentialStore: Send + Sync {
    /// Returns every user whose identity equals `identity` exactly.
    /// More than one row means the upstream uniqueness invariant is broken.
    fn find_users_by_identity(&self, identity: &str) -> StoreResult<Vec<UserRecord>>;

    /// Returns the users of a tier, ordered by account id.
    fn list_users_by_tier(&self, tier: Tier) -> StoreResult<Vec<UserRecord>>;

    /// Returns the catalog entries of a kind, ordered by content id.
    fn list_content_by_kind(&self, kind: ContentKind) -> StoreResult<Vec<ContentItem>>;

    /// Returns the playlists owned by `owner`, ordered by playlist id.
    fn list_playlists_by_owner(&self, owner: &str) -> StoreResult<Vec<Playlist>>;
}

/// Mutations used by the operator tooling and test fixtures.
pub trait CatalogAdminStore: CredentialStore {
    /// Creates a user and returns its account id.
    fn create_user(
        &self,
        identity: &str,
        credential: &StoredCredential,
        tier: Tier,
    ) -> StoreResult<usize>;

    fn set_user_tier(&self, identity: &str, tier: Tier) -> StoreResult<()>;

    fn set_user_credential(&self, identity: &str, credential: &StoredCredential)
        -> StoreResult<()>;

    /// Adds a catalog entry and returns its id.
    fn add_content(
        &self,
        kind: ContentKind,
        title: &str,
        artist: &str,
        duration_sec: u32,
    ) -> StoreResult<usize>;

    /// Adds a playlist for `owner` and returns its id.
    fn add_playlist(&self, owner: &str, title: &str, track_count: u32) -> StoreResult<usize>;
}
