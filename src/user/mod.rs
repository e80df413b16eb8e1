pub mod auth;
mod authenticator;
pub mod user_models;

pub use auth::{PortalHasher, StoredCredential};
pub use authenticator::{AuthResult, Authenticator, RejectReason};
pub use user_models::{AuthenticatedUser, UserRecord};
