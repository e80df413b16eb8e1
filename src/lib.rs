//! Streaming portal library
//!
//! Credential verification, tier-bound sessions and tier-aware routing for a
//! music and podcast catalog, plus the HTTP surface and operator tooling built
//! on top of them.

pub mod access;
pub mod audit;
pub mod catalog;
pub mod cli_style;
pub mod config;
pub mod portal;
pub mod server;
pub mod session;
pub mod sqlite_persistence;
pub mod store;
pub mod user;

// Re-export commonly used types for convenience
pub use portal::{LoginOutcome, Portal};
pub use server::{run_server, RequestsLoggingLevel};
pub use session::{InMemorySessionStore, SessionManager, SessionPolicy};
pub use store::{CatalogAdminStore, CredentialStore, SqliteStore};
