//! Common test infrastructure
//!
//! Everything an end-to-end test needs: an isolated server on a random port
//! and a cookie-keeping client that does not follow redirects.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, FREE_USER, FREE_PASS};
//!
//! #[tokio::test]
//! async fn test_free_home() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     client.login(FREE_USER, FREE_PASS).await;
//!     let response = client.home_free().await;
//!     assert_eq!(response.status(), reqwest::StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod fixtures;
mod server;

// Public API - this is what tests import
pub use client::{json_body, location, set_cookie, titles, TestClient};
pub use constants::*;
pub use server::TestServer;

// Keep fixtures internal - only accessed via TestServer::spawn()
#[allow(unused_imports)]
pub(crate) use fixtures::create_test_db;
