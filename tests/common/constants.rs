//! Shared constants for end-to-end tests
//!
//! When test data changes (credentials, catalog titles, playlists),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Free tier user identity
pub const FREE_USER: &str = "bob@x.com";

/// Free tier user password
pub const FREE_PASS: &str = "secret";

/// Premium tier user identity
pub const PREMIUM_USER: &str = "carol@x.com";

/// Premium tier user password
pub const PREMIUM_PASS: &str = "carolpass123";

// ============================================================================
// Test Catalog
// ============================================================================

/// Tracks, in insertion order
pub const TRACK_TITLES: [&str; 3] = ["Opening Track", "Middle Track", "Closing Track"];

/// Podcasts, in insertion order
pub const PODCAST_TITLES: [&str; 2] = ["Morning Talk", "Late Show"];

/// Playlists owned by the free user, only visible once upgraded
pub const FREE_USER_PLAYLISTS: [&str; 2] = ["Road Trip", "Focus"];

/// Playlists owned by the premium user
pub const PREMIUM_USER_PLAYLISTS: [&str; 1] = ["Carol Mix"];

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// How long a store query may wait on a locked database in tests
pub const STORE_TIMEOUT_MS: u64 = 2000;
