//! Test fixture creation for the portal database

use super::constants::*;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use streaming_portal::catalog::{ContentKind, Tier};
use streaming_portal::store::{CatalogAdminStore, SqliteStore};
use streaming_portal::user::StoredCredential;
use tempfile::TempDir;

/// Creates a temporary database with one free user, one premium user,
/// a few tracks and podcasts, and playlists for both users.
/// Returns (temp_dir, db_path).
pub fn create_test_db() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("portal.db");

    {
        let store = SqliteStore::new(&db_path, Duration::from_millis(STORE_TIMEOUT_MS))?;

        let free_id = create_user(&store, FREE_USER, FREE_PASS, Tier::Free)?;
        eprintln!("Created free user {} with id {}", FREE_USER, free_id);

        let premium_id = create_user(&store, PREMIUM_USER, PREMIUM_PASS, Tier::Premium)?;
        eprintln!("Created premium user {} with id {}", PREMIUM_USER, premium_id);

        for title in TRACK_TITLES {
            store.add_content(ContentKind::Track, title, "The Test Band", 210)?;
        }
        for title in PODCAST_TITLES {
            store.add_content(ContentKind::Podcast, title, "Talk Radio", 3600)?;
        }

        for title in FREE_USER_PLAYLISTS {
            store.add_playlist(FREE_USER, title, 12)?;
        }
        for title in PREMIUM_USER_PLAYLISTS {
            store.add_playlist(PREMIUM_USER, title, 30)?;
        }
    }

    Ok((temp_dir, db_path))
}

fn create_user(store: &SqliteStore, identity: &str, password: &str, tier: Tier) -> Result<usize> {
    let credential = StoredCredential::from_plain(password)?;
    Ok(store.create_user(identity, &credential, tier)?)
}
