use super::{CatalogAdminStore, CredentialStore, StoreError, StoreResult};
use crate::catalog::{ContentItem, ContentKind, Playlist, Tier};
use crate::session::{Session, SessionHandle, SessionStore};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    migrate_if_needed, ForeignKey, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use crate::user::{PortalHasher, StoredCredential, UserRecord};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("identity", SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("salt", SqlType::Text, non_null = true),
        sqlite_column!("hash", SqlType::Text, non_null = true),
        sqlite_column!("hasher", SqlType::Text, non_null = true),
        sqlite_column!(
            "tier",
            SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_user_tier", "tier")],
};
const CONTENT_TABLE_V_0: Table = Table {
    name: "content",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("kind", SqlType::Integer, non_null = true),
        sqlite_column!("title", SqlType::Text, non_null = true),
        sqlite_column!("artist", SqlType::Text, non_null = true),
        sqlite_column!(
            "duration_sec",
            SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_content_kind", "kind")],
};
const PLAYLIST_TABLE_V_0: Table = Table {
    name: "playlist",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "owner",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "identity",
            })
        ),
        sqlite_column!("title", SqlType::Text, non_null = true),
        sqlite_column!(
            "track_count",
            SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_playlist_owner", "owner")],
};

/// V 1
const SESSION_TABLE_V_1: Table = Table {
    name: "session",
    columns: &[
        sqlite_column!("handle", SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "account_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
            })
        ),
        sqlite_column!("identity", SqlType::Text, non_null = true),
        sqlite_column!("tier", SqlType::Integer, non_null = true),
        sqlite_column!("created", SqlType::Integer, non_null = true),
        sqlite_column!("last_used", SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_session_last_used", "last_used")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[USER_TABLE_V_0, CONTENT_TABLE_V_0, PLAYLIST_TABLE_V_0],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USER_TABLE_V_0,
            CONTENT_TABLE_V_0,
            PLAYLIST_TABLE_V_0,
            SESSION_TABLE_V_1,
        ],
        migration: Some(|conn: &Connection| {
            SESSION_TABLE_V_1.create(conn)?;
            Ok(())
        }),
    },
];

fn to_unix_secs(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn from_unix_secs(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

type UserRow = (i64, String, String, String, String, i32);

fn read_user_row(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn user_record_from_row(row: UserRow) -> StoreResult<UserRecord> {
    let (id, identity, salt, hash, hasher, tier) = row;
    let hasher = PortalHasher::from_str(&hasher).map_err(|err| StoreError::Malformed {
        table: "user",
        reason: err.to_string(),
    })?;
    let tier = Tier::from_int(tier).ok_or_else(|| StoreError::Malformed {
        table: "user",
        reason: format!("unknown tier {} for {}", tier, identity),
    })?;
    Ok(UserRecord {
        account_id: id as usize,
        identity,
        credential: StoredCredential { salt, hash, hasher },
        tier,
    })
}

/// SQLite-backed store for users, catalog content, playlists and sessions.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `db_path`. Every statement waits at
    /// most `busy_timeout` for a competing writer before failing.
    pub fn new<T: AsRef<Path>>(db_path: T, busy_timeout: Duration) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            let conn = Connection::open_with_flags(
                &db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_context(|| format!("Failed to open {:?}", db_path.as_ref()))?;
            migrate_if_needed(&conn, VERSIONED_SCHEMAS)?;
            conn
        } else {
            info!("Creating new database at {:?}", db_path.as_ref());
            let conn = Connection::open(&db_path)?;
            VERSIONED_SCHEMAS
                .last()
                .context("No schema defined")?
                .create(&conn)?;
            conn
        };
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        conn.busy_timeout(busy_timeout)?;

        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Looks for a `portal.db` in `/data/db` and then upwards from the current directory.
    pub fn infer_path() -> Option<PathBuf> {
        let db_data_dir = PathBuf::from("/data/db/portal.db");
        if db_data_dir.exists() {
            return Some(db_data_dir);
        }

        let mut current_dir = std::env::current_dir().ok()?;
        loop {
            let candidate = current_dir.join("portal.db");
            if candidate.is_file() {
                return Some(candidate);
            }
            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }
        None
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    /// Number of rows in each table.
    pub fn table_counts(&self) -> StoreResult<Vec<(&'static str, usize)>> {
        let conn = self.lock()?;
        let mut counts = vec![];
        for table in [
            USER_TABLE_V_0.name,
            CONTENT_TABLE_V_0.name,
            PLAYLIST_TABLE_V_0.name,
            SESSION_TABLE_V_1.name,
        ] {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            counts.push((table, count as usize));
        }
        Ok(counts)
    }
}

impl CredentialStore for SqliteStore {
    fn find_users_by_identity(&self, identity: &str) -> StoreResult<Vec<UserRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, identity, salt, hash, hasher, tier FROM user WHERE identity = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![identity], read_user_row)?
            .collect::<Result<Vec<UserRow>, _>>()?;
        rows.into_iter().map(user_record_from_row).collect()
    }

    fn list_users_by_tier(&self, tier: Tier) -> StoreResult<Vec<UserRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, identity, salt, hash, hasher, tier FROM user WHERE tier = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![tier.to_int()], read_user_row)?
            .collect::<Result<Vec<UserRow>, _>>()?;
        rows.into_iter().map(user_record_from_row).collect()
    }

    fn list_content_by_kind(&self, kind: ContentKind) -> StoreResult<Vec<ContentItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, artist, duration_sec FROM content WHERE kind = ?1 ORDER BY id",
        )?;
        let items = stmt
            .query_map(params![kind.to_int()], |row| {
                Ok(ContentItem {
                    id: row.get::<_, i64>(0)? as usize,
                    kind,
                    title: row.get(1)?,
                    artist: row.get(2)?,
                    duration_sec: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn list_playlists_by_owner(&self, owner: &str) -> StoreResult<Vec<Playlist>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, owner, title, track_count FROM playlist WHERE owner = ?1 ORDER BY id",
        )?;
        let playlists = stmt
            .query_map(params![owner], |row| {
                Ok(Playlist {
                    id: row.get::<_, i64>(0)? as usize,
                    owner: row.get(1)?,
                    title: row.get(2)?,
                    track_count: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(playlists)
    }
}

impl CatalogAdminStore for SqliteStore {
    fn create_user(
        &self,
        identity: &str,
        credential: &StoredCredential,
        tier: Tier,
    ) -> StoreResult<usize> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO user (identity, salt, hash, hasher, tier) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                identity,
                credential.salt,
                credential.hash,
                credential.hasher.to_string(),
                tier.to_int()
            ],
        )?;
        let id = conn.last_insert_rowid() as usize;
        debug!("Created user {} with id {}", identity, id);
        Ok(id)
    }

    fn set_user_tier(&self, identity: &str, tier: Tier) -> StoreResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE user SET tier = ?1 WHERE identity = ?2",
            params![tier.to_int(), identity],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("user {}", identity)));
        }
        Ok(())
    }

    fn set_user_credential(
        &self,
        identity: &str,
        credential: &StoredCredential,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE user SET salt = ?1, hash = ?2, hasher = ?3 WHERE identity = ?4",
            params![
                credential.salt,
                credential.hash,
                credential.hasher.to_string(),
                identity
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("user {}", identity)));
        }
        Ok(())
    }

    fn add_content(
        &self,
        kind: ContentKind,
        title: &str,
        artist: &str,
        duration_sec: u32,
    ) -> StoreResult<usize> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO content (kind, title, artist, duration_sec) VALUES (?1, ?2, ?3, ?4)",
            params![kind.to_int(), title, artist, duration_sec],
        )?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn add_playlist(&self, owner: &str, title: &str, track_count: u32) -> StoreResult<usize> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO playlist (owner, title, track_count) VALUES (?1, ?2, ?3)",
            params![owner, title, track_count],
        )?;
        Ok(conn.last_insert_rowid() as usize)
    }
}

impl SessionStore for SqliteStore {
    fn insert_session(&self, session: &Session) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO session (handle, account_id, identity, tier, created, last_used) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.handle.0,
                session.account_id as i64,
                session.identity,
                session.tier.to_int(),
                to_unix_secs(session.created),
                to_unix_secs(session.last_used)
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, handle: &SessionHandle) -> StoreResult<Option<Session>> {
        let conn = self.lock()?;
        let row: Option<(i64, String, i32, i64, i64)> = conn
            .query_row(
                "SELECT account_id, identity, tier, created, last_used FROM session WHERE handle = ?1",
                params![handle.0],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((account_id, identity, tier, created, last_used)) = row else {
            return Ok(None);
        };
        let tier = Tier::from_int(tier).ok_or_else(|| StoreError::Malformed {
            table: "session",
            reason: format!("unknown tier {} for session {}", tier, handle.short()),
        })?;
        Ok(Some(Session {
            handle: handle.clone(),
            account_id: account_id as usize,
            identity,
            tier,
            created: from_unix_secs(created),
            last_used: from_unix_secs(last_used),
        }))
    }

    fn touch_session(&self, handle: &SessionHandle, when: SystemTime) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE session SET last_used = ?1 WHERE handle = ?2",
            params![to_unix_secs(when), handle.0],
        )?;
        Ok(())
    }

    fn delete_session(&self, handle: &SessionHandle) -> StoreResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM session WHERE handle = ?1", params![handle.0])?;
        Ok(deleted > 0)
    }

    fn delete_expired_sessions(
        &self,
        idle_cutoff: SystemTime,
        created_cutoff: SystemTime,
    ) -> StoreResult<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM session WHERE last_used < ?1 OR created < ?2",
            params![to_unix_secs(idle_cutoff), to_unix_secs(created_cutoff)],
        )?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_persistence::read_db_version;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let temp_file_path = temp_dir.path().join("test.db");
        let store = SqliteStore::new(&temp_file_path, Duration::from_millis(500)).unwrap();
        (store, temp_dir)
    }

    fn credential(plain: &str) -> StoredCredential {
        StoredCredential::from_plain(plain).unwrap()
    }

    #[test]
    fn creates_and_finds_users() {
        let (store, _temp_dir) = create_tmp_store();

        let id = store
            .create_user("bob@x.com", &credential("secret"), Tier::Premium)
            .unwrap();
        assert_eq!(id, 1);

        let found = store.find_users_by_identity("bob@x.com").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].account_id, 1);
        assert_eq!(found[0].tier, Tier::Premium);
        assert!(found[0].credential.verify("secret").unwrap());

        assert!(store.find_users_by_identity("BOB@x.com").unwrap().is_empty());
    }

    #[test]
    fn duplicate_identity_is_a_conflict() {
        let (store, _temp_dir) = create_tmp_store();
        store
            .create_user("bob@x.com", &credential("a"), Tier::Free)
            .unwrap();

        let result = store.create_user("bob@x.com", &credential("b"), Tier::Free);
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn updates_tier_and_credential() {
        let (store, _temp_dir) = create_tmp_store();
        store
            .create_user("bob@x.com", &credential("old"), Tier::Free)
            .unwrap();

        store.set_user_tier("bob@x.com", Tier::Premium).unwrap();
        store
            .set_user_credential("bob@x.com", &credential("new"))
            .unwrap();

        let user = store.find_users_by_identity("bob@x.com").unwrap().remove(0);
        assert_eq!(user.tier, Tier::Premium);
        assert!(user.credential.verify("new").unwrap());
        assert!(!user.credential.verify("old").unwrap());

        assert!(matches!(
            store.set_user_tier("nobody@x.com", Tier::Free),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn lists_users_by_tier() {
        let (store, _temp_dir) = create_tmp_store();
        store
            .create_user("a@x.com", &credential("a"), Tier::Free)
            .unwrap();
        store
            .create_user("b@x.com", &credential("b"), Tier::Premium)
            .unwrap();
        store
            .create_user("c@x.com", &credential("c"), Tier::Free)
            .unwrap();

        let free: Vec<String> = store
            .list_users_by_tier(Tier::Free)
            .unwrap()
            .into_iter()
            .map(|u| u.identity)
            .collect();
        assert_eq!(free, vec!["a@x.com", "c@x.com"]);
    }

    #[test]
    fn unknown_tier_value_is_malformed() {
        let (store, _temp_dir) = create_tmp_store();
        store
            .create_user("bob@x.com", &credential("a"), Tier::Free)
            .unwrap();
        store
            .lock()
            .unwrap()
            .execute("UPDATE user SET tier = 9", [])
            .unwrap();

        assert!(matches!(
            store.find_users_by_identity("bob@x.com"),
            Err(StoreError::Malformed { table: "user", .. })
        ));
    }

    #[test]
    fn content_is_split_by_kind_in_id_order() {
        let (store, _temp_dir) = create_tmp_store();
        store
            .add_content(ContentKind::Track, "Song A", "Artist", 200)
            .unwrap();
        store
            .add_content(ContentKind::Podcast, "Show", "Host", 3600)
            .unwrap();
        store
            .add_content(ContentKind::Track, "Song B", "Artist", 180)
            .unwrap();

        let tracks = store.list_content_by_kind(ContentKind::Track).unwrap();
        assert_eq!(
            tracks.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
            vec!["Song A", "Song B"]
        );
        assert!(tracks.iter().all(|t| t.kind == ContentKind::Track));

        let podcasts = store.list_content_by_kind(ContentKind::Podcast).unwrap();
        assert_eq!(podcasts.len(), 1);
        assert_eq!(podcasts[0].duration_sec, 3600);
    }

    #[test]
    fn playlists_are_scoped_to_their_owner() {
        let (store, _temp_dir) = create_tmp_store();
        store
            .create_user("bob@x.com", &credential("a"), Tier::Premium)
            .unwrap();
        store
            .create_user("carol@x.com", &credential("b"), Tier::Premium)
            .unwrap();
        store.add_playlist("bob@x.com", "Road trip", 12).unwrap();
        store.add_playlist("carol@x.com", "Focus", 30).unwrap();

        let bobs = store.list_playlists_by_owner("bob@x.com").unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].title, "Road trip");
        assert_eq!(bobs[0].track_count, 12);
    }

    #[test]
    fn playlist_requires_existing_owner() {
        let (store, _temp_dir) = create_tmp_store();
        let result = store.add_playlist("ghost@x.com", "Nothing", 0);
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn persists_sessions() {
        let (store, _temp_dir) = create_tmp_store();
        let account_id = store
            .create_user("bob@x.com", &credential("a"), Tier::Free)
            .unwrap();
        let created = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let session = Session {
            handle: SessionHandle::generate(),
            account_id,
            identity: "bob@x.com".to_string(),
            tier: Tier::Free,
            created,
            last_used: created,
        };

        store.insert_session(&session).unwrap();
        assert_eq!(store.get_session(&session.handle).unwrap(), Some(session.clone()));

        let later = created + Duration::from_secs(60);
        store.touch_session(&session.handle, later).unwrap();
        assert_eq!(
            store.get_session(&session.handle).unwrap().unwrap().last_used,
            later
        );

        assert!(store.delete_session(&session.handle).unwrap());
        assert!(!store.delete_session(&session.handle).unwrap());
        assert_eq!(store.get_session(&session.handle).unwrap(), None);
    }

    #[test]
    fn deletes_expired_sessions() {
        let (store, _temp_dir) = create_tmp_store();
        let account_id = store
            .create_user("bob@x.com", &credential("a"), Tier::Free)
            .unwrap();
        let t0 = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let make = |last_used: SystemTime| Session {
            handle: SessionHandle::generate(),
            account_id,
            identity: "bob@x.com".to_string(),
            tier: Tier::Free,
            created: t0,
            last_used,
        };
        let old = make(t0);
        let recent = make(t0 + Duration::from_secs(500));
        store.insert_session(&old).unwrap();
        store.insert_session(&recent).unwrap();

        let removed = store
            .delete_expired_sessions(t0 + Duration::from_secs(100), t0)
            .unwrap();

        assert_eq!(removed, 1);
        assert!(store.get_session(&old.handle).unwrap().is_none());
        assert!(store.get_session(&recent.handle).unwrap().is_some());
    }

    #[test]
    fn migrates_database_without_session_table() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("old.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        }

        let store = SqliteStore::new(&db_path, Duration::from_millis(500)).unwrap();

        let conn = store.lock().unwrap();
        assert_eq!(read_db_version(&conn).unwrap(), 1);
        VERSIONED_SCHEMAS[1].validate(&conn).unwrap();
    }

    #[test]
    fn reopens_existing_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("portal.db");
        {
            let store = SqliteStore::new(&db_path, Duration::from_millis(500)).unwrap();
            store
                .create_user("bob@x.com", &credential("a"), Tier::Free)
                .unwrap();
        }

        let store = SqliteStore::new(&db_path, Duration::from_millis(500)).unwrap();
        assert_eq!(store.find_users_by_identity("bob@x.com").unwrap().len(), 1);
        assert!(store
            .table_counts()
            .unwrap()
            .contains(&("user", 1)));
    }
}
