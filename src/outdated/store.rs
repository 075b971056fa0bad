//! Persistence for outdated-artifact results and tracked artifacts

use std::path::Path;
use std::sync::{Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
#[cfg(test)]
use mockall::automock;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::apps::model::AppArtifact;
use crate::outdated::model::OutdatedArtifactInfo;
use crate::version::error::StoreError;

/// TTL-aware store for refresh results
#[cfg_attr(test, automock)]
pub trait OutdatedArtifactStore: Send + Sync {
    /// Upsert every record by id as one atomic write
    fn save_all(&self, infos: &[OutdatedArtifactInfo]) -> Result<(), StoreError>;

    /// Records whose `last_updated + time_to_live` is after `now`, ordered by id
    fn find_all(&self, now: DateTime<Utc>) -> Result<Vec<OutdatedArtifactInfo>, StoreError>;

    /// Drop records expired at `now`, returning how many were removed
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Record a tracked artifact, keyed by identity
    fn save_artifact(&self, artifact: &AppArtifact) -> Result<(), StoreError>;

    /// Every tracked artifact, ordered by identity
    fn find_artifacts(&self) -> Result<Vec<AppArtifact>, StoreError>;
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    outdated: RwLock<IndexMap<String, OutdatedArtifactInfo>>,
    artifacts: RwLock<IndexMap<String, AppArtifact>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutdatedArtifactStore for MemoryStore {
    fn save_all(&self, infos: &[OutdatedArtifactInfo]) -> Result<(), StoreError> {
        let mut outdated = self.outdated.write().map_err(|_| StoreError::LockPoisoned)?;
        for info in infos {
            outdated.insert(info.id.clone(), info.clone());
        }
        Ok(())
    }

    fn find_all(&self, now: DateTime<Utc>) -> Result<Vec<OutdatedArtifactInfo>, StoreError> {
        let outdated = self.outdated.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut infos: Vec<OutdatedArtifactInfo> = outdated
            .values()
            .filter(|info| !info.is_expired(now))
            .cloned()
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(infos)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut outdated = self.outdated.write().map_err(|_| StoreError::LockPoisoned)?;
        let before = outdated.len();
        outdated.retain(|_, info| !info.is_expired(now));
        Ok(before - outdated.len())
    }

    fn save_artifact(&self, artifact: &AppArtifact) -> Result<(), StoreError> {
        let mut artifacts = self.artifacts.write().map_err(|_| StoreError::LockPoisoned)?;
        artifacts.insert(artifact.identity.clone(), artifact.clone());
        Ok(())
    }

    fn find_artifacts(&self) -> Result<Vec<AppArtifact>, StoreError> {
        let artifacts = self.artifacts.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut all: Vec<AppArtifact> = artifacts.values().cloned().collect();
        all.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(all)
    }
}

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: expiry lookups
    &["CREATE INDEX IF NOT EXISTS idx_outdated_expires_at ON outdated_artifacts(expires_at)"],
    // v2: artifact listing by type
    &[
        "ALTER TABLE app_artifacts ADD COLUMN artifact_type TEXT NOT NULL DEFAULT ''",
        "CREATE INDEX IF NOT EXISTS idx_app_artifacts_type ON app_artifacts(artifact_type)",
    ],
];

/// SQLite-backed store; payloads are stored as JSON
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        info!("Initializing result store at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        info!("Result store initialized successfully");

        Ok(store)
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS outdated_artifacts (
                id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                last_updated INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS app_artifacts (
                identity TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                discovered_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    match conn.execute(sql, []) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                            if msg.contains("duplicate column name") =>
                        {
                            debug!("Column already exists, skipping: {}", sql);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }
}

impl OutdatedArtifactStore for SqliteStore {
    fn save_all(&self, infos: &[OutdatedArtifactInfo]) -> Result<(), StoreError> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO outdated_artifacts (id, payload, last_updated, expires_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    payload = excluded.payload,
                    last_updated = excluded.last_updated,
                    expires_at = excluded.expires_at
                "#,
            )?;
            for info in infos {
                let payload = serde_json::to_string(info)?;
                stmt.execute(params![
                    info.id,
                    payload,
                    info.last_updated.timestamp_millis(),
                    info.expires_at().timestamp_millis(),
                ])?;
            }
        }

        tx.commit()?;
        debug!("Saved {} outdated artifact records", infos.len());
        Ok(())
    }

    fn find_all(&self, now: DateTime<Utc>) -> Result<Vec<OutdatedArtifactInfo>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare("SELECT payload FROM outdated_artifacts WHERE expires_at > ?1 ORDER BY id")?;

        let payloads = stmt
            .query_map([now.timestamp_millis()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(StoreError::from))
            .collect()
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self.lock_conn()?;
        let removed = conn.execute(
            "DELETE FROM outdated_artifacts WHERE expires_at <= ?1",
            [now.timestamp_millis()],
        )?;
        Ok(removed)
    }

    fn save_artifact(&self, artifact: &AppArtifact) -> Result<(), StoreError> {
        let payload = serde_json::to_string(artifact)?;
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO app_artifacts (identity, payload, discovered_at, artifact_type)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(identity) DO UPDATE SET
                payload = excluded.payload,
                discovered_at = excluded.discovered_at,
                artifact_type = excluded.artifact_type
            "#,
            params![
                artifact.identity,
                payload,
                artifact.discovered_at.timestamp_millis(),
                artifact.artifact_type.as_str(),
            ],
        )?;
        Ok(())
    }

    fn find_artifacts(&self) -> Result<Vec<AppArtifact>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT payload FROM app_artifacts ORDER BY identity")?;

        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(StoreError::from))
            .collect()
    }
}
