//! Evidence Vault - Record Store
//!
//! Persistence for artifact metadata. The core depends only on the
//! `RecordStore` trait shapes (`enumerate`, `delete_all`); the SQLite
//! implementation here is the reference collaborator. Blob bytes never
//! touch the store - rows carry the path of the encrypted artifact plus
//! non-sensitive metadata only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// What an artifact row represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Captured evidence (photo, video, audio)
    Evidence,
    /// Original photo of a verified identity document
    DocumentPhoto,
    /// Generated PDF of a verified identity document
    DocumentPdf,
}

impl ArtifactKind {
    fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Evidence => "evidence",
            ArtifactKind::DocumentPhoto => "document_photo",
            ArtifactKind::DocumentPdf => "document_pdf",
        }
    }

    fn parse(s: &str) -> VaultResult<Self> {
        match s {
            "evidence" => Ok(ArtifactKind::Evidence),
            "document_photo" => Ok(ArtifactKind::DocumentPhoto),
            "document_pdf" => Ok(ArtifactKind::DocumentPdf),
            other => Err(VaultError::Store(format!("unknown artifact kind: {other}"))),
        }
    }
}

/// Reference to one protected artifact on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHandle {
    /// Unique artifact id
    pub id: String,
    /// Owning user
    pub owner_id: String,
    /// Location of the encrypted blob
    pub path: PathBuf,
    /// Row kind
    pub kind: ArtifactKind,
    /// MIME type of the protected plaintext
    pub mime_type: String,
    /// Encrypted size in bytes
    pub size: u64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// External persistence collaborator.
///
/// `enumerate` and `delete_all` are the only operations the wipe path
/// depends on; `delete_all` is a cascading purge of every row owned by the
/// user.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every artifact handle owned by `owner_id`
    async fn enumerate(&self, owner_id: &str) -> VaultResult<Vec<ArtifactHandle>>;

    /// Delete all rows owned by `owner_id`
    async fn delete_all(&self, owner_id: &str) -> VaultResult<()>;

    /// Persist a new artifact row
    async fn insert(&self, handle: &ArtifactHandle) -> VaultResult<()>;

    /// Number of rows owned by `owner_id`
    async fn count(&self, owner_id: &str) -> VaultResult<u64>;
}

/// SQLite-backed record store
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (or create) the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> VaultResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    /// In-memory store for tests and ephemeral use
    pub fn in_memory() -> VaultResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> VaultResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                path TEXT NOT NULL,
                kind TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                size INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_artifacts_owner ON artifacts(owner_id);
            "#,
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a store operation off the interactive thread
    async fn blocking<T, F>(&self, f: F) -> VaultResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> VaultResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await
        .map_err(|e| VaultError::Store(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn enumerate(&self, owner_id: &str) -> VaultResult<Vec<ArtifactHandle>> {
        let owner = owner_id.to_string();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, path, kind, mime_type, size, created_at
                 FROM artifacts WHERE owner_id = ?1 ORDER BY created_at",
            )?;

            let rows = stmt.query_map(params![owner], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?;

            let mut handles = Vec::new();
            for row in rows {
                let (id, owner_id, path, kind, mime_type, size, created_at) = row?;
                handles.push(ArtifactHandle {
                    id,
                    owner_id,
                    path: PathBuf::from(path),
                    kind: ArtifactKind::parse(&kind)?,
                    mime_type,
                    size: size as u64,
                    created_at: created_at
                        .parse()
                        .map_err(|e| VaultError::Store(format!("bad timestamp: {e}")))?,
                });
            }
            Ok(handles)
        })
        .await
    }

    async fn delete_all(&self, owner_id: &str) -> VaultResult<()> {
        let owner = owner_id.to_string();
        self.blocking(move |conn| {
            let removed = conn.execute("DELETE FROM artifacts WHERE owner_id = ?1", params![owner])?;
            log::info!("record store purged {removed} rows for owner");
            Ok(())
        })
        .await
    }

    async fn insert(&self, handle: &ArtifactHandle) -> VaultResult<()> {
        let h = handle.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO artifacts
                 (id, owner_id, path, kind, mime_type, size, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    h.id,
                    h.owner_id,
                    h.path.display().to_string(),
                    h.kind.as_str(),
                    h.mime_type,
                    h.size as i64,
                    h.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn count(&self, owner_id: &str) -> VaultResult<u64> {
        let owner = owner_id.to_string();
        self.blocking(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM artifacts WHERE owner_id = ?1",
                params![owner],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: &str, owner: &str, kind: ArtifactKind) -> ArtifactHandle {
        ArtifactHandle {
            id: id.into(),
            owner_id: owner.into(),
            path: PathBuf::from(format!("/tmp/{id}.enc")),
            kind,
            mime_type: "image/jpeg".into(),
            size: 1234,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_enumerate() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.insert(&handle("a", "u1", ArtifactKind::Evidence)).await.unwrap();
        store.insert(&handle("b", "u1", ArtifactKind::DocumentPhoto)).await.unwrap();
        store.insert(&handle("c", "u2", ArtifactKind::Evidence)).await.unwrap();

        let u1 = store.enumerate("u1").await.unwrap();
        assert_eq!(u1.len(), 2);
        assert!(u1.iter().all(|h| h.owner_id == "u1"));

        assert_eq!(store.count("u2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_is_per_owner() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.insert(&handle("a", "u1", ArtifactKind::Evidence)).await.unwrap();
        store.insert(&handle("b", "u2", ArtifactKind::Evidence)).await.unwrap();

        store.delete_all("u1").await.unwrap();

        assert!(store.enumerate("u1").await.unwrap().is_empty());
        assert_eq!(store.count("u2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_kind_roundtrips() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.insert(&handle("p", "u1", ArtifactKind::DocumentPdf)).await.unwrap();

        let rows = store.enumerate("u1").await.unwrap();
        assert_eq!(rows[0].kind, ArtifactKind::DocumentPdf);
    }
}
