//! Evidence Vault - Panic Wipe Orchestrator
//!
//! Destroys every artifact and record a user owns. Target completion is
//! under 2000 ms for typical volumes (tens of files); completeness is
//! prioritized over the budget, which is a soft warning.
//!
//! Per-item failures are isolated and counted - a locked or missing file
//! must never block erasure of the rest. The call fails outright only when
//! the record store is unreachable before any deletion starts. Once
//! started, the wipe runs to completion across all known artifacts; it is
//! deliberately not abortable by competing user actions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::erase::SecureEraser;
use crate::error::VaultResult;
use crate::store::RecordStore;

/// Soft latency target for a full wipe
pub const WIPE_BUDGET: Duration = Duration::from_millis(2000);

/// One artifact that could not be erased
#[derive(Debug, Clone)]
pub struct WipeFailure {
    /// Artifact id from the record store
    pub artifact_id: String,
    /// Blob location that survived
    pub path: PathBuf,
    /// What went wrong
    pub reason: String,
}

/// Outcome of a panic wipe
#[derive(Debug)]
pub struct WipeResult {
    /// Artifacts the store enumerated
    pub artifacts_attempted: usize,
    /// Artifacts whose blobs were erased
    pub artifacts_wiped: usize,
    /// Non-fatal per-artifact failures
    pub failures: Vec<WipeFailure>,
    /// Wall-clock duration of the whole wipe
    pub elapsed: Duration,
}

impl WipeResult {
    /// True when every enumerated artifact was erased
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Panic-wipe orchestrator
pub struct WipeOrchestrator {
    store: Arc<dyn RecordStore>,
    /// Ephemeral directory used by capture and verification flows
    temp_dir: PathBuf,
}

impl WipeOrchestrator {
    pub fn new(store: Arc<dyn RecordStore>, temp_dir: PathBuf) -> Self {
        Self { store, temp_dir }
    }

    /// Erase every artifact and record owned by `owner_id`.
    ///
    /// The caller gets "did its best and finished": individual item errors
    /// are swallowed into the result, store-level failures escalate.
    pub async fn execute(&self, owner_id: &str) -> VaultResult<WipeResult> {
        let start = Instant::now();
        log::warn!("PANIC WIPE initiated");

        // The only read dependency; unreachable store aborts before
        // anything is deleted
        let handles = self.store.enumerate(owner_id).await?;
        let artifacts_attempted = handles.len();
        log::debug!("wiping {artifacts_attempted} artifacts");

        let mut failures = Vec::new();
        for handle in &handles {
            if let Err(e) = SecureEraser::wipe(&handle.path).await {
                // Keep going - the rest must still be erased
                failures.push(WipeFailure {
                    artifact_id: handle.id.clone(),
                    path: handle.path.clone(),
                    reason: e.to_string(),
                });
            }
        }

        // Cascading relations are the store's responsibility
        self.store.delete_all(owner_id).await?;

        self.clear_temp_cache().await;

        let elapsed = start.elapsed();
        let artifacts_wiped = artifacts_attempted - failures.len();

        if elapsed > WIPE_BUDGET {
            log::warn!(
                "panic wipe took {}ms (target: <{}ms)",
                elapsed.as_millis(),
                WIPE_BUDGET.as_millis()
            );
        }
        log::warn!(
            "PANIC WIPE completed in {}ms: {artifacts_wiped}/{artifacts_attempted} artifacts, {} failures",
            elapsed.as_millis(),
            failures.len()
        );

        Ok(WipeResult {
            artifacts_attempted,
            artifacts_wiped,
            failures,
            elapsed,
        })
    }

    /// Best-effort clear of the ephemeral temp-cache directory
    async fn clear_temp_cache(&self) {
        let mut entries = match tokio::fs::read_dir(&self.temp_dir).await {
            Ok(entries) => entries,
            Err(_) => return, // no cache dir, nothing to clear
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);

            let result = if is_dir {
                tokio::fs::remove_dir_all(&path).await.map_err(Into::into)
            } else {
                SecureEraser::wipe(&path).await
            };

            if let Err(e) = result {
                log::warn!("temp cache entry survived wipe: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;
    use crate::store::{ArtifactHandle, ArtifactKind, SqliteRecordStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::path::Path;
    use tempfile::tempdir;

    async fn add_artifact(
        store: &SqliteRecordStore,
        dir: &Path,
        id: &str,
        owner: &str,
        kind: ArtifactKind,
    ) -> PathBuf {
        let path = dir.join(format!("{id}.enc"));
        tokio::fs::write(&path, vec![0x5Au8; 4096]).await.unwrap();

        store
            .insert(&ArtifactHandle {
                id: id.into(),
                owner_id: owner.into(),
                path: path.clone(),
                kind,
                mime_type: "image/jpeg".into(),
                size: 4096,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        path
    }

    #[tokio::test]
    async fn test_full_wipe_for_owner() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());

        // u1 owns 3 evidence files and 1 two-file document
        let mut paths = Vec::new();
        for i in 0..3 {
            paths.push(
                add_artifact(&store, dir.path(), &format!("ev{i}"), "u1", ArtifactKind::Evidence)
                    .await,
            );
        }
        paths.push(
            add_artifact(&store, dir.path(), "doc-photo", "u1", ArtifactKind::DocumentPhoto).await,
        );
        paths.push(
            add_artifact(&store, dir.path(), "doc-pdf", "u1", ArtifactKind::DocumentPdf).await,
        );

        let orchestrator = WipeOrchestrator::new(store.clone(), dir.path().join("cache"));
        let result = orchestrator.execute("u1").await.unwrap();

        assert_eq!(result.artifacts_attempted, 5);
        assert_eq!(result.artifacts_wiped, 5);
        assert!(result.is_complete());

        for path in &paths {
            assert!(!path.exists());
        }
        assert!(store.enumerate("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unwipeable_artifact_does_not_block_the_rest() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());

        let mut paths = Vec::new();
        for i in 0..5 {
            paths.push(
                add_artifact(&store, dir.path(), &format!("a{i}"), "u1", ArtifactKind::Evidence)
                    .await,
            );
        }

        // Make artifact #3 unwipeable: its path is a non-empty directory
        tokio::fs::remove_file(&paths[2]).await.unwrap();
        tokio::fs::create_dir(&paths[2]).await.unwrap();
        tokio::fs::write(paths[2].join("pin"), b"x").await.unwrap();

        let orchestrator = WipeOrchestrator::new(store.clone(), dir.path().join("cache"));
        let result = orchestrator.execute("u1").await.unwrap();

        assert_eq!(result.artifacts_attempted, 5);
        assert_eq!(result.artifacts_wiped, 4);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].artifact_id, "a2");

        // Record deletion still ran despite the failure
        assert_eq!(store.count("u1").await.unwrap(), 0);

        for (i, path) in paths.iter().enumerate() {
            if i == 2 {
                assert!(path.exists());
            } else {
                assert!(!path.exists());
            }
        }
    }

    #[tokio::test]
    async fn test_wipe_is_scoped_to_owner() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());

        add_artifact(&store, dir.path(), "mine", "u1", ArtifactKind::Evidence).await;
        let other = add_artifact(&store, dir.path(), "theirs", "u2", ArtifactKind::Evidence).await;

        let orchestrator = WipeOrchestrator::new(store.clone(), dir.path().join("cache"));
        orchestrator.execute("u1").await.unwrap();

        assert!(other.exists());
        assert_eq!(store.count("u2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_temp_cache_is_cleared() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());

        let cache = dir.path().join("cache");
        tokio::fs::create_dir_all(cache.join("sub")).await.unwrap();
        tokio::fs::write(cache.join("capture_tmp.jpg"), b"plaintext!").await.unwrap();
        tokio::fs::write(cache.join("sub/partial.bin"), b"more").await.unwrap();

        let orchestrator = WipeOrchestrator::new(store, cache.clone());
        orchestrator.execute("u1").await.unwrap();

        assert!(!cache.join("capture_tmp.jpg").exists());
        assert!(!cache.join("sub").exists());
    }

    struct UnreachableStore;

    #[async_trait]
    impl RecordStore for UnreachableStore {
        async fn enumerate(&self, _owner_id: &str) -> VaultResult<Vec<ArtifactHandle>> {
            Err(VaultError::Store("store unreachable".into()))
        }
        async fn delete_all(&self, _owner_id: &str) -> VaultResult<()> {
            Err(VaultError::Store("store unreachable".into()))
        }
        async fn insert(&self, _handle: &ArtifactHandle) -> VaultResult<()> {
            Err(VaultError::Store("store unreachable".into()))
        }
        async fn count(&self, _owner_id: &str) -> VaultResult<u64> {
            Err(VaultError::Store("store unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_is_catastrophic() {
        let dir = tempdir().unwrap();
        let orchestrator =
            WipeOrchestrator::new(Arc::new(UnreachableStore), dir.path().join("cache"));

        let err = orchestrator.execute("u1").await.unwrap_err();
        assert!(matches!(err, VaultError::Store(_)));
    }

    #[tokio::test]
    async fn test_typical_wipe_fits_the_budget() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());

        for i in 0..20 {
            add_artifact(&store, dir.path(), &format!("f{i}"), "u1", ArtifactKind::Evidence).await;
        }

        let orchestrator = WipeOrchestrator::new(store, dir.path().join("cache"));
        let result = orchestrator.execute("u1").await.unwrap();

        assert_eq!(result.artifacts_wiped, 20);
        assert!(result.elapsed < WIPE_BUDGET);
    }
}
