//! Content-addressed on-disk artifact cache with LRU eviction.
//!
//! Files are written to a `.part` temp name and renamed into place, so a
//! partially-written artifact is never visible to `get`. The metadata index
//! sits behind a read-mostly `RwLock`; no file I/O happens under it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::request::Fingerprint;

/// Immutable metadata for one stored artifact.
#[derive(Debug)]
pub struct ArtifactInfo {
    fingerprint: Fingerprint,
    file_id: String,
    path: PathBuf,
    size_bytes: u64,
    created_at: SystemTime,
}

/// Cloneable handle to a stored artifact.
///
/// Holding a handle pins the artifact: eviction skips any entry whose info
/// is referenced outside the store, so an in-flight download can never lose
/// its file.
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    info: Arc<ArtifactInfo>,
}

impl ArtifactHandle {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.info.fingerprint
    }

    /// Opaque identifier used in download URLs. Deliberately unrelated to
    /// the fingerprint so no request content leaks into paths.
    pub fn artifact_id(&self) -> &str {
        &self.info.file_id
    }

    pub fn path(&self) -> &Path {
        &self.info.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.info.size_bytes
    }

    pub fn created_at(&self) -> SystemTime {
        self.info.created_at
    }
}

struct Entry {
    info: Arc<ArtifactInfo>,
    created: Instant,
    /// Milliseconds since store epoch, bumped on every `get` hit.
    last_access: AtomicU64,
}

#[derive(Default)]
struct Index {
    by_fingerprint: HashMap<Fingerprint, Entry>,
    by_id: HashMap<String, Fingerprint>,
}

/// On-disk artifact cache.
pub struct ArtifactStore {
    root: PathBuf,
    capacity_bytes: u64,
    ttl: Option<Duration>,
    epoch: Instant,
    index: RwLock<Index>,
}

impl ArtifactStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>, capacity_bytes: u64, ttl: Option<Duration>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| Error::StorageFailure(format!("create {}: {}", root.display(), e)))?;

        Ok(Self {
            root,
            capacity_bytes,
            ttl,
            epoch: Instant::now(),
            index: RwLock::new(Index::default()),
        })
    }

    fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        match self.ttl {
            Some(ttl) => entry.created.elapsed() > ttl,
            None => false,
        }
    }

    /// Look up an artifact by fingerprint, bumping its LRU position.
    ///
    /// Expired artifacts are treated as absent and removed.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<ArtifactHandle> {
        {
            let index = self.index.read().expect("artifact index poisoned");
            let entry = index.by_fingerprint.get(fingerprint)?;
            if !self.is_expired(entry) {
                entry.last_access.store(self.now_millis(), Ordering::Relaxed);
                return Some(ArtifactHandle {
                    info: entry.info.clone(),
                });
            }
        }

        // Expired: remove under the write lock, delete the file after. An
        // entry whose info is still referenced outside the store keeps its
        // file; removal is retried on a later lookup once the handles drop.
        let removed = {
            let mut index = self.index.write().expect("artifact index poisoned");
            match index.by_fingerprint.get(fingerprint) {
                Some(entry) if self.is_expired(entry) && Arc::strong_count(&entry.info) == 1 => {
                    let entry = index
                        .by_fingerprint
                        .remove(fingerprint)
                        .expect("entry vanished under write lock");
                    index.by_id.remove(&entry.info.file_id);
                    Some(entry.info)
                }
                _ => None,
            }
        };

        if let Some(info) = removed {
            debug!("artifact {} expired, removing", info.file_id);
            if let Err(e) = std::fs::remove_file(&info.path) {
                warn!("failed to remove expired artifact {}: {}", info.file_id, e);
            }
        }
        None
    }

    /// Look up an artifact by its opaque file id (download path).
    pub fn get_by_id(&self, artifact_id: &str) -> Option<ArtifactHandle> {
        let fingerprint = {
            let index = self.index.read().expect("artifact index poisoned");
            *index.by_id.get(artifact_id)?
        };
        self.get(&fingerprint)
    }

    /// Store synthesized audio durably and index it.
    ///
    /// The scheduler's single-flight invariant guarantees at most one `put`
    /// per fingerprint is ever in flight, so same-key races cannot occur.
    pub async fn put(&self, fingerprint: Fingerprint, bytes: &[u8]) -> Result<ArtifactHandle> {
        let file_id = Uuid::new_v4().simple().to_string();
        let final_path = self.root.join(format!("{}.wav", file_id));
        let temp_path = self.root.join(format!("{}.part", file_id));

        if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::StorageFailure(format!(
                "write {}: {}",
                temp_path.display(),
                e
            )));
        }
        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::StorageFailure(format!(
                "rename {}: {}",
                final_path.display(),
                e
            )));
        }

        let info = Arc::new(ArtifactInfo {
            fingerprint,
            file_id: file_id.clone(),
            path: final_path,
            size_bytes: bytes.len() as u64,
            created_at: SystemTime::now(),
        });
        let handle = ArtifactHandle { info: info.clone() };

        let evicted = {
            let mut index = self.index.write().expect("artifact index poisoned");
            index.by_id.insert(file_id, fingerprint);
            index.by_fingerprint.insert(
                fingerprint,
                Entry {
                    info,
                    created: Instant::now(),
                    last_access: AtomicU64::new(self.now_millis()),
                },
            );
            self.collect_evictable(&mut index)
        };

        for info in evicted {
            debug!("evicting artifact {} ({} bytes)", info.file_id, info.size_bytes);
            if let Err(e) = tokio::fs::remove_file(&info.path).await {
                warn!("failed to remove evicted artifact {}: {}", info.file_id, e);
            }
        }

        Ok(handle)
    }

    /// Pick and unlink index entries until total size fits the capacity.
    ///
    /// Least-recently-accessed first; entries whose info is referenced
    /// outside the store are never chosen. Returns the file metadata to
    /// delete once the lock is released.
    fn collect_evictable(&self, index: &mut Index) -> Vec<Arc<ArtifactInfo>> {
        let mut total: u64 = index
            .by_fingerprint
            .values()
            .map(|e| e.info.size_bytes)
            .sum();
        if total <= self.capacity_bytes {
            return Vec::new();
        }

        let mut candidates: Vec<(Fingerprint, u64)> = index
            .by_fingerprint
            .iter()
            .filter(|(_, e)| Arc::strong_count(&e.info) == 1)
            .map(|(fp, e)| (*fp, e.last_access.load(Ordering::Relaxed)))
            .collect();
        candidates.sort_by_key(|(_, last_access)| *last_access);

        let mut evicted = Vec::new();
        for (fp, _) in candidates {
            if total <= self.capacity_bytes {
                break;
            }
            if let Some(entry) = index.by_fingerprint.remove(&fp) {
                index.by_id.remove(&entry.info.file_id);
                total -= entry.info.size_bytes;
                evicted.push(entry.info);
            }
        }
        evicted
    }

    /// Read an artifact's full contents.
    pub async fn read(&self, handle: &ArtifactHandle) -> Result<Vec<u8>> {
        tokio::fs::read(handle.path())
            .await
            .map_err(|e| Error::StorageFailure(format!("read {}: {}", handle.path().display(), e)))
    }

    /// Number of indexed artifacts.
    pub fn len(&self) -> usize {
        self.index
            .read()
            .expect("artifact index poisoned")
            .by_fingerprint
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes currently indexed.
    pub fn total_bytes(&self) -> u64 {
        self.index
            .read()
            .expect("artifact index poisoned")
            .by_fingerprint
            .values()
            .map(|e| e.info.size_bytes)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SynthesisRequest;

    fn fp(text: &str) -> Fingerprint {
        SynthesisRequest::new(text, "en-us").fingerprint()
    }

    fn open_store(dir: &tempfile::TempDir, capacity: u64, ttl: Option<Duration>) -> ArtifactStore {
        ArtifactStore::open(dir.path(), capacity, ttl).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_round_trips_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, 1024 * 1024, None);

        let bytes = b"fake wav bytes".to_vec();
        let put_handle = store.put(fp("hello"), &bytes).await.unwrap();
        assert_eq!(put_handle.size_bytes(), bytes.len() as u64);

        let get_handle = store.get(&fp("hello")).unwrap();
        assert_eq!(get_handle.artifact_id(), put_handle.artifact_id());
        assert_eq!(store.read(&get_handle).await.unwrap(), bytes);
    }

    #[tokio::test]
    async fn missing_fingerprint_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, 1024, None);
        assert!(store.get(&fp("nothing")).is_none());
        assert!(store.get_by_id("no-such-id").is_none());
    }

    #[tokio::test]
    async fn lookup_by_opaque_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, 1024 * 1024, None);

        let handle = store.put(fp("hello"), b"audio").await.unwrap();
        let found = store.get_by_id(handle.artifact_id()).unwrap();
        assert_eq!(found.fingerprint(), handle.fingerprint());
        // The public id is not the fingerprint.
        assert_ne!(handle.artifact_id(), handle.fingerprint().to_hex());
    }

    #[tokio::test]
    async fn eviction_removes_least_recently_accessed_first() {
        let dir = tempfile::tempdir().unwrap();
        // Room for two 100-byte artifacts.
        let store = open_store(&dir, 200, None);
        let payload = vec![0u8; 100];

        let a = store.put(fp("a"), &payload).await.unwrap();
        let b = store.put(fp("b"), &payload).await.unwrap();
        drop(a);
        drop(b);

        // Touch "a" so "b" becomes the LRU entry.
        store.get(&fp("a")).unwrap();

        let c = store.put(fp("c"), &payload).await.unwrap();
        drop(c);

        assert!(store.get(&fp("a")).is_some());
        assert!(store.get(&fp("b")).is_none());
        assert!(store.get(&fp("c")).is_some());
        assert!(store.total_bytes() <= 200);
    }

    #[tokio::test]
    async fn referenced_artifacts_are_never_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, 100, None);

        // The held handle pins "pinned" even while the store is over capacity.
        let pinned = store.put(fp("pinned"), &vec![1u8; 100]).await.unwrap();
        let other = store.put(fp("other"), &vec![2u8; 100]).await.unwrap();
        drop(other);

        // This put pushes the store over capacity and triggers eviction.
        let third = store.put(fp("third"), &vec![3u8; 10]).await.unwrap();
        drop(third);

        assert!(store.get(&fp("pinned")).is_some());
        assert!(store.get(&fp("other")).is_none());
        assert!(tokio::fs::read(pinned.path()).await.is_ok());
    }

    #[tokio::test]
    async fn expired_artifacts_are_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, 1024, Some(Duration::from_millis(30)));

        let handle = store.put(fp("short-lived"), b"audio").await.unwrap();
        let path = handle.path().to_path_buf();
        drop(handle);
        assert!(store.get(&fp("short-lived")).is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.get(&fp("short-lived")).is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn expiry_defers_deletion_while_a_handle_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, 1024, Some(Duration::from_millis(30)));

        let handle = store.put(fp("held"), b"audio").await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Expired entries are absent to lookups, but the held handle keeps
        // the backing file readable.
        assert!(store.get(&fp("held")).is_none());
        assert_eq!(store.read(&handle).await.unwrap(), b"audio");

        let path = handle.path().to_path_buf();
        drop(handle);

        // With the last handle gone, the next lookup deletes the file.
        assert!(store.get(&fp("held")).is_none());
        assert!(!path.exists());
    }
}
