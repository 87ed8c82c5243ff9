//! BundleStore — content-addressed blob storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::{BundleError, BundleResult};

/// Receipt returned by [`BundleStore::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReceipt {
    /// Full key: `{service_id}/{version}/{sha256}`.
    pub key: String,
    pub size: u64,
    pub sha256: String,
}

enum Backend {
    Fs(PathBuf),
    Memory(Mutex<BTreeMap<String, Vec<u8>>>),
}

/// Thread-safe content-addressed bundle store.
#[derive(Clone)]
pub struct BundleStore {
    backend: Arc<Backend>,
}

impl BundleStore {
    /// Open (or create) a filesystem-backed store rooted at `root`.
    pub fn open(root: &Path) -> BundleResult<Self> {
        std::fs::create_dir_all(root).map_err(|e| BundleError::Io(e.to_string()))?;
        debug!(?root, "bundle store opened");
        Ok(Self {
            backend: Arc::new(Backend::Fs(root.to_path_buf())),
        })
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> Self {
        Self {
            backend: Arc::new(Backend::Memory(Mutex::new(BTreeMap::new()))),
        }
    }

    /// Store a snapshot. Idempotent: the same content under the same
    /// service/version always lands at the same key.
    pub fn put(
        &self,
        service_id: &str,
        version: &str,
        content: &[u8],
    ) -> BundleResult<BundleReceipt> {
        check_segment(service_id)?;
        check_segment(version)?;
        let hash = hex::encode(Sha256::digest(content));
        let key = format!("{service_id}/{version}/{hash}");

        match &*self.backend {
            Backend::Fs(root) => {
                let path = root.join(&key);
                if !path.exists() {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)
                            .map_err(|e| BundleError::Io(e.to_string()))?;
                    }
                    std::fs::write(&path, content).map_err(|e| BundleError::Io(e.to_string()))?;
                    debug!(%key, size = content.len(), "bundle stored");
                }
            }
            Backend::Memory(map) => {
                map.lock()
                    .expect("bundle store lock poisoned")
                    .entry(key.clone())
                    .or_insert_with(|| content.to_vec());
            }
        }

        Ok(BundleReceipt {
            key,
            size: content.len() as u64,
            sha256: hash,
        })
    }

    /// Fetch a bundle by key.
    pub fn get(&self, key: &str) -> BundleResult<Vec<u8>> {
        check_key(key)?;
        match &*self.backend {
            Backend::Fs(root) => {
                let path = root.join(key);
                if !path.is_file() {
                    return Err(BundleError::NotFound(key.to_string()));
                }
                std::fs::read(&path).map_err(|e| BundleError::Io(e.to_string()))
            }
            Backend::Memory(map) => map
                .lock()
                .expect("bundle store lock poisoned")
                .get(key)
                .cloned()
                .ok_or_else(|| BundleError::NotFound(key.to_string())),
        }
    }

    /// Delete a bundle. Best-effort: returns whether the key existed.
    pub fn delete(&self, key: &str) -> BundleResult<bool> {
        check_key(key)?;
        match &*self.backend {
            Backend::Fs(root) => {
                let path = root.join(key);
                if !path.is_file() {
                    return Ok(false);
                }
                std::fs::remove_file(&path).map_err(|e| BundleError::Io(e.to_string()))?;
                debug!(%key, "bundle deleted");
                Ok(true)
            }
            Backend::Memory(map) => Ok(map
                .lock()
                .expect("bundle store lock poisoned")
                .remove(key)
                .is_some()),
        }
    }

    /// List keys under a prefix, sorted. Used for auditing.
    pub fn list(&self, prefix: &str) -> BundleResult<Vec<String>> {
        match &*self.backend {
            Backend::Fs(root) => {
                let mut keys = Vec::new();
                for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let Ok(rel) = entry.path().strip_prefix(root) else {
                        continue;
                    };
                    let key = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
                keys.sort();
                Ok(keys)
            }
            Backend::Memory(map) => Ok(map
                .lock()
                .expect("bundle store lock poisoned")
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect()),
        }
    }
}

/// Keys are built from caller-supplied ids; reject anything that could
/// escape the store root.
fn check_segment(segment: &str) -> BundleResult<()> {
    if segment.is_empty()
        || segment.contains('/')
        || segment.contains('\\')
        || segment == "."
        || segment == ".."
    {
        return Err(BundleError::InvalidKey(segment.to_string()));
    }
    Ok(())
}

fn check_key(key: &str) -> BundleResult<()> {
    let parts: Vec<&str> = key.split('/').collect();
    if parts.len() != 3 {
        return Err(BundleError::InvalidKey(key.to_string()));
    }
    for part in parts {
        check_segment(part)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> Vec<BundleStore> {
        let dir = tempfile::tempdir().unwrap();
        // Leak the tempdir so the fs store stays alive for the test body.
        let path = dir.keep();
        vec![BundleStore::open(&path).unwrap(), BundleStore::open_in_memory()]
    }

    #[test]
    fn put_and_get_roundtrip() {
        for store in stores() {
            let receipt = store.put("svc1", "1.0.0", b"export default {};").unwrap();
            assert!(receipt.key.starts_with("svc1/1.0.0/"));
            assert_eq!(receipt.size, 18);

            let content = store.get(&receipt.key).unwrap();
            assert_eq!(content, b"export default {};");
        }
    }

    #[test]
    fn put_is_idempotent_by_content_hash() {
        for store in stores() {
            let first = store.put("svc1", "1.0.0", b"same").unwrap();
            let second = store.put("svc1", "1.0.0", b"same").unwrap();
            assert_eq!(first, second);
            assert_eq!(store.list("svc1/1.0.0/").unwrap().len(), 1);
        }
    }

    #[test]
    fn different_content_gets_a_different_key() {
        for store in stores() {
            let a = store.put("svc1", "1.0.0", b"aaa").unwrap();
            let b = store.put("svc1", "1.0.0", b"bbb").unwrap();
            assert_ne!(a.key, b.key);
            assert_eq!(store.list("svc1/").unwrap().len(), 2);
        }
    }

    #[test]
    fn get_missing_is_not_found() {
        for store in stores() {
            let hash = hex::encode(Sha256::digest(b"nope"));
            let err = store.get(&format!("svc1/9.9.9/{hash}")).unwrap_err();
            assert!(matches!(err, BundleError::NotFound(_)));
        }
    }

    #[test]
    fn delete_is_best_effort() {
        for store in stores() {
            let receipt = store.put("svc1", "1.0.0", b"bytes").unwrap();
            assert!(store.delete(&receipt.key).unwrap());
            assert!(!store.delete(&receipt.key).unwrap());
            assert!(matches!(
                store.get(&receipt.key),
                Err(BundleError::NotFound(_))
            ));
        }
    }

    #[test]
    fn list_filters_by_prefix() {
        for store in stores() {
            store.put("svc1", "1.0.0", b"a").unwrap();
            store.put("svc1", "1.0.1", b"b").unwrap();
            store.put("svc2", "1.0.0", b"c").unwrap();

            assert_eq!(store.list("svc1/").unwrap().len(), 2);
            assert_eq!(store.list("svc2/").unwrap().len(), 1);
            assert_eq!(store.list("").unwrap().len(), 3);
        }
    }

    #[test]
    fn hostile_segments_are_rejected() {
        for store in stores() {
            assert!(matches!(
                store.put("../escape", "1.0.0", b"x"),
                Err(BundleError::InvalidKey(_))
            ));
            assert!(matches!(
                store.get("a/../b"),
                Err(BundleError::InvalidKey(_))
            ));
            assert!(matches!(store.get("short"), Err(BundleError::InvalidKey(_))));
        }
    }
}
