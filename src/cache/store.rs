use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CachedResponse;

/// Durable storage of named, versioned buckets of cached responses, keyed by
/// request URL. Per-entry reads and writes are atomic; there are no
/// multi-entry transactions.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<String>, String>;
    async fn create_bucket(&self, name: &str) -> Result<(), String>;
    /// Returns whether the bucket existed.
    async fn delete_bucket(&self, name: &str) -> Result<bool, String>;
    async fn get(&self, bucket: &str, url: &str) -> Result<Option<CachedResponse>, String>;
    async fn put(&self, bucket: &str, url: &str, response: &CachedResponse) -> Result<(), String>;
}

#[derive(Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    status: u16,
    content_type: Option<String>,
}

/// Filesystem backend: one directory per bucket, one meta/body file pair per
/// entry. Entry file names are derived deterministically from the URL.
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_stem(url: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()).to_string()
    }

    fn meta_path(&self, bucket: &str, url: &str) -> PathBuf {
        self.root.join(bucket).join(format!("{}.json", Self::entry_stem(url)))
    }

    fn body_path(&self, bucket: &str, url: &str) -> PathBuf {
        self.root.join(bucket).join(format!("{}.body", Self::entry_stem(url)))
    }
}

#[async_trait]
impl CacheBackend for FsCache {
    async fn list_buckets(&self) -> Result<Vec<String>, String> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| format!("failed to list cache buckets: {}", e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| format!("failed to list cache buckets: {}", e))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn create_bucket(&self, name: &str) -> Result<(), String> {
        std::fs::create_dir_all(self.root.join(name))
            .map_err(|e| format!("failed to create cache bucket {}: {}", name, e))
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool, String> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&path)
            .map(|_| true)
            .map_err(|e| format!("failed to delete cache bucket {}: {}", name, e))
    }

    async fn get(&self, bucket: &str, url: &str) -> Result<Option<CachedResponse>, String> {
        let meta_path = self.meta_path(bucket, url);
        if !meta_path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&meta_path)
            .map_err(|e| format!("failed to read cache entry: {}", e))?;
        let meta: EntryMeta = match serde_json::from_str(&raw) {
            Ok(meta) => meta,
            Err(e) => {
                // A corrupt entry is a miss, not a failure
                log::warn!("corrupt cache entry {}: {}", meta_path.display(), e);
                return Ok(None);
            }
        };
        let body = std::fs::read(self.body_path(bucket, url))
            .map_err(|e| format!("failed to read cache body: {}", e))?;
        Ok(Some(CachedResponse {
            url: meta.url,
            status: meta.status,
            content_type: meta.content_type,
            body,
        }))
    }

    async fn put(&self, bucket: &str, url: &str, response: &CachedResponse) -> Result<(), String> {
        std::fs::create_dir_all(self.root.join(bucket))
            .map_err(|e| format!("failed to create cache bucket {}: {}", bucket, e))?;
        let meta = EntryMeta {
            url: response.url.clone(),
            status: response.status,
            content_type: response.content_type.clone(),
        };
        let json = serde_json::to_string(&meta)
            .map_err(|e| format!("failed to encode cache entry: {}", e))?;
        // Body first; the meta file is what makes the entry visible
        std::fs::write(self.body_path(bucket, url), &response.body)
            .map_err(|e| format!("failed to write cache body: {}", e))?;
        std::fs::write(self.meta_path(bucket, url), json)
            .map_err(|e| format!("failed to write cache entry: {}", e))
    }
}

/// In-memory backend for tests and dry runs.
#[derive(Default)]
pub struct MemoryCache {
    buckets: Mutex<HashMap<String, HashMap<String, CachedResponse>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn list_buckets(&self) -> Result<Vec<String>, String> {
        let buckets = self.buckets.lock().unwrap();
        let mut names: Vec<String> = buckets.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_bucket(&self, name: &str) -> Result<(), String> {
        self.buckets
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool, String> {
        Ok(self.buckets.lock().unwrap().remove(name).is_some())
    }

    async fn get(&self, bucket: &str, url: &str) -> Result<Option<CachedResponse>, String> {
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|b| b.get(url))
            .cloned())
    }

    async fn put(&self, bucket: &str, url: &str, response: &CachedResponse) -> Result<(), String> {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(url.to_string(), response.clone());
        Ok(())
    }
}
