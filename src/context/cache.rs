//! Per-plugin result cache
//!
//! One JSON file maps a key to `{data, hash, timestamp}`. Entries older than
//! an hour read as absent but stay on disk until overwritten.

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration as StdDuration, Instant};

/// Freshness window in seconds. An entry exactly this old is still valid.
pub const FRESHNESS_SECS: i64 = 3600;

const LOCK_TIMEOUT_SECS: u64 = 5;
const LOCK_RETRY_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    /// Fingerprint of the inputs the data was computed from
    #[serde(default)]
    pub hash: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) <= Duration::seconds(FRESHNESS_SECS)
    }
}

#[derive(Debug)]
pub struct ContextCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

/// Guard holding the advisory lock; unlocks on drop
struct CacheLock {
    file: fs::File,
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl ContextCache {
    /// Load the table once. A missing or unreadable file gives an empty cache;
    /// individual malformed entries are skipped.
    pub fn load(path: &Path) -> Self {
        let mut entries = BTreeMap::new();
        if let Ok(content) = fs::read_to_string(path) {
            match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
                Ok(raw) => {
                    for (key, value) in raw {
                        match serde_json::from_value::<CacheEntry>(value) {
                            Ok(entry) => {
                                entries.insert(key, entry);
                            }
                            Err(err) => tracing::debug!("dropping cache entry {}: {}", key, err),
                        }
                    }
                }
                Err(err) => tracing::warn!("ignoring unreadable cache {}: {}", path.display(), err),
            }
        }
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| &entry.data)
    }

    /// Like [`get`](Self::get), but only when the stored fingerprint matches.
    pub fn get_with_fingerprint(&self, key: &str, fingerprint: &str) -> Option<&Value> {
        self.get_with_fingerprint_at(key, fingerprint, Utc::now())
    }

    pub fn get_with_fingerprint_at(
        &self,
        key: &str,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .filter(|entry| entry.hash.as_deref() == Some(fingerprint))
            .map(|entry| &entry.data)
    }

    pub fn hash(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|entry| entry.hash.as_deref())
    }

    /// Store `data` under `key` and persist the whole table.
    pub fn set(&mut self, key: &str, data: Value, hash: Option<String>) -> anyhow::Result<()> {
        self.set_at(key, data, hash, Utc::now())
    }

    pub fn set_at(
        &mut self,
        key: &str,
        data: Value,
        hash: Option<String>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                hash,
                timestamp: now,
            },
        );
        self.save()
    }

    fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let _lock = self.lock()?;
        let content = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(&self.path, &content)
            .with_context(|| format!("Failed to write cache {}", self.path.display()))
    }

    fn lock(&self) -> anyhow::Result<CacheLock> {
        let lock_path = self.path.with_extension("lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let start = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => break,
                Err(err) => {
                    if err.kind() != ErrorKind::WouldBlock {
                        return Err(err.into());
                    }
                    if start.elapsed() >= StdDuration::from_secs(LOCK_TIMEOUT_SECS) {
                        return Err(anyhow::anyhow!(
                            "Timed out waiting for cache lock ({}s)",
                            LOCK_TIMEOUT_SECS
                        ));
                    }
                    std::thread::sleep(StdDuration::from_millis(LOCK_RETRY_MS));
                }
            }
        }

        Ok(CacheLock { file })
    }
}

/// Write via a sibling temp file and rename over the target.
pub(crate) fn write_atomic(path: &Path, content: &str) -> anyhow::Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content)?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_expires_after_an_hour() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ContextCache::load(&dir.path().join("context_cache.json"));
        let t = Utc::now();
        cache.set_at("plugin:commands", json!({"a": 1}), None, t).unwrap();

        assert_eq!(
            cache.get_at("plugin:commands", t + Duration::seconds(3599)),
            Some(&json!({"a": 1}))
        );
        assert!(cache.get_at("plugin:commands", t + Duration::seconds(3600)).is_some());
        assert!(cache.get_at("plugin:commands", t + Duration::seconds(3601)).is_none());
    }

    #[test]
    fn fingerprint_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ContextCache::load(&dir.path().join("c.json"));
        let t = Utc::now();
        cache
            .set_at("k", json!(1), Some("abc".to_string()), t)
            .unwrap();
        assert!(cache.get_with_fingerprint_at("k", "abc", t).is_some());
        assert!(cache.get_with_fingerprint_at("k", "def", t).is_none());
        assert_eq!(cache.hash("k"), Some("abc"));
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks").join("context_cache.json");
        let mut cache = ContextCache::load(&path);
        cache.set("k", json!(["x"]), Some("h".to_string())).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["k"]["data"], json!(["x"]));
        assert_eq!(raw["k"]["hash"], json!("h"));
        assert!(raw["k"]["timestamp"].is_string());

        let reloaded = ContextCache::load(&path);
        assert_eq!(reloaded.get("k"), Some(&json!(["x"])));
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(
            &path,
            r#"{"bad": {"data": 1, "timestamp": "yesterday"}, "good": {"data": 2, "hash": null, "timestamp": "2030-01-01T00:00:00Z"}}"#,
        )
        .unwrap();
        let cache = ContextCache::load(&path);
        assert!(cache.entries.contains_key("good"));
        assert!(!cache.entries.contains_key("bad"));
    }

    #[test]
    fn unreadable_file_is_an_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, "not json").unwrap();
        assert!(ContextCache::load(&path).get("anything").is_none());
    }
}
