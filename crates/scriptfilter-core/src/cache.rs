//! On-disk response cache.
//!
//! Maps `(query, page)` to a previously emitted [`ResponseDocument`]. The store
//! is one human-readable JSON file, read lazily on first access and rewritten
//! atomically on every change. A file that cannot be parsed (for example one
//! left half-written by a killed process) is treated as an empty cache.

use crate::error::Error;
use crate::response::ResponseDocument;
use crate::version::SCHEMA_VERSION;
use scriptfilter_util::fs::{atomic_write, read_if_exists};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Cache key. Matching is exact: no case folding, no whitespace trimming.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub query: String,
    pub page: u32,
}

impl CacheKey {
    pub fn new(query: impl Into<String>, page: u32) -> Self {
        Self {
            query: query.into(),
            page,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    #[serde(flatten)]
    key: CacheKey,
    document: ResponseDocument,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    schema_version: u32,
    entries: Vec<CacheEntry>,
}

/// Persistent `(query, page)` → document store.
#[derive(Debug)]
pub struct ResponseCache {
    path: PathBuf,
    entries: Option<BTreeMap<CacheKey, ResponseDocument>>,
}

impl ResponseCache {
    /// Cache backed by `path`. Nothing is read until the first lookup.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored document for `key`, or `None` when absent or unreadable.
    pub fn load(&mut self, key: &CacheKey) -> Option<ResponseDocument> {
        let document = self.entries_mut().get(key).cloned();
        debug!(
            query = %key.query,
            page = key.page,
            hit = document.is_some(),
            "response cache lookup"
        );
        document
    }

    /// Store `document` under `key`, replacing any previous entry.
    ///
    /// The file is synced to disk before this returns.
    pub fn store(&mut self, key: CacheKey, document: ResponseDocument) -> Result<(), Error> {
        debug!(query = %key.query, page = key.page, items = document.len(), "response cache store");
        self.entries_mut().insert(key, document);
        self.persist()
    }

    /// Remove one entry. Returns whether it existed.
    pub fn remove(&mut self, key: &CacheKey) -> Result<bool, Error> {
        let removed = self.entries_mut().remove(key).is_some();
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Drop every entry and rewrite the file empty.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.entries = Some(BTreeMap::new());
        self.persist()
    }

    /// All entries, ordered by key.
    pub fn entries(&mut self) -> impl Iterator<Item = (&CacheKey, &ResponseDocument)> {
        self.entries_mut().iter()
    }

    pub fn len(&mut self) -> usize {
        self.entries_mut().len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.entries_mut().is_empty()
    }

    fn entries_mut(&mut self) -> &mut BTreeMap<CacheKey, ResponseDocument> {
        let path = &self.path;
        self.entries.get_or_insert_with(|| read_entries(path))
    }

    fn persist(&self) -> Result<(), Error> {
        let entries = self
            .entries
            .as_ref()
            .map(|map| {
                map.iter()
                    .map(|(key, document)| CacheEntry {
                        key: key.clone(),
                        document: document.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let file = CacheFile {
            schema_version: SCHEMA_VERSION,
            entries,
        };
        let mut text = serde_json::to_string_pretty(&file)?;
        text.push('\n');
        atomic_write(&self.path, text.as_bytes()).map_err(|source| Error::CacheWrite {
            path: self.path.clone(),
            source,
        })
    }
}

fn read_entries(path: &Path) -> BTreeMap<CacheKey, ResponseDocument> {
    let bytes = match read_if_exists(path) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "response cache unreadable, treating as empty");
            return BTreeMap::new();
        }
    };

    let file: CacheFile = match serde_json::from_slice(&bytes) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "response cache is corrupt, treating as empty");
            return BTreeMap::new();
        }
    };

    if file.schema_version != SCHEMA_VERSION {
        warn!(
            path = %path.display(),
            found = file.schema_version,
            expected = SCHEMA_VERSION,
            "response cache schema mismatch, treating as empty"
        );
        return BTreeMap::new();
    }

    file.entries
        .into_iter()
        .map(|entry| (entry.key, entry.document))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ResultItem;
    use std::fs;
    use tempfile::tempdir;

    fn doc(titles: &[&str]) -> ResponseDocument {
        ResponseDocument::new(
            titles
                .iter()
                .map(|t| ResultItem::new(*t).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let mut cache = ResponseCache::new(dir.path().join("results.json"));
        let key = CacheKey::new("abc", 0);

        cache.store(key.clone(), doc(&["one", "two"])).unwrap();
        assert_eq!(cache.load(&key), Some(doc(&["one", "two"])));
    }

    #[test]
    fn test_persisted_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db").join("results.json");
        let key = CacheKey::new("abc", 0);

        ResponseCache::new(path.clone())
            .store(key.clone(), doc(&["kept"]))
            .unwrap();

        let mut fresh = ResponseCache::new(path);
        assert_eq!(fresh.load(&key), Some(doc(&["kept"])));
    }

    #[test]
    fn test_miss_for_unseen_key() {
        let dir = tempdir().unwrap();
        let mut cache = ResponseCache::new(dir.path().join("results.json"));
        assert_eq!(cache.load(&CacheKey::new("never", 0)), None);

        cache.store(CacheKey::new("seen", 0), doc(&["x"])).unwrap();
        assert_eq!(cache.load(&CacheKey::new("never", 0)), None);
    }

    #[test]
    fn test_keys_are_exact() {
        let dir = tempdir().unwrap();
        let mut cache = ResponseCache::new(dir.path().join("results.json"));
        cache.store(CacheKey::new("abc", 0), doc(&["x"])).unwrap();

        assert_eq!(cache.load(&CacheKey::new("ABC", 0)), None);
        assert_eq!(cache.load(&CacheKey::new("abc ", 0)), None);
        assert_eq!(cache.load(&CacheKey::new("abc", 1)), None);
    }

    #[test]
    fn test_pages_do_not_collide() {
        let dir = tempdir().unwrap();
        let mut cache = ResponseCache::new(dir.path().join("results.json"));
        cache.store(CacheKey::new("abc", 0), doc(&["page one"])).unwrap();
        cache.store(CacheKey::new("abc", 1), doc(&["page two"])).unwrap();

        assert_eq!(cache.load(&CacheKey::new("abc", 0)), Some(doc(&["page one"])));
        assert_eq!(cache.load(&CacheKey::new("abc", 1)), Some(doc(&["page two"])));
    }

    #[test]
    fn test_store_overwrites() {
        let dir = tempdir().unwrap();
        let mut cache = ResponseCache::new(dir.path().join("results.json"));
        let key = CacheKey::new("abc", 0);
        cache.store(key.clone(), doc(&["old"])).unwrap();
        cache.store(key.clone(), doc(&["new"])).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.load(&key), Some(doc(&["new"])));
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(&path, "{\"schema_version\": 1, \"entries\": [{\"query\": \"ab").unwrap();

        let mut cache = ResponseCache::new(path.clone());
        assert_eq!(cache.load(&CacheKey::new("ab", 0)), None);
        assert_eq!(cache.load(&CacheKey::new("anything", 3)), None);

        // Writing replaces the corrupt store with a valid one
        cache.store(CacheKey::new("ab", 0), doc(&["fresh"])).unwrap();
        let mut reread = ResponseCache::new(path);
        assert_eq!(reread.load(&CacheKey::new("ab", 0)), Some(doc(&["fresh"])));
    }

    #[test]
    fn test_invalid_item_in_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(
            &path,
            r#"{"schema_version":1,"entries":[{"query":"abc","page":0,"document":{"items":[{"title":""}]}}]}"#,
        )
        .unwrap();

        let mut cache = ResponseCache::new(path);
        assert_eq!(cache.load(&CacheKey::new("abc", 0)), None);
    }

    #[test]
    fn test_schema_mismatch_is_a_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(
            &path,
            r#"{"schema_version":999,"entries":[{"query":"abc","page":0,"document":{"items":[]}}]}"#,
        )
        .unwrap();

        let mut cache = ResponseCache::new(path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_is_lazy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut cache = ResponseCache::new(path.clone());

        // Written after construction but before first access
        ResponseCache::new(path)
            .store(CacheKey::new("late", 0), doc(&["late"]))
            .unwrap();

        assert_eq!(cache.load(&CacheKey::new("late", 0)), Some(doc(&["late"])));
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut cache = ResponseCache::new(path.clone());
        cache.store(CacheKey::new("a", 0), doc(&["a"])).unwrap();
        cache.store(CacheKey::new("b", 0), doc(&["b"])).unwrap();

        assert!(cache.remove(&CacheKey::new("a", 0)).unwrap());
        assert!(!cache.remove(&CacheKey::new("a", 0)).unwrap());
        let keys: Vec<String> = cache.entries().map(|(k, _)| k.query.clone()).collect();
        assert_eq!(keys, ["b"]);

        cache.clear().unwrap();
        assert!(ResponseCache::new(path).is_empty());
    }

    #[test]
    fn test_file_is_human_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut cache = ResponseCache::new(path.clone());
        cache.store(CacheKey::new("abc", 0), doc(&["one"])).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"query\": \"abc\""));
        assert!(text.contains("\"schema_version\": 1"));
    }
}
