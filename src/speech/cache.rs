//! Content-addressed cache of synthesized audio
//!
//! Entries live as `tts_<sha256>.mp3` files in a single directory. The
//! capacity rule is a whole-store purge: once the total size exceeds the
//! capacity, every entry is deleted. It is evaluated when the cache is
//! opened and after each write.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::Result;

/// File name prefix reserved for cache entries
pub const CACHE_FILE_PREFIX: &str = "tts_";

/// File extension of cache entries
pub const CACHE_FILE_EXT: &str = "mp3";

/// Default capacity (100 MB)
pub const DEFAULT_CAPACITY_BYTES: u64 = 100 * 1024 * 1024;

/// Fingerprint of an utterance and the voice that speaks it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for `text` spoken with `voice_id`
    ///
    /// Text is trimmed and inner whitespace collapsed before hashing, so
    /// formatting differences do not cause re-synthesis.
    #[must_use]
    pub fn new(text: &str, voice_id: &str) -> Self {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        // unit separator keeps ("ab", "c") and ("a", "bc") apart
        hasher.update([0x1f]);
        hasher.update(voice_id.as_bytes());

        Self(hex::encode(hasher.finalize()))
    }

    /// Hex digest
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn file_name(&self) -> String {
        format!("{CACHE_FILE_PREFIX}{}.{CACHE_FILE_EXT}", self.0)
    }

    fn from_file_name(name: &str) -> Option<Self> {
        let digest = name
            .strip_prefix(CACHE_FILE_PREFIX)?
            .strip_suffix(CACHE_FILE_EXT)?
            .strip_suffix('.')?;

        (digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit()))
            .then(|| Self(digest.to_ascii_lowercase()))
    }
}

/// Metadata of one cached blob
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub byte_size: u64,
    pub path: PathBuf,
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub capacity_bytes: u64,
}

/// Bounded audio store keyed by [`CacheKey`]
#[derive(Debug)]
pub struct AudioCache {
    dir: PathBuf,
    capacity_bytes: u64,
    entries: HashMap<CacheKey, CacheEntry>,
    total_bytes: u64,
}

impl AudioCache {
    /// Open the cache in `dir`, indexing existing entries
    ///
    /// Files not matching the cache naming convention are ignored. If the
    /// indexed entries already exceed the capacity, the store is purged.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or listed
    pub fn open(dir: impl Into<PathBuf>, capacity_bytes: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut cache = Self {
            dir,
            capacity_bytes,
            entries: HashMap::new(),
            total_bytes: 0,
        };

        for item in fs::read_dir(&cache.dir)? {
            let item = item?;
            let Some(key) = item.file_name().to_str().and_then(CacheKey::from_file_name) else {
                continue;
            };
            let metadata = item.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            cache.total_bytes += metadata.len();
            cache.entries.insert(
                key.clone(),
                CacheEntry {
                    key,
                    byte_size: metadata.len(),
                    path: item.path(),
                },
            );
        }

        tracing::debug!(
            dir = %cache.dir.display(),
            entries = cache.entries.len(),
            total_bytes = cache.total_bytes,
            "audio cache opened"
        );

        cache.enforce_capacity();
        Ok(cache)
    }

    /// Directory holding the entries
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether an entry exists for `key`
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Read the audio stored under `key`
    ///
    /// An entry whose file disappeared is dropped and reported as a miss.
    ///
    /// # Errors
    ///
    /// Returns error if the entry exists but cannot be read
    pub fn get(&mut self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.entries.get(key) else {
            tracing::debug!(key = key.as_str(), "audio cache miss");
            return Ok(None);
        };

        match fs::read(&entry.path) {
            Ok(bytes) => {
                tracing::debug!(key = key.as_str(), bytes = bytes.len(), "audio cache hit");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(key = key.as_str(), "cached audio file vanished");
                self.forget(key);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store `bytes` under `key`, then apply the capacity rule
    ///
    /// # Errors
    ///
    /// Returns error if the entry cannot be written
    pub fn put(&mut self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        let path = self.dir.join(key.file_name());
        fs::write(&path, bytes)?;

        let byte_size = bytes.len() as u64;
        if let Some(old) = self.entries.insert(
            key.clone(),
            CacheEntry {
                key: key.clone(),
                byte_size,
                path,
            },
        ) {
            self.total_bytes = self.total_bytes.saturating_sub(old.byte_size);
        }
        self.total_bytes += byte_size;

        tracing::debug!(
            key = key.as_str(),
            bytes = byte_size,
            total_bytes = self.total_bytes,
            "audio cache insert"
        );

        self.enforce_capacity();
        Ok(())
    }

    /// Current occupancy
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            total_bytes: self.total_bytes,
            capacity_bytes: self.capacity_bytes,
        }
    }

    /// Delete every indexed entry
    pub fn purge(&mut self) {
        for entry in self.entries.values() {
            if let Err(e) = fs::remove_file(&entry.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %entry.path.display(),
                        error = %e,
                        "failed to delete cached audio"
                    );
                }
            }
        }
        self.entries.clear();
        self.total_bytes = 0;
    }

    /// Delete every file in the cache directory that follows the cache naming
    /// convention, indexed or not, and return how many were removed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be listed
    pub fn clear(&mut self) -> Result<usize> {
        self.entries.clear();
        self.total_bytes = 0;

        let mut removed = 0;
        for item in fs::read_dir(&self.dir)? {
            let item = item?;
            if item
                .file_name()
                .to_str()
                .and_then(CacheKey::from_file_name)
                .is_none()
            {
                continue;
            }
            match fs::remove_file(item.path()) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(
                        path = %item.path().display(),
                        error = %e,
                        "failed to delete cache file"
                    );
                }
            }
        }
        Ok(removed)
    }

    fn forget(&mut self, key: &CacheKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.total_bytes = self.total_bytes.saturating_sub(entry.byte_size);
        }
    }

    fn enforce_capacity(&mut self) {
        if self.total_bytes <= self.capacity_bytes {
            return;
        }

        tracing::info!(
            entries = self.entries.len(),
            total_bytes = self.total_bytes,
            capacity_bytes = self.capacity_bytes,
            "audio cache over capacity, purging"
        );
        self.purge();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str) -> CacheKey {
        CacheKey::new(text, "voice-a")
    }

    #[test]
    fn key_is_stable_hex_digest() {
        let k1 = key("olá");
        let k2 = key("olá");
        assert_eq!(k1, k2);
        assert_eq!(k1.as_str().len(), 64);
        assert!(k1.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn key_depends_on_voice() {
        assert_ne!(CacheKey::new("olá", "voice-a"), CacheKey::new("olá", "voice-b"));
    }

    #[test]
    fn key_ignores_whitespace_differences() {
        assert_eq!(key("  uma   frase\n"), key("uma frase"));
    }

    #[test]
    fn key_separates_text_from_voice() {
        assert_ne!(CacheKey::new("ab", "c"), CacheKey::new("a", "bc"));
    }

    #[test]
    fn file_name_roundtrip_rejects_foreign_files() {
        let k = key("x");
        assert_eq!(CacheKey::from_file_name(&k.file_name()), Some(k));
        assert_eq!(CacheKey::from_file_name("notes.txt"), None);
        assert_eq!(CacheKey::from_file_name("tts_short.mp3"), None);
        assert_eq!(CacheKey::from_file_name(&format!("tts_{}.wav", "a".repeat(64))), None);
    }

    #[test]
    fn miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AudioCache::open(dir.path(), 1024).unwrap();
        let k = key("oi");

        assert!(cache.get(&k).unwrap().is_none());
        cache.put(&k, &[1, 2, 3]).unwrap();
        assert_eq!(cache.get(&k).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(cache.stats().total_bytes, 3);
    }

    #[test]
    fn overwrite_replaces_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AudioCache::open(dir.path(), 1024).unwrap();
        let k = key("oi");

        cache.put(&k, &[0; 10]).unwrap();
        cache.put(&k, &[0; 4]).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.total_bytes, 4);
    }

    #[test]
    fn crossing_capacity_purges_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AudioCache::open(dir.path(), 100).unwrap();

        cache.put(&key("a"), &[0; 40]).unwrap();
        cache.put(&key("b"), &[0; 40]).unwrap();
        assert_eq!(cache.stats().entries, 2);

        // 120 bytes > 100: the whole store goes, not just the oldest entry
        cache.put(&key("c"), &[0; 40]).unwrap();

        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 0,
                total_bytes: 0,
                capacity_bytes: 100
            }
        );
        assert!(cache.get(&key("a")).unwrap().is_none());
        assert!(cache.get(&key("c")).unwrap().is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn exactly_at_capacity_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AudioCache::open(dir.path(), 80).unwrap();

        cache.put(&key("a"), &[0; 40]).unwrap();
        cache.put(&key("b"), &[0; 40]).unwrap();
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn reopen_indexes_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut cache = AudioCache::open(dir.path(), 1024).unwrap();
            cache.put(&key("persist"), &[7; 5]).unwrap();
        }

        let mut cache = AudioCache::open(dir.path(), 1024).unwrap();
        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.get(&key("persist")).unwrap(), Some(vec![7; 5]));
    }

    #[test]
    fn open_over_capacity_purges_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut cache = AudioCache::open(dir.path(), 1024).unwrap();
            cache.put(&key("a"), &[0; 60]).unwrap();
            cache.put(&key("b"), &[0; 60]).unwrap();
        }

        let cache = AudioCache::open(dir.path(), 100).unwrap();
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().total_bytes, 0);
    }

    #[test]
    fn purge_leaves_foreign_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.mp3"), b"mine").unwrap();

        let mut cache = AudioCache::open(dir.path(), 10).unwrap();
        cache.put(&key("big"), &[0; 20]).unwrap();

        assert!(dir.path().join("keep.mp3").exists());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn vanished_file_becomes_miss() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AudioCache::open(dir.path(), 1024).unwrap();
        let k = key("gone");
        cache.put(&k, &[1; 8]).unwrap();

        fs::remove_file(dir.path().join(k.file_name())).unwrap();

        assert!(cache.get(&k).unwrap().is_none());
        assert_eq!(cache.stats().total_bytes, 0);
        assert!(!cache.contains(&k));
    }

    #[test]
    fn clear_removes_indexed_and_stray_cache_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AudioCache::open(dir.path(), 1024).unwrap();
        cache.put(&key("a"), &[1; 3]).unwrap();

        let stray = format!("{CACHE_FILE_PREFIX}{}.{CACHE_FILE_EXT}", "b".repeat(64));
        fs::write(dir.path().join(&stray), b"x").unwrap();
        fs::write(dir.path().join("other.txt"), b"x").unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(!dir.path().join(stray).exists());
        assert!(dir.path().join("other.txt").exists());
        assert_eq!(cache.stats().entries, 0);
    }
}
