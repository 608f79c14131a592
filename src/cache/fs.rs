use futures::future::BoxFuture;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{CacheEntry, CacheKey, CacheStore};
use crate::error::OptimizeError;

/// Cache persisted as one JSON file per key.
///
/// Layout: `<dir>/<full key>.json`. Writes go through a temp file in the same
/// directory and are renamed into place, so a reader never sees a torn entry.
#[derive(Debug, Clone)]
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.css-minimizer/cache`
    pub fn default_location() -> Result<Self, OptimizeError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| OptimizeError::CacheIo("Could not find home directory".to_string()))?
            .join(".css-minimizer")
            .join("cache");
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

fn cache_io(context: &str, err: impl std::fmt::Display) -> OptimizeError {
    OptimizeError::CacheIo(format!("{}: {}", context, err))
}

impl CacheStore for FsCache {
    fn lookup<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<CacheEntry>, OptimizeError>> {
        Box::pin(async move {
            let path = self.entry_path(key);
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(cache_io(&path.display().to_string(), e)),
            };

            let entry = serde_json::from_str(&content)
                .map_err(|e| cache_io(&path.display().to_string(), e))?;
            debug!("Cache file hit: {}", path.display());
            Ok(Some(entry))
        })
    }

    fn store<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry) -> BoxFuture<'a, Result<(), OptimizeError>> {
        Box::pin(async move {
            let dir = self.dir.clone();
            let path = self.entry_path(key);
            let content = serde_json::to_vec(&entry).map_err(|e| cache_io("serialize", e))?;

            tokio::task::spawn_blocking(move || -> Result<(), OptimizeError> {
                std::fs::create_dir_all(&dir).map_err(|e| cache_io(&dir.display().to_string(), e))?;
                let mut tmp = tempfile::NamedTempFile::new_in(&dir)
                    .map_err(|e| cache_io(&dir.display().to_string(), e))?;
                tmp.write_all(&content)
                    .map_err(|e| cache_io(&path.display().to_string(), e))?;
                tmp.persist(&path)
                    .map_err(|e| cache_io(&path.display().to_string(), e))?;
                Ok(())
            })
            .await
            .map_err(|e| cache_io("cache writer", e))?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let key = CacheKey::new("a.css", b"a { color: red }", "{}");
        let entry = CacheEntry {
            code: "a{color:red}".into(),
            map: Some(json!({"version": 3, "sources": ["a.css"], "mappings": "AAAA"})),
            warnings: vec!["careful 1:2".into()],
        };

        let cache = FsCache::new(temp_dir.path().join("nested"));
        assert!(cache.lookup(&key).await.unwrap().is_none());
        cache.store(&key, entry.clone()).await.unwrap();

        let reopened = FsCache::new(temp_dir.path().join("nested"));
        assert_eq!(reopened.lookup(&key).await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_cache_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FsCache::new(temp_dir.path());
        let key = CacheKey::new("a.css", b"", "{}");
        std::fs::write(cache.entry_path(&key), "{ truncated").unwrap();

        let err = cache.lookup(&key).await.unwrap_err();
        assert!(matches!(err, OptimizeError::CacheIo(_)));
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_cache_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, "not a dir").unwrap();

        let cache = FsCache::new(&blocker);
        let key = CacheKey::new("a.css", b"", "{}");
        let entry = CacheEntry { code: String::new(), map: None, warnings: vec![] };
        assert!(matches!(cache.store(&key, entry).await, Err(OptimizeError::CacheIo(_))));
    }
}
