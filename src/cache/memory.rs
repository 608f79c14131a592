use futures::future::{self, BoxFuture};
use std::collections::HashMap;
use std::sync::RwLock;

use super::{CacheEntry, CacheKey, CacheStore};
use crate::error::OptimizeError;

/// Process-wide cache kept in memory; survives across passes as long as the
/// store itself is kept alive.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn lookup<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<CacheEntry>, OptimizeError>> {
        let result = self
            .entries
            .read()
            .map(|entries| entries.get(key).cloned())
            .map_err(|_| OptimizeError::CacheIo("memory cache lock poisoned".to_string()));
        Box::pin(future::ready(result))
    }

    fn store<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry) -> BoxFuture<'a, Result<(), OptimizeError>> {
        let result = self
            .entries
            .write()
            .map(|mut entries| {
                entries.insert(key.clone(), entry);
            })
            .map_err(|_| OptimizeError::CacheIo("memory cache lock poisoned".to_string()));
        Box::pin(future::ready(result))
    }
}
