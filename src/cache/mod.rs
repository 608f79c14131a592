//! # Cache Module
//!
//! Cache content-addressed dei risultati di minificazione.
//!
//! ## Responsabilità:
//! - `CacheKey`: hash di {nome asset, hash del contenuto, configurazione serializzata}
//! - `CacheEntry`: {codice minificato, source map opzionale, warning grezzi}
//! - `CacheStore`: interfaccia unica dietro cui stanno le varianti di storage
//! - `MemoryCache`: cache in memoria condivisa tra i pass
//! - `FsCache`: cache persistente su disco, un file JSON per chiave
//!
//! ## Semantica:
//! - Al massimo una entry per chiave, last writer wins
//! - Nessuna condivisione di calcoli pendenti: due task sulla stessa chiave
//!   possono calcolare in parallelo e scrivono lo stesso valore
//! - Gli errori di I/O sono `OptimizeError::CacheIo`; lo scheduler li tratta
//!   come cache miss e prosegue senza cache

mod fs;
mod key;
mod memory;

pub use fs::FsCache;
pub use key::{CacheEntry, CacheKey};
pub use memory::MemoryCache;

use futures::future::BoxFuture;

use crate::error::OptimizeError;

/// Storage capability behind the optimization cache
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` on a miss.
    fn lookup<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<CacheEntry>, OptimizeError>>;

    /// Insert or overwrite.
    fn store<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry) -> BoxFuture<'a, Result<(), OptimizeError>>;
}
