//! # Task Optimizer Module
//!
//! Elaborazione di un singolo asset selezionato.
//! Separato dallo scheduler per maggiore modularità.
//!
//! ## Responsabilità:
//! - `AssetTask`: snapshot dell'asset (nome, contenuto, source map, chiave cache)
//! - lookup in cache; gli errori di I/O diventano un miss
//! - dispatch al worker pool, o esecuzione inline se il pool è disabilitato
//! - salvataggio in cache del risultato riuscito

use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

use crate::{
    asset::Asset,
    cache::{CacheEntry, CacheKey, CacheStore},
    error::{OptimizeError, TransformError},
    minify::{Minimizer, MinifyInput, MinifyOutput},
    pool::{panic_message, LazyPool},
};

/// Pass-scoped copy of one selected asset
#[derive(Debug, Clone)]
pub struct AssetTask {
    pub name: String,
    pub content: String,
    pub source_map: Option<Value>,
    /// `None` when caching is disabled
    pub key: Option<CacheKey>,
}

impl AssetTask {
    pub fn new(asset: &Asset) -> Self {
        Self {
            name: asset.name.clone(),
            content: asset.content.clone(),
            source_map: asset.source_map.clone(),
            key: None,
        }
    }

    /// Attach the cache key. The input map only takes part in it when maps
    /// are generated, since otherwise it cannot change the result.
    pub fn keyed(mut self, fingerprint: &str, with_source_map: bool) -> Self {
        let mut bytes = self.content.as_bytes().to_vec();
        if let Some(map) = self.source_map.as_ref().filter(|_| with_source_map) {
            bytes.push(0);
            bytes.extend_from_slice(map.to_string().as_bytes());
        }
        self.key = Some(CacheKey::new(&self.name, &bytes, fingerprint));
        self
    }

    pub fn original_size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// How one dispatched task ended
#[derive(Debug)]
pub enum TaskOutcome {
    Minified(MinifyOutput),
    Failed(TransformError),
}

/// Runs tasks for one pass
pub struct TaskOptimizer<'a> {
    minimizer: &'a Minimizer,
    cache: Option<&'a dyn CacheStore>,
    pool: Option<&'a LazyPool>,
    options: &'a Value,
    source_map: bool,
}

impl<'a> TaskOptimizer<'a> {
    pub fn new(
        minimizer: &'a Minimizer,
        cache: Option<&'a dyn CacheStore>,
        options: &'a Value,
        source_map: bool,
    ) -> Self {
        Self {
            minimizer,
            cache,
            pool: None,
            options,
            source_map,
        }
    }

    /// Route dispatches through `pool`; without one tasks run inline.
    pub fn with_pool(mut self, pool: Option<&'a LazyPool>) -> Self {
        self.pool = pool;
        self
    }

    pub async fn lookup(&self, task: &AssetTask) -> Option<CacheEntry> {
        let (cache, key) = (self.cache?, task.key.as_ref()?);
        match cache.lookup(key).await {
            Ok(entry) => {
                if entry.is_some() {
                    debug!("Cache hit for {} ({})", task.name, key);
                }
                entry
            }
            Err(e) => {
                warn!("Cache lookup failed for {}, minifying uncached: {}", task.name, e);
                None
            }
        }
    }

    /// Minify one asset and store the result in the cache.
    pub async fn process(&self, task: &AssetTask) -> TaskOutcome {
        let input = self.input(task);

        let result = match self.pool {
            Some(lazy) => match lazy.acquire().await {
                Ok(pool) => pool.transform(&input).await,
                Err(e) => Err(e.into()),
            },
            None => run_inline(self.minimizer, input),
        };

        match result {
            Ok(output) => {
                self.store(task, &output).await;
                TaskOutcome::Minified(output)
            }
            Err(error) => {
                debug!("Minification failed for {}: {}", task.name, error);
                TaskOutcome::Failed(error)
            }
        }
    }

    fn input(&self, task: &AssetTask) -> MinifyInput {
        MinifyInput {
            name: task.name.clone(),
            code: task.content.clone(),
            input_source_map: task.source_map.clone(),
            source_map: self.source_map,
            options: self.options.clone(),
        }
    }

    async fn store(&self, task: &AssetTask, output: &MinifyOutput) {
        let (Some(cache), Some(key)) = (self.cache, task.key.as_ref()) else {
            return;
        };

        let entry = CacheEntry {
            code: output.code.clone(),
            map: output.map.clone(),
            warnings: output.warnings.clone(),
        };
        if let Err(e) = cache.store(key, entry).await {
            warn!("Failed to cache result for {}: {}", task.name, e);
        }
    }
}

/// Run the minimizer on the coordinating task, with the same panic
/// containment the workers apply.
fn run_inline(minimizer: &Minimizer, input: MinifyInput) -> Result<MinifyOutput, TransformError> {
    catch_unwind(AssertUnwindSafe(|| minimizer.run(input))).unwrap_or_else(|panic| {
        Err(OptimizeError::PoolFault(format!(
            "minifier panicked: {}",
            panic_message(panic.as_ref())
        ))
        .into())
    })
}
