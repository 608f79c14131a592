//! # Optimize Scheduler
//!
//! Orchestratore di un pass di minificazione sull'asset graph.
//!
//! ## Flusso per asset:
//! `Selected → CacheLookup → {CacheHit | CacheMiss → Dispatched → {Succeeded | Failed}} → Committed`
//!
//! ## Regole:
//! - solo gli errori di configurazione interrompono il pass
//! - un asset fallito resta invariato e non blocca gli altri
//! - il pool viene creato solo se c'è almeno un cache miss, e chiuso una
//!   volta sola a fine pass
//! - diagnostiche e commit seguono l'ordine di completamento
//! - i warning in cache passano di nuovo dal `warningsFilter` ad ogni pass

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::{
    asset::{AssetGraph, AssetInfo, Severity},
    cache::{CacheStore, FsCache, MemoryCache},
    config::Config,
    diagnostics::{accept_all, Diagnostic, DiagnosticsBuilder, WarningsFilter},
    error::{OptimizeError, TransformError},
    json_output::JsonMessage,
    limiter::ConcurrencyLimiter,
    matcher::AssetMatcher,
    minify::{Minify, Minimizer},
    optimizer::{
        progress_tracker::ProgressTracker,
        task::{AssetTask, TaskOptimizer, TaskOutcome},
    },
    pool::LazyPool,
    progress::OptimizationStats,
    source_map::{self, LazyIndex},
};

pub const TOOL_NAME: &str = "css-minimizer";

/// Outcome of one optimization pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub stats: OptimizationStats,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// Names committed during the pass, in completion order
    pub committed: Vec<String>,
    /// Workers actually started; 0 when no pool was created
    pub workers: usize,
    /// Highest number of tasks running at once
    pub peak_concurrency: usize,
}

impl PassReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Stylesheet minimization pass over an [`AssetGraph`].
///
/// The cache is owned by the scheduler and outlives individual passes, so
/// reusing one scheduler across builds turns unchanged assets into cache hits.
///
/// ```no_run
/// # async fn run() -> Result<(), css_minimizer::OptimizeError> {
/// use css_minimizer::{Asset, AssetSet, Config, OptimizeScheduler};
///
/// let mut assets: AssetSet = [Asset::new("main.css", "body {\n  color: red;\n}")]
///     .into_iter()
///     .collect();
/// let scheduler = OptimizeScheduler::new(Config::default())
///     .with_warnings_filter(|warning, _, _| !warning.contains("vendor"));
/// let report = scheduler.optimize(&mut assets).await?;
/// assert_eq!(report.stats.minimized, 1);
/// # Ok(())
/// # }
/// ```
pub struct OptimizeScheduler {
    config: Config,
    minimizer: Minimizer,
    warnings_filter: WarningsFilter,
    cache: Option<Arc<dyn CacheStore>>,
    /// Overrides the detected core count when sizing the pool
    cores: Option<usize>,
}

impl OptimizeScheduler {
    /// Default minimizer, accept-all filter, cache picked from the config.
    pub fn new(config: Config) -> Self {
        let cache: Option<Arc<dyn CacheStore>> = match (config.cache, &config.cache_directory) {
            (false, _) => None,
            (true, Some(dir)) => Some(Arc::new(FsCache::new(dir.clone()))),
            (true, None) => Some(Arc::new(MemoryCache::new())),
        };

        Self {
            config,
            minimizer: Minimizer::default(),
            warnings_filter: accept_all(),
            cache,
            cores: None,
        }
    }

    pub fn with_minimizer(mut self, minimizer: Minimizer) -> Self {
        self.minimizer = minimizer;
        self
    }

    /// Ordered minify stages; an empty list is a configuration error.
    pub fn with_minify(self, stages: Vec<Arc<dyn Minify>>) -> Result<Self, OptimizeError> {
        Ok(self.with_minimizer(Minimizer::new(stages)?))
    }

    /// Predicate `(raw_warning, asset_name, resolved_source) -> keep`.
    pub fn with_warnings_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, &str, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.warnings_filter = Arc::new(filter);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Size the pool as if the machine had `cores` CPUs.
    pub fn with_available_cores(mut self, cores: usize) -> Self {
        self.cores = Some(cores);
        self
    }

    /// Worker count for `pending` cache misses.
    fn worker_count(&self, pending: usize) -> usize {
        let cores = match self.cores {
            Some(cores) => self.config.parallel.available_cores_with(cores),
            None => self.config.parallel.available_cores(),
        };
        pending.min(cores)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn minimizer(&self) -> &Minimizer {
        &self.minimizer
    }

    /// Stable identity of the minimizer setup. Hosts mix it into their
    /// output hashes; it is also the configuration part of every cache key.
    pub fn fingerprint(&self) -> String {
        json!({
            "name": TOOL_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "minify": self.minimizer.stage_names(),
            "options": self.config.minimizer_options,
            "sourceMap": self.config.source_map.enabled(),
        })
        .to_string()
    }

    /// Run one pass: minify every selected asset and commit the results.
    pub async fn optimize<G>(&self, graph: &mut G) -> Result<PassReport, OptimizeError>
    where
        G: AssetGraph + ?Sized,
    {
        let started = Instant::now();
        self.config.validate()?;
        let matcher = AssetMatcher::from_config(&self.config)?;
        let with_maps = self.config.source_map.enabled();
        let fingerprint = self.fingerprint();

        let names = graph.names();
        let tasks: Vec<AssetTask> = names
            .iter()
            .filter(|name| matcher.matches(name))
            .filter_map(|name| graph.get(name))
            .filter(|asset| !asset.info.minimized)
            .map(|asset| {
                let task = AssetTask::new(asset);
                match self.cache {
                    Some(_) => task.keyed(&fingerprint, with_maps),
                    None => task,
                }
            })
            .collect();

        debug!("Selected {} of {} assets", tasks.len(), names.len());
        if self.config.json_output {
            JsonMessage::start(names.len(), tasks.len(), &self.config).emit();
        }

        let mut pass = Pass {
            graph,
            diagnostics: DiagnosticsBuilder::new(self.config.context.clone()),
            filter: &self.warnings_filter,
            tracker: ProgressTracker::new(tasks.len(), &self.config),
            report: PassReport::default(),
        };

        let runner = TaskOptimizer::new(
            &self.minimizer,
            self.cache.as_deref(),
            &self.config.minimizer_options,
            with_maps,
        );

        let lookups = join_all(tasks.iter().map(|task| runner.lookup(task))).await;
        let mut misses = Vec::new();
        for (task, entry) in tasks.iter().zip(lookups) {
            match entry {
                Some(entry) => pass.commit(task, entry.code, entry.map, &entry.warnings, true),
                None => misses.push(task),
            }
        }

        // cached results were checked when they were first produced
        for task in &misses {
            if task.source_map.as_ref().is_some_and(|map| !source_map::is_valid(map)) {
                let diagnostic = pass.diagnostics.invalid_source_map(&task.name);
                pass.report(diagnostic);
            }
        }

        let workers = self.worker_count(misses.len());
        let pool = (workers > 0).then(|| LazyPool::new(workers, self.minimizer.clone()));
        let limiter = ConcurrencyLimiter::new(workers);
        pass.tracker.set_dispatched(misses.len());

        if misses.is_empty() {
            debug!("Nothing to minify, worker pool not created");
        } else if let Some(limit) = limiter.max_concurrent() {
            debug!("Dispatching {} tasks to {} workers, at most {} at once", misses.len(), workers, limit);
        } else {
            debug!("Running {} tasks inline", misses.len());
        }

        {
            let runner = runner.with_pool(pool.as_ref());
            let (runner, limiter) = (&runner, &limiter);

            let mut pending: FuturesUnordered<_> = misses
                .iter()
                .map(|task| async move { (*task, limiter.schedule(runner.process(task)).await) })
                .collect();

            while let Some((task, outcome)) = pending.next().await {
                match outcome {
                    TaskOutcome::Minified(output) => {
                        pass.commit(task, output.code, output.map, &output.warnings, false)
                    }
                    TaskOutcome::Failed(error) => pass.fail(task, &error),
                }
            }
        }

        pass.report.workers = pool.as_ref().map_or(0, LazyPool::workers);
        pass.report.peak_concurrency = limiter.peak_in_flight();
        if let Some(pool) = pool {
            pool.shutdown().await;
        }

        let Pass {
            tracker, mut report, ..
        } = pass;
        report.stats = tracker.finish();

        let duration = started.elapsed().as_secs_f64();
        if self.config.json_output {
            JsonMessage::complete(&report.stats, report.errors.len(), report.warnings.len(), duration).emit();
        } else {
            info!(
                "Minimized {} assets ({} from cache) with {} errors and {} warnings in {:.2}s",
                report.stats.minimized,
                report.stats.cache_hits,
                report.errors.len(),
                report.warnings.len(),
                duration
            );
        }

        Ok(report)
    }
}

/// Mutable state of one pass, confined to the coordinating task
struct Pass<'p, G: ?Sized> {
    graph: &'p mut G,
    diagnostics: DiagnosticsBuilder,
    filter: &'p WarningsFilter,
    tracker: ProgressTracker,
    report: PassReport,
}

impl<G: AssetGraph + ?Sized> Pass<'_, G> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.tracker.record_diagnostic(&diagnostic);
        self.graph.report(diagnostic.severity, diagnostic.message.clone());
        match diagnostic.severity {
            Severity::Error => self.report.errors.push(diagnostic),
            Severity::Warning => self.report.warnings.push(diagnostic),
        }
    }

    fn commit(&mut self, task: &AssetTask, code: String, map: Option<Value>, warnings: &[String], from_cache: bool) {
        let minimized_size = code.len() as u64;
        self.graph.commit(&task.name, code, map, AssetInfo::minimized());
        self.report.committed.push(task.name.clone());

        if from_cache {
            self.tracker.record_cache_hit(&task.name, task.original_size(), minimized_size);
        } else {
            self.tracker.record_minimized(&task.name, task.original_size(), minimized_size);
        }

        if warnings.is_empty() {
            return;
        }
        let index = LazyIndex::new(task.source_map.as_ref());
        for warning in warnings {
            if let Some(diagnostic) =
                self.diagnostics
                    .build_warning(warning, &task.name, index.get(), self.filter)
            {
                self.report(diagnostic);
            }
        }
    }

    fn fail(&mut self, task: &AssetTask, error: &TransformError) {
        let index = LazyIndex::new(task.source_map.as_ref());
        let diagnostic = self.diagnostics.build_error(error, &task.name, index.get());
        self.tracker.record_failed(&task.name, task.original_size(), &error.message);
        self.report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, AssetSet};
    use crate::config::{Parallel, SourceMapOption};
    use crate::minify::{minify_fn, MinifyOutput};
    use tempfile::TempDir;

    fn shout() -> Arc<dyn Minify> {
        minify_fn("shout", |input| {
            Ok(Some(MinifyOutput {
                code: input.code.to_uppercase(),
                map: None,
                warnings: vec![],
            }))
        })
    }

    #[test]
    fn test_fingerprint_tracks_minimizer_setup() {
        let base = OptimizeScheduler::new(Config::default());
        assert_eq!(base.fingerprint(), OptimizeScheduler::new(Config::default()).fingerprint());
        assert!(base.fingerprint().contains("lightningcss"));

        let with_maps = OptimizeScheduler::new(Config {
            source_map: SourceMapOption::Flag(true),
            ..Config::default()
        });
        assert_ne!(base.fingerprint(), with_maps.fingerprint());

        let other_stage = OptimizeScheduler::new(Config::default()).with_minimizer(Minimizer::single(shout()));
        assert_ne!(base.fingerprint(), other_stage.fingerprint());
    }

    #[test]
    fn test_empty_minify_list_is_rejected() {
        let result = OptimizeScheduler::new(Config::default()).with_minify(vec![]);
        assert!(matches!(result, Err(OptimizeError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_configuration_error_aborts_before_touching_assets() {
        let config = Config {
            exclude: Some(vec!["/[unclosed/"].into()),
            ..Config::default()
        };
        let mut assets: AssetSet = [Asset::new("a.css", "a { color: red }")].into_iter().collect();

        let err = OptimizeScheduler::new(config).optimize(&mut assets).await.unwrap_err();
        assert!(matches!(err, OptimizeError::Configuration(_)));
        assert_eq!(assets.get("a.css").unwrap().content, "a { color: red }");
        assert!(assets.errors().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_map_warns_and_still_minifies() {
        let mut assets: AssetSet = [Asset::new("a.css", "a{}").with_source_map(json!({"mappings": 1}))]
            .into_iter()
            .collect();

        let scheduler = OptimizeScheduler::new(Config {
            parallel: Parallel::Enabled(false),
            ..Config::default()
        })
        .with_minimizer(Minimizer::single(shout()));
        let report = scheduler.optimize(&mut assets).await.unwrap();

        assert_eq!(assets.warnings(), ["a.css contains invalid source map".to_string()]);
        assert_eq!(assets.get("a.css").unwrap().content, "A{}");
        assert_eq!(report.committed, vec!["a.css".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_map_is_not_reported_again_on_cache_hit() {
        let build = || -> AssetSet {
            [Asset::new("a.css", "a{}").with_source_map(json!("{ nope"))]
                .into_iter()
                .collect()
        };
        let scheduler = OptimizeScheduler::new(Config {
            parallel: Parallel::Enabled(false),
            ..Config::default()
        })
        .with_minimizer(Minimizer::single(shout()));

        let report = scheduler.optimize(&mut build()).await.unwrap();
        assert_eq!(report.warnings.len(), 1);

        let mut second = build();
        let report = scheduler.optimize(&mut second).await.unwrap();
        assert_eq!(report.stats.cache_hits, 1);
        assert!(report.warnings.is_empty());
        assert!(second.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_default_minimizer_emits_output_map() {
        let map = json!({"version": 3, "sources": ["src/a.scss"], "names": [], "mappings": "AAAA"});
        let mut assets: AssetSet = [Asset::new("a.css", "a { color: red }").with_source_map(map)]
            .into_iter()
            .collect();

        let scheduler = OptimizeScheduler::new(Config {
            source_map: SourceMapOption::Flag(true),
            parallel: Parallel::Enabled(false),
            ..Config::default()
        });
        let report = scheduler.optimize(&mut assets).await.unwrap();

        assert_eq!(report.committed, vec!["a.css".to_string()]);
        let asset = assets.get("a.css").unwrap();
        assert_eq!(asset.content, "a{color:red}");
        let output = asset.source_map.as_ref().expect("map kept with sourceMap enabled");
        assert_eq!(output["version"], json!(3));
        assert!(!output["mappings"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_worker_count_uses_overridden_cores() {
        let scheduler = OptimizeScheduler::new(Config {
            parallel: Parallel::Workers(2),
            ..Config::default()
        });
        assert_eq!(scheduler.worker_count(10), scheduler.config.parallel.available_cores().min(10));

        let scheduler = scheduler.with_available_cores(4);
        assert_eq!(scheduler.worker_count(10), 2);
        assert_eq!(scheduler.worker_count(1), 1);
        assert_eq!(scheduler.with_available_cores(1).worker_count(10), 0);
    }

    #[tokio::test]
    async fn test_persistent_cache_survives_schedulers() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            cache_directory: Some(temp_dir.path().to_path_buf()),
            parallel: Parallel::Enabled(false),
            ..Config::default()
        };
        let assets = || -> AssetSet { [Asset::new("a.css", "a { color: red }")].into_iter().collect() };

        let mut first = assets();
        let report = OptimizeScheduler::new(config.clone()).optimize(&mut first).await.unwrap();
        assert_eq!(report.stats.dispatched, 1);

        let mut second = assets();
        let report = OptimizeScheduler::new(config).optimize(&mut second).await.unwrap();
        assert_eq!(report.stats.dispatched, 0);
        assert_eq!(report.stats.cache_hits, 1);
        assert_eq!(first.get("a.css").unwrap().content, second.get("a.css").unwrap().content);
    }
}
