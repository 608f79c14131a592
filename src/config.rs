//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione serializzabile del minimizer.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutte le opzioni del pass di ottimizzazione
//! - Fornisce validazione fail-fast (`OptimizeError::Configuration`)
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `test`: pattern (o lista) che il nome dell'asset deve matchare (default: `/\.css(\?.*)?$/i`)
//! - `include` / `exclude`: pattern aggiuntivi di selezione
//! - `minimizerOptions`: oggetto opaco passato al minifier (default: `{"preset": "default"}`)
//! - `sourceMap`: genera/propaga source map (bool oppure oggetto di dettaglio)
//! - `parallel`: `true` = tutti i core meno uno, numero = limite, `false`/0 = niente pool
//! - `cache`: abilita la cache content-addressed (default: true)
//! - `cacheDirectory`: directory della cache persistente (default: solo in memoria)
//! - `context`: directory usata per accorciare i path nelle diagnostiche
//!
//! Le opzioni non serializzabili (funzioni `minify` e `warningsFilter`) si
//! passano al builder di `OptimizeScheduler`.
//!
//! ## Esempio:
//! ```rust
//! use css_minimizer::config::{Config, Parallel};
//!
//! let config = Config {
//!     parallel: Parallel::Workers(2),
//!     ..Default::default()
//! };
//! config.validate().unwrap();
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::error::OptimizeError;
use crate::matcher::AssetMatcher;

/// Default selection pattern: stylesheets, with an optional query string.
pub const DEFAULT_TEST: &str = r"/\.css(\?.*)?$/i";

/// One pattern or a list of patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PatternsRepr", into = "Vec<String>")]
pub struct Patterns(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternsRepr {
    One(String),
    Many(Vec<String>),
}

impl From<PatternsRepr> for Patterns {
    fn from(repr: PatternsRepr) -> Self {
        match repr {
            PatternsRepr::One(p) => Patterns(vec![p]),
            PatternsRepr::Many(ps) => Patterns(ps),
        }
    }
}

impl From<Patterns> for Vec<String> {
    fn from(patterns: Patterns) -> Self {
        patterns.0
    }
}

impl From<Vec<String>> for Patterns {
    fn from(patterns: Vec<String>) -> Self {
        Patterns(patterns)
    }
}

impl From<Vec<&str>> for Patterns {
    fn from(patterns: Vec<&str>) -> Self {
        Patterns(patterns.into_iter().map(str::to_string).collect())
    }
}

impl Patterns {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Worker pool policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parallel {
    Enabled(bool),
    Workers(usize),
}

impl Default for Parallel {
    fn default() -> Self {
        Parallel::Enabled(true)
    }
}

impl Parallel {
    /// Cores usable for workers on this machine; 0 disables the pool.
    pub fn available_cores(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1);
        self.available_cores_with(cpus)
    }

    /// Same as [`Parallel::available_cores`] for an explicit core count.
    pub fn available_cores_with(&self, cpus: usize) -> usize {
        let spare = cpus.saturating_sub(1);
        match *self {
            Parallel::Enabled(true) => spare,
            Parallel::Enabled(false) => 0,
            Parallel::Workers(n) => n.min(spare),
        }
    }
}

/// `sourceMap` accepts a flag or an object of detail flags (which enables it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceMapOption {
    Flag(bool),
    Detailed(serde_json::Map<String, Value>),
}

impl Default for SourceMapOption {
    fn default() -> Self {
        SourceMapOption::Flag(false)
    }
}

impl SourceMapOption {
    pub fn enabled(&self) -> bool {
        match self {
            SourceMapOption::Flag(flag) => *flag,
            SourceMapOption::Detailed(_) => true,
        }
    }
}

/// Configuration for stylesheet minimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub test: Option<Patterns>,
    pub include: Option<Patterns>,
    pub exclude: Option<Patterns>,
    /// Passed verbatim to every minify stage
    pub minimizer_options: Value,
    pub source_map: SourceMapOption,
    pub parallel: Parallel,
    pub cache: bool,
    /// Persist cache entries here instead of keeping them in memory
    pub cache_directory: Option<PathBuf>,
    /// Base directory for shortening source paths in diagnostics
    pub context: Option<PathBuf>,
    /// Show a progress bar while the pass runs
    pub show_progress: bool,
    /// Dry run - compute results but don't write files
    pub dry_run: bool,
    /// Output progress and diagnostics as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            test: Some(Patterns(vec![DEFAULT_TEST.to_string()])),
            include: None,
            exclude: None,
            minimizer_options: json!({ "preset": "default" }),
            source_map: SourceMapOption::default(),
            parallel: Parallel::default(),
            cache: true,
            cache_directory: None,
            context: None,
            show_progress: false,
            dry_run: false,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), OptimizeError> {
        AssetMatcher::from_config(self)?;

        if !self.minimizer_options.is_object() {
            return Err(OptimizeError::Configuration(
                "minimizerOptions must be an object".to_string(),
            ));
        }

        if let Some(ref dir) = self.cache_directory {
            if dir.exists() && !dir.is_dir() {
                return Err(OptimizeError::Configuration(format!(
                    "cacheDirectory is not a directory: {}",
                    dir.display()
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from file; a missing file yields the defaults
    pub async fn from_file(path: &Path) -> Result<Self, OptimizeError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            OptimizeError::Configuration(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<(), OptimizeError> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.test.as_ref().unwrap().as_slice(), [DEFAULT_TEST.to_string()]);
        assert_eq!(config.minimizer_options, json!({"preset": "default"}));
        assert_eq!(config.parallel, Parallel::Enabled(true));
        assert!(config.cache);
        assert!(!config.source_map.enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.minimizer_options = json!("fast");
        assert!(matches!(config.validate(), Err(OptimizeError::Configuration(_))));

        config.minimizer_options = json!({});
        config.test = Some(vec!["/[/"].into());
        assert!(matches!(config.validate(), Err(OptimizeError::Configuration(_))));
    }

    #[test]
    fn test_available_cores() {
        assert_eq!(Parallel::Enabled(true).available_cores_with(8), 7);
        assert_eq!(Parallel::Enabled(false).available_cores_with(8), 0);
        assert_eq!(Parallel::Workers(2).available_cores_with(8), 2);
        assert_eq!(Parallel::Workers(16).available_cores_with(8), 7);
        assert_eq!(Parallel::Workers(0).available_cores_with(8), 0);
        assert_eq!(Parallel::Enabled(true).available_cores_with(1), 0);
    }

    #[test]
    fn test_deserialize_option_shapes() {
        let config: Config = serde_json::from_value(json!({
            "test": "/bar.*\\.css$/",
            "exclude": ["vendor/", "/legacy/"],
            "parallel": 2,
            "sourceMap": {"inline": false}
        }))
        .unwrap();

        assert_eq!(config.test.unwrap().as_slice(), ["/bar.*\\.css$/".to_string()]);
        assert_eq!(config.exclude.unwrap().as_slice().len(), 2);
        assert_eq!(config.parallel, Parallel::Workers(2));
        assert!(config.source_map.enabled());
        assert!(config.cache);

        let config: Config = serde_json::from_value(json!({"parallel": false})).unwrap();
        assert_eq!(config.parallel, Parallel::Enabled(false));
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("minimizer.json");

        let original_config = Config {
            parallel: Parallel::Workers(3),
            source_map: SourceMapOption::Flag(true),
            cache: false,
            ..Config::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(loaded_config, original_config);

        let missing = Config::from_file(&temp_dir.path().join("missing.json")).await.unwrap();
        assert_eq!(missing, Config::default());
    }

    #[tokio::test]
    async fn test_config_load_rejects_bad_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("minimizer.json");
        tokio::fs::write(&config_path, "{ not json").await.unwrap();

        let err = Config::from_file(&config_path).await.unwrap_err();
        assert!(matches!(err, OptimizeError::Configuration(_)));
    }
}
