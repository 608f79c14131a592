//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico
//! della CLI (una riga JSON per evento su stdout).
//!
//! ## Tipi di messaggi:
//! - `start`: inizio del pass, con numero di asset selezionati
//! - `asset_complete`: fine elaborazione di un asset (cache, minificato o errore)
//! - `diagnostic`: errore o warning riportato all'asset graph
//! - `complete`: fine del pass con statistiche finali
//! - `error`: errore che interrompe il pass

use serde::Serialize;

use crate::asset::Severity;
use crate::config::{Config, Parallel};
use crate::diagnostics::Diagnostic;
use crate::file_manager::FileManager;
use crate::progress::OptimizationStats;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Inizio del pass
    Start {
        total_assets: usize,
        selected: usize,
        config: JsonConfig,
    },

    /// Fine elaborazione di un asset
    AssetComplete {
        name: String,
        original_size: u64,
        minimized_size: u64,
        reduction_percent: f64,
        from_cache: bool,
        error: Option<String>,
    },

    Diagnostic {
        severity: Severity,
        message: String,
    },

    /// Pass completato
    Complete {
        #[serde(flatten)]
        stats: OptimizationStats,
        errors: usize,
        warnings: usize,
        duration_seconds: f64,
    },

    /// Errore generale
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub parallel: Parallel,
    pub cache: bool,
    pub source_map: bool,
    pub dry_run: bool,
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            parallel: config.parallel,
            cache: config.cache,
            source_map: config.source_map.enabled(),
            dry_run: config.dry_run,
        }
    }
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(total_assets: usize, selected: usize, config: &Config) -> Self {
        Self::Start {
            total_assets,
            selected,
            config: JsonConfig::from(config),
        }
    }

    /// Asset committato, da cache o appena minificato
    pub fn asset_minimized(name: &str, original_size: u64, minimized_size: u64, from_cache: bool) -> Self {
        Self::AssetComplete {
            name: name.to_string(),
            original_size,
            minimized_size,
            reduction_percent: FileManager::calculate_reduction(original_size, minimized_size),
            from_cache,
            error: None,
        }
    }

    /// Asset lasciato invariato per un errore
    pub fn asset_failed(name: &str, original_size: u64, error: String) -> Self {
        Self::AssetComplete {
            name: name.to_string(),
            original_size,
            minimized_size: original_size,
            reduction_percent: 0.0,
            from_cache: false,
            error: Some(error),
        }
    }

    pub fn diagnostic(diagnostic: &Diagnostic) -> Self {
        Self::Diagnostic {
            severity: diagnostic.severity,
            message: diagnostic.message.clone(),
        }
    }

    pub fn complete(stats: &OptimizationStats, errors: usize, warnings: usize, duration_seconds: f64) -> Self {
        Self::Complete {
            stats: stats.clone(),
            errors,
            warnings,
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}
