//! # CSS Minimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per gli host che
//!   integrano il minimizer nella propria build
//!
//! ## Architettura dei moduli:
//! - `asset`: Boundary con l'asset graph (`AssetGraph`, `AssetSet`)
//! - `cache`: Cache content-addressed in memoria o su disco
//! - `config`: Gestione configurazione e validazione parametri
//! - `diagnostics`: Formattazione di errori e warning
//! - `error`: Tipi di errore custom
//! - `file_manager`: Caricamento e scrittura di una directory di asset
//! - `limiter`: Limite di task concorrenti
//! - `matcher`: Predicato di selezione test/include/exclude
//! - `minify`: Stage di minificazione (default: lightningcss)
//! - `optimizer`: Orchestratore del pass
//! - `pool`: Worker pool isolato
//! - `progress`: Progress bar e statistiche
//! - `source_map`: Decodifica delle source map
//!
//! ## Utilizzo:
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use css_minimizer::{Config, FileManager, OptimizeScheduler};
//!
//! let dir = std::path::Path::new("dist");
//! let mut assets = FileManager::load_assets(dir)?;
//! let report = OptimizeScheduler::new(Config::default()).optimize(&mut assets).await?;
//! FileManager::write_assets(dir, &assets, &report.committed)?;
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod limiter;
pub mod matcher;
pub mod minify;
pub mod optimizer;
pub mod pool;
pub mod progress;
pub mod source_map;

pub use asset::{Asset, AssetGraph, AssetInfo, AssetSet, Severity};
pub use cache::{CacheEntry, CacheKey, CacheStore, FsCache, MemoryCache};
pub use config::Config;
pub use diagnostics::{Diagnostic, WarningsFilter};
pub use error::{OptimizeError, TransformError};
pub use file_manager::FileManager;
pub use minify::{minify_fn, LightningCss, Minify, Minimizer, MinifyInput, MinifyOutput};
pub use optimizer::{OptimizeScheduler, PassReport};
