//! # CSS Minimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (file JSON + override da CLI)
//! - Esecuzione di un pass di ottimizzazione sulla directory
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica la directory come asset graph (CSS + `.map` adiacenti)
//! 4. Esegue il pass e riscrive gli asset minificati (salvo `--dry-run`)
//! 5. Stampa diagnostiche e riepilogo; exit code 1 se ci sono errori
//!
//! ## Esempio di utilizzo:
//! ```bash
//! css-minimizer dist --exclude vendor/ --parallel 4 --source-map --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use css_minimizer::config::{Parallel, SourceMapOption};
use css_minimizer::json_output::JsonMessage;
use css_minimizer::{Config, FileManager, FsCache, OptimizeScheduler};

#[derive(Parser)]
#[command(name = "css-minimizer")]
#[command(about = "Minify the stylesheets of a build output directory")]
struct Args {
    /// Directory containing the assets to minimize
    directory: PathBuf,

    /// JSON configuration file (camelCase keys)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pattern asset names must match, `/regex/flags` or a path prefix (repeatable)
    #[arg(long)]
    test: Vec<String>,

    /// Additional pattern asset names must match (repeatable)
    #[arg(long)]
    include: Vec<String>,

    /// Pattern excluding matching assets (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Maximum number of workers (0 = minify inline)
    #[arg(short, long)]
    parallel: Option<usize>,

    /// Disable the result cache
    #[arg(long)]
    no_cache: bool,

    /// Persist the cache in this directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Generate and propagate source maps
    #[arg(long)]
    source_map: bool,

    /// Dry run - don't write minimized files
    #[arg(long)]
    dry_run: bool,

    /// Output progress and diagnostics as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command line flags win over the configuration file.
    fn apply(&self, config: &mut Config) {
        if !self.test.is_empty() {
            config.test = Some(self.test.clone().into());
        }
        if !self.include.is_empty() {
            config.include = Some(self.include.clone().into());
        }
        if !self.exclude.is_empty() {
            config.exclude = Some(self.exclude.clone().into());
        }
        if let Some(workers) = self.parallel {
            config.parallel = Parallel::Workers(workers);
        }
        if self.no_cache {
            config.cache = false;
        }
        if let Some(ref dir) = self.cache_dir {
            config.cache_directory = Some(dir.clone());
        }
        if self.source_map {
            config.source_map = SourceMapOption::Flag(true);
        }
        config.dry_run |= self.dry_run;
        config.json_output |= self.json;
        config.show_progress = !config.json_output;
        if config.context.is_none() {
            config.context = Some(self.directory.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for JSON events in --json mode
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    if !args.directory.is_dir() {
        return Err(anyhow::anyhow!("Directory does not exist: {}", args.directory.display()));
    }

    let mut config = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    args.apply(&mut config);
    if config.cache && config.cache_directory.is_none() {
        // the CLI runs one pass per process, so only a persisted cache helps
        config.cache_directory = FsCache::default_location().ok().map(|cache| cache.dir().to_path_buf());
    }

    let mut assets = FileManager::load_assets(&args.directory)?;
    info!("Loaded {} assets from {}", assets.len(), args.directory.display());

    let scheduler = OptimizeScheduler::new(config.clone());
    let report = match scheduler.optimize(&mut assets).await {
        Ok(report) => report,
        Err(e) => {
            if config.json_output {
                JsonMessage::error("Optimization pass aborted".to_string(), Some(e.to_string())).emit();
            }
            return Err(e.into());
        }
    };

    if config.dry_run {
        info!("Dry run mode: {} assets not written", report.committed.len());
    } else {
        FileManager::write_assets(&args.directory, &assets, &report.committed)?;
    }

    if !config.json_output {
        for diagnostic in report.warnings.iter().chain(&report.errors) {
            eprintln!("{}\n", diagnostic);
        }
        println!("{}", report.stats.format_summary());
    }

    Ok(if report.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
