//! # Progress Tracking Module
//!
//! Unifica statistiche, progress bar e eventi JSON di un pass.
//! Lo scheduler lo aggiorna dal solo task coordinatore, in ordine di
//! completamento.

use crate::{
    config::Config,
    diagnostics::Diagnostic,
    json_output::JsonMessage,
    progress::{OptimizationStats, ProgressManager},
};

/// Tracker dei risultati per asset
pub struct ProgressTracker {
    stats: OptimizationStats,
    progress_manager: Option<ProgressManager>,
    json_output: bool,
}

impl ProgressTracker {
    pub fn new(selected: usize, config: &Config) -> Self {
        let stats = OptimizationStats {
            assets_selected: selected,
            ..OptimizationStats::default()
        };
        let progress_manager = (config.show_progress && !config.json_output && selected > 0)
            .then(|| ProgressManager::new(selected as u64));

        Self {
            stats,
            progress_manager,
            json_output: config.json_output,
        }
    }

    pub fn set_dispatched(&mut self, dispatched: usize) {
        self.stats.dispatched = dispatched;
    }

    /// Asset committato con il risultato in cache
    pub fn record_cache_hit(&mut self, name: &str, original_size: u64, minimized_size: u64) {
        self.stats.cache_hits += 1;
        self.stats.add_minimized(original_size, minimized_size);
        self.asset_done(
            JsonMessage::asset_minimized(name, original_size, minimized_size, true),
            format!("[CACHE] {}", name),
        );
    }

    /// Asset appena minificato e committato
    pub fn record_minimized(&mut self, name: &str, original_size: u64, minimized_size: u64) {
        self.stats.add_minimized(original_size, minimized_size);
        let reduction = crate::file_manager::FileManager::calculate_reduction(original_size, minimized_size);
        self.asset_done(
            JsonMessage::asset_minimized(name, original_size, minimized_size, false),
            format!("[OK] {}: {:.1}% saved", name, reduction),
        );
    }

    pub fn record_failed(&mut self, name: &str, original_size: u64, error: &str) {
        self.stats.add_failed();
        self.asset_done(
            JsonMessage::asset_failed(name, original_size, error.to_string()),
            format!("[ERROR] {}", name),
        );
    }

    pub fn record_diagnostic(&self, diagnostic: &Diagnostic) {
        if self.json_output {
            JsonMessage::diagnostic(diagnostic).emit();
        }
    }

    fn asset_done(&self, event: JsonMessage, message: String) {
        if self.json_output {
            event.emit();
        }
        if let Some(bar) = &self.progress_manager {
            bar.update(&message);
        }
    }

    /// Chiude la progress bar e restituisce le statistiche finali
    pub fn finish(self) -> OptimizationStats {
        if let Some(bar) = &self.progress_manager {
            bar.finish(&self.stats.format_summary());
        }
        self.stats
    }
}
