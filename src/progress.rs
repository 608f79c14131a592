//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce la progress bar e le statistiche di un pass.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - Tracking statistiche (asset selezionati, cache hit, minificati, falliti)
//! - Calcolo byte risparmiati e percentuale di riduzione
//!
//! ## Statistiche tracciate:
//! - **assets_selected**: asset che passano il predicato di selezione
//! - **cache_hits**: risultati riusati dalla cache
//! - **dispatched**: task effettivamente eseguiti dal minimizer
//! - **minimized**: asset committati come `minimized`
//! - **failed**: asset lasciati invariati per un errore
//! - **total_bytes_saved** / **total_original_size**
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:02] [========================================] 42/42 (100%) main.css: 31.2% saved
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

use crate::file_manager::FileManager;

/// Manages the progress bar of one pass
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_assets: u64) -> Self {
        let bar = ProgressBar::new(total_assets);

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics tracker for one optimization pass
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizationStats {
    pub assets_selected: usize,
    pub cache_hits: usize,
    pub dispatched: usize,
    pub minimized: usize,
    pub failed: usize,
    pub total_bytes_saved: u64,
    pub total_original_size: u64,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_minimized(&mut self, original_size: u64, new_size: u64) {
        self.minimized += 1;
        self.total_original_size += original_size;
        self.total_bytes_saved += original_size.saturating_sub(new_size);
    }

    pub fn add_failed(&mut self) {
        self.failed += 1;
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(
            self.total_original_size,
            self.total_original_size - self.total_bytes_saved,
        )
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Selected: {} assets | Minimized: {} | From cache: {} | Errors: {} | Total saved: {} ({:.2}%)",
            self.assets_selected,
            self.minimized,
            self.cache_hits,
            self.failed,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = OptimizationStats::new();
        stats.assets_selected = 3;
        stats.add_minimized(1000, 600);
        stats.add_minimized(1000, 1200);
        stats.add_failed();

        assert_eq!(stats.minimized, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_bytes_saved, 400);
        assert!((stats.overall_reduction_percent() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_stats_summary() {
        let stats = OptimizationStats::new();
        assert_eq!(stats.overall_reduction_percent(), 0.0);
        assert!(stats.format_summary().contains("Errors: 0"));
    }
}
