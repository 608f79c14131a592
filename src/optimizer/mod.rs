//! # Optimizer Module
//!
//! Modulo che separa le responsabilità del pass in sottomoduli:
//! - `scheduler`: Orchestratore principale (`OptimizeScheduler`)
//! - `task`: Elaborazione del singolo asset (cache, dispatch, store)
//! - `progress_tracker`: Statistiche, progress bar ed eventi JSON

pub mod progress_tracker;
pub mod scheduler;
pub mod task;

pub use progress_tracker::ProgressTracker;
pub use scheduler::{OptimizeScheduler, PassReport, TOOL_NAME};
pub use task::{AssetTask, TaskOptimizer, TaskOutcome};
