//! # Diagnostics Module
//!
//! Formattazione di errori e warning del minifier.
//!
//! ## Responsabilità:
//! - `build_error()`: errore di trasformazione → `Diagnostic` con posizione
//!   originale se la source map la risolve
//! - `build_warning()`: warning grezzo → `Diagnostic`, sostituendo il suffisso
//!   `line:column` con `file:line:column` originale quando risolvibile
//! - applica il `warningsFilter` fornito dal chiamante
//!
//! La formattazione non fallisce mai: senza informazioni di posizione si
//! degrada alla forma meno dettagliata del messaggio.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::asset::Severity;
use crate::error::{OptimizeError, TransformError};
use crate::source_map::SourceMapIndex;

const PLUGIN: &str = "css-minimizer";

/// Caller-supplied predicate `(raw_warning, asset_name, resolved_source) -> keep`.
pub type WarningsFilter = Arc<dyn Fn(&str, &str, Option<&str>) -> bool + Send + Sync>;

/// Default filter: keep everything.
pub fn accept_all() -> WarningsFilter {
    Arc::new(|_, _, _| true)
}

fn warning_location() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\s(?:\S*:+)?([0-9]+):+([0-9]+)").expect("warning location pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub source: String,
    pub line: u32,
    pub column: u32,
}

/// A reported error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            origin: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            origin: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Builds diagnostics for one pass
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsBuilder {
    context: Option<PathBuf>,
}

impl DiagnosticsBuilder {
    pub fn new(context: Option<PathBuf>) -> Self {
        Self { context }
    }

    /// Make `source` relative to the context directory when it lives under it.
    pub fn shorten(&self, source: &str) -> String {
        let Some(context) = self.context.as_ref() else {
            return source.to_string();
        };
        let context = context.to_string_lossy();
        let context = context.trim_end_matches('/');

        match source.strip_prefix(context) {
            Some(rest) if rest.starts_with('/') => format!(".{}", rest),
            _ => source.to_string(),
        }
    }

    pub fn invalid_source_map(&self, name: &str) -> Diagnostic {
        Diagnostic::warning(OptimizeError::InvalidSourceMap(name.to_string()).to_string())
    }

    pub fn build_error(
        &self,
        error: &TransformError,
        name: &str,
        index: Option<&SourceMapIndex>,
    ) -> Diagnostic {
        let stack_tail = error
            .stack
            .as_deref()
            .map(|stack| stack.lines().skip(1).collect::<Vec<_>>().join("\n"))
            .filter(|tail| !tail.is_empty())
            .map(|tail| format!("\n{}", tail))
            .unwrap_or_default();

        if let (Some(line), Some(column)) = (error.line, error.column) {
            let original = index.and_then(|idx| idx.original_position_for(line, column));

            if let Some(original) = original {
                let source = self.shorten(&original.source);
                let message = format!(
                    "{} from {}\n{} [{}:{},{}][{}:{},{}]{}",
                    name,
                    PLUGIN,
                    error.message,
                    source,
                    original.line,
                    original.column,
                    name,
                    line,
                    column,
                    stack_tail
                );
                return Diagnostic {
                    severity: Severity::Error,
                    message,
                    origin: Some(Origin {
                        source: original.source,
                        line: original.line,
                        column: original.column,
                    }),
                };
            }

            return Diagnostic::error(format!(
                "{} from {}\n{} [{}:{},{}]{}",
                name, PLUGIN, error.message, name, line, column, stack_tail
            ));
        }

        if let Some(stack) = error.stack.as_deref() {
            return Diagnostic::error(format!("{} from {}\n{}", name, PLUGIN, stack));
        }

        Diagnostic::error(format!("{} from {}\n{}", name, PLUGIN, error.message))
    }

    /// `None` when the filter rejects the warning.
    pub fn build_warning(
        &self,
        warning: &str,
        name: &str,
        index: Option<&SourceMapIndex>,
        filter: &WarningsFilter,
    ) -> Option<Diagnostic> {
        let mut message = warning.to_string();
        let mut origin = None;

        if let Some(index) = index {
            if let Some(caps) = warning_location().captures(warning) {
                let line = caps[1].parse::<u32>().ok();
                let column = caps[2].parse::<u32>().ok();
                let original = line
                    .zip(column)
                    .and_then(|(line, column)| index.original_position_for(line, column));

                if let Some(original) = original.filter(|o| o.source != name) {
                    message = warning_location().replace(warning, "").into_owned();
                    origin = Some(Origin {
                        source: original.source,
                        line: original.line,
                        column: original.column,
                    });
                }
            }
        }

        let resolved_source = origin.as_ref().map(|o| o.source.as_str());
        if !filter(warning, name, resolved_source) {
            return None;
        }

        let location = origin
            .as_ref()
            .map(|o| format!(" {}:{}:{}", self.shorten(&o.source), o.line, o.column))
            .unwrap_or_default();

        Some(Diagnostic {
            severity: Severity::Warning,
            message: format!("{}: {}{}", PLUGIN, message, location),
            origin,
        })
    }
}
