//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare gli errori di un pass
//! - Definisce `TransformError`, l'errore serializzabile prodotto da un minifier
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Configuration`: opzioni malformate, interrompe il pass prima di iniziare
//! - `InvalidSourceMap`: source map presente ma non valida (diventa un warning)
//! - `Transform`: il minifier ha fallito per un singolo asset
//! - `CacheIo`: lettura/scrittura cache fallita (trattata come cache miss)
//! - `PoolFault`: worker terminato senza un errore strutturato
//!
//! Solo `Configuration` interrompe un intero pass; tutte le altre categorie
//! vengono accumulate come diagnostiche.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Custom error types for stylesheet optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0} contains invalid source map")]
    InvalidSourceMap(String),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Cache I/O error: {0}")]
    CacheIo(String),

    #[error("Worker pool fault: {0}")]
    PoolFault(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure reported by a minify stage.
///
/// Plain data so it can cross the worker boundary. `line` is 1-based and
/// `column` 0-based, matching source-map conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
            stack: None,
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{} ({}:{})", self.message, line, column),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransformError {}

impl From<OptimizeError> for TransformError {
    fn from(err: OptimizeError) -> Self {
        match err {
            OptimizeError::Transform(inner) => inner,
            other => TransformError::new(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_display() {
        let err = TransformError::new("Unexpected token").at(3, 7);
        assert_eq!(err.to_string(), "Unexpected token (3:7)");
        assert_eq!(TransformError::new("boom").to_string(), "boom");
    }

    #[test]
    fn test_transform_error_serializes_without_empty_fields() {
        let json = serde_json::to_string(&TransformError::new("boom")).unwrap();
        assert_eq!(json, r#"{"message":"boom"}"#);

        let back: TransformError =
            serde_json::from_str(r#"{"message":"x","line":2,"column":4,"stack":"s"}"#).unwrap();
        assert_eq!(back.line, Some(2));
        assert_eq!(back.stack.as_deref(), Some("s"));
    }

    #[test]
    fn test_optimize_error_unwraps_to_transform_error() {
        let err: TransformError = OptimizeError::PoolFault("worker died".into()).into();
        assert_eq!(err.message, "Worker pool fault: worker died");
        assert!(err.line.is_none());
    }
}
