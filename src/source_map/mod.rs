//! # Source Map Module
//!
//! Validazione e decodifica delle source map (formato v3).
//!
//! ## Responsabilità:
//! - `is_valid()`: controllo strutturale (version, sources, mappings)
//! - `SourceMapIndex`: mappings decodificati, lookup generated → original
//! - `LazyIndex`: costruisce l'indice al massimo una volta per asset, riusato
//!   sia per gli errori che per i warning dello stesso asset
//!
//! Nessuna operazione di questo modulo fallisce verso il chiamante: una map
//! malformata produce semplicemente nessuna posizione originale.

mod index;
mod vlq;

pub use index::{OriginalPosition, SourceMapIndex};
pub use vlq::DecodeError;

use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// A map is usable iff it has a truthy `version`, an array `sources`
/// (possibly empty) and a string `mappings`.
pub fn is_valid(map: &Value) -> bool {
    let has_version = match map.get("version") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    };

    has_version
        && map.get("sources").is_some_and(Value::is_array)
        && map.get("mappings").is_some_and(Value::is_string)
}

/// Resolve a generated position, or `None` if the map is invalid, its
/// mappings are malformed, or the position is unmapped.
pub fn resolve(map: &Value, line: u32, column: u32) -> Option<OriginalPosition> {
    if !is_valid(map) {
        return None;
    }
    SourceMapIndex::from_value(map)
        .ok()?
        .original_position_for(line, column)
}

/// Memoized index over one asset's input map.
pub struct LazyIndex<'a> {
    map: Option<&'a Value>,
    index: OnceLock<Option<SourceMapIndex>>,
}

impl<'a> LazyIndex<'a> {
    pub fn new(map: Option<&'a Value>) -> Self {
        Self {
            map,
            index: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Option<&SourceMapIndex> {
        self.index
            .get_or_init(|| {
                let map = self.map.filter(|m| is_valid(m))?;
                match SourceMapIndex::from_value(map) {
                    Ok(index) => Some(index),
                    Err(e) => {
                        debug!("Ignoring undecodable source map: {}", e);
                        None
                    }
                }
            })
            .as_ref()
    }
}
