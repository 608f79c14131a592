//! Decoded, searchable form of a source map.

use serde_json::Value;

use super::vlq::{decode_segment, DecodeError};

/// Original location of a generated position.
///
/// `line` is 1-based, `column` 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct Original {
    source: usize,
    line: u32,
    column: u32,
    name: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Mapping {
    generated_line: u32,
    generated_column: u32,
    original: Option<Original>,
}

/// Source map with its mappings decoded and sorted by generated position.
#[derive(Debug, Clone)]
pub struct SourceMapIndex {
    sources: Vec<String>,
    names: Vec<String>,
    mappings: Vec<Mapping>,
}

impl SourceMapIndex {
    /// Decode a raw map. The caller is expected to have checked
    /// [`super::is_valid`] first; a structurally invalid map decodes to an
    /// index without sources.
    pub fn from_value(map: &Value) -> Result<Self, DecodeError> {
        let source_root = map
            .get("sourceRoot")
            .and_then(Value::as_str)
            .filter(|root| !root.is_empty());

        let sources: Vec<String> = map
            .get("sources")
            .and_then(Value::as_array)
            .map(|sources| {
                sources
                    .iter()
                    .map(|s| join_root(source_root, s.as_str().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();

        let names: Vec<String> = map
            .get("names")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .map(|n| n.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let raw = map.get("mappings").and_then(Value::as_str).unwrap_or_default();
        let mappings = parse_mappings(raw, sources.len(), names.len())?;

        Ok(Self {
            sources,
            names,
            mappings,
        })
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Greatest-lower-bound lookup on the generated line.
    ///
    /// Returns `None` when the line has no mapping at or before `column`, or
    /// when the closest mapping carries no original location.
    pub fn original_position_for(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        if line == 0 {
            return None;
        }

        let idx = self
            .mappings
            .partition_point(|m| (m.generated_line, m.generated_column) <= (line, column));
        let mapping = self.mappings.get(idx.checked_sub(1)?)?;
        if mapping.generated_line != line {
            return None;
        }

        let original = mapping.original?;
        Some(OriginalPosition {
            source: self.sources.get(original.source)?.clone(),
            line: original.line + 1,
            column: original.column,
            name: original.name.and_then(|n| self.names.get(n).cloned()),
        })
    }
}

fn join_root(root: Option<&str>, source: &str) -> String {
    match root {
        Some(root) if !source.contains("://") && !source.starts_with('/') => {
            if root.ends_with('/') {
                format!("{}{}", root, source)
            } else {
                format!("{}/{}", root, source)
            }
        }
        _ => source.to_string(),
    }
}

fn parse_mappings(raw: &str, source_count: usize, name_count: usize) -> Result<Vec<Mapping>, DecodeError> {
    let mut mappings = Vec::new();
    let (mut source, mut original_line, mut original_column, mut name) = (0i64, 0i64, 0i64, 0i64);

    for (line_idx, line) in raw.split(';').enumerate() {
        let generated_line = u32::try_from(line_idx + 1).map_err(|_| DecodeError::Overflow)?;
        let mut generated_column = 0i64;

        for segment in line.split(',').filter(|s| !s.is_empty()) {
            let fields = decode_segment(segment)?;
            generated_column += fields[0];

            let original = match fields.len() {
                1 => None,
                4 | 5 => {
                    source += fields[1];
                    original_line += fields[2];
                    original_column += fields[3];
                    let name_idx = if fields.len() == 5 {
                        name += fields[4];
                        Some(to_index(name, name_count)?)
                    } else {
                        None
                    };
                    Some(Original {
                        source: to_index(source, source_count)?,
                        line: to_u32(original_line)?,
                        column: to_u32(original_column)?,
                        name: name_idx,
                    })
                }
                n => return Err(DecodeError::SegmentLength(n)),
            };

            mappings.push(Mapping {
                generated_line,
                generated_column: to_u32(generated_column)?,
                original,
            });
        }
    }

    mappings.sort_by_key(|m| (m.generated_line, m.generated_column));
    Ok(mappings)
}

fn to_index(value: i64, len: usize) -> Result<usize, DecodeError> {
    usize::try_from(value)
        .ok()
        .filter(|&idx| idx < len)
        .ok_or(DecodeError::OutOfRange(value))
}

fn to_u32(value: i64) -> Result<u32, DecodeError> {
    u32::try_from(value).map_err(|_| DecodeError::OutOfRange(value))
}
