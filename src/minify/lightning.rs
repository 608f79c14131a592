//! Reference minifier backed by lightningcss.

use lightningcss::error::{Error, ErrorLocation};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use parcel_sourcemap::SourceMap;
use serde_json::Value;
use std::fmt::Display;
use std::sync::{Arc, RwLock};
use tracing::warn;

use super::{Minify, MinifyInput, MinifyOutput};
use crate::error::TransformError;

/// Parses with error recovery, minifies, prints minified CSS.
///
/// Recovered parse problems become warnings shaped `"<message> <file>:<line>:<column>"`.
/// With `input.source_map` set, an output map is generated and chained onto
/// the input map so it points at the original sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightningCss;

impl Minify for LightningCss {
    fn name(&self) -> &str {
        "lightningcss"
    }

    fn minify(&self, input: &MinifyInput) -> Result<Option<MinifyOutput>, TransformError> {
        let error_recovery = input
            .options
            .get("errorRecovery")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let warnings = Arc::new(RwLock::new(Vec::new()));
        let options = ParserOptions {
            filename: input.name.clone(),
            error_recovery,
            warnings: Some(warnings.clone()),
            ..ParserOptions::default()
        };

        let mut stylesheet =
            StyleSheet::parse(&input.code, options).map_err(|e| to_transform_error(&e))?;
        stylesheet
            .minify(MinifyOptions::default())
            .map_err(|e| to_transform_error(&e))?;
        let mut output_map = if input.source_map {
            Some(new_source_map(input)?)
        } else {
            None
        };
        let result = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                source_map: output_map.as_mut(),
                ..PrinterOptions::default()
            })
            .map_err(|e| to_transform_error(&e))?;
        let map = match output_map {
            Some(map) => Some(finish_source_map(map, input.input_source_map.as_ref())?),
            None => None,
        };

        let warnings = warnings
            .read()
            .map(|list| list.iter().map(format_warning).collect())
            .unwrap_or_default();

        Ok(Some(MinifyOutput {
            code: result.code,
            map,
            warnings,
        }))
    }
}

fn new_source_map(input: &MinifyInput) -> Result<SourceMap, TransformError> {
    let mut map = SourceMap::new("/");
    let source = map.add_source(&input.name);
    map.set_source_content(source as usize, &input.code)
        .map_err(|e| TransformError::new(format!("Source map error: {}", e)))?;
    Ok(map)
}

/// Chain onto the input map when it parses. An unusable input map was
/// already reported; the output then points at the asset itself.
fn finish_source_map(mut map: SourceMap, input_map: Option<&Value>) -> Result<Value, TransformError> {
    let original = input_map
        .and_then(|value| serde_json::to_string(value).ok())
        .and_then(|json| SourceMap::from_json("/", &json).ok());
    if let Some(mut original) = original {
        if let Err(e) = map.extends(&mut original) {
            warn!("Could not chain input source map: {}", e);
        }
    }

    let json = map
        .to_json(None)
        .map_err(|e| TransformError::new(format!("Source map error: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| TransformError::new(format!("Source map error: {}", e)))
}

/// lightningcss lines are 0-based and columns 1-based.
fn position(loc: &ErrorLocation) -> (u32, u32) {
    (loc.line + 1, loc.column.saturating_sub(1))
}

fn to_transform_error<T: Display>(err: &Error<T>) -> TransformError {
    let error = TransformError::new(err.kind.to_string());
    match err.loc.as_ref() {
        Some(loc) => {
            let (line, column) = position(loc);
            error.at(line, column)
        }
        None => error,
    }
}

fn format_warning<T: Display>(warning: &Error<T>) -> String {
    match warning.loc.as_ref() {
        Some(loc) => {
            let (line, column) = position(loc);
            format!("{} {}:{}:{}", warning.kind, loc.filename, line, column)
        }
        None => warning.kind.to_string(),
    }
}
