//! # Minify Module
//!
//! Astrazione del minifier "pluggable".
//!
//! ## Responsabilità:
//! - `Minify`: trait di un singolo stage di trasformazione (funzione pura)
//! - `Minimizer`: sequenza ordinata di stage; il caso "una funzione" è una
//!   sequenza di un solo elemento
//! - `MinifyInput` / `MinifyOutput`: dati semplici serializzabili, gli unici che
//!   attraversano il confine dei worker
//! - `LightningCss`: minifier di riferimento usato di default
//!
//! ## Policy multi-stage:
//! - l'output (codice + map) di ogni stage è l'input del successivo
//! - uno stage che restituisce `None` è un passthrough
//! - i warning di tutti gli stage si concatenano nell'ordine degli stage
//! - il primo stage che fallisce interrompe i successivi

mod lightning;

pub use lightning::LightningCss;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::{OptimizeError, TransformError};

/// Plain-data input of one minification task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinifyInput {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub input_source_map: Option<Value>,
    /// Whether an output map is wanted
    #[serde(default)]
    pub source_map: bool,
    /// `minimizerOptions`, passed through verbatim
    #[serde(default)]
    pub options: Value,
}

/// Plain-data result of one minification task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinifyOutput {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Value>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// One transform stage.
///
/// `Ok(None)` means "nothing to do" and lets the input flow to the next stage.
pub trait Minify: Send + Sync {
    /// Stable identifier, part of the cache fingerprint.
    fn name(&self) -> &str;

    fn minify(&self, input: &MinifyInput) -> Result<Option<MinifyOutput>, TransformError>;
}

/// Adapter turning a closure into a [`Minify`] stage.
pub struct FnMinify<F> {
    name: String,
    func: F,
}

impl<F> Minify for FnMinify<F>
where
    F: Fn(&MinifyInput) -> Result<Option<MinifyOutput>, TransformError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn minify(&self, input: &MinifyInput) -> Result<Option<MinifyOutput>, TransformError> {
        (self.func)(input)
    }
}

/// Wrap a closure as a stage.
pub fn minify_fn<F>(name: impl Into<String>, func: F) -> Arc<dyn Minify>
where
    F: Fn(&MinifyInput) -> Result<Option<MinifyOutput>, TransformError> + Send + Sync + 'static,
{
    Arc::new(FnMinify {
        name: name.into(),
        func,
    })
}

/// Ordered sequence of transform stages
#[derive(Clone)]
pub struct Minimizer {
    stages: Vec<Arc<dyn Minify>>,
}

impl fmt::Debug for Minimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Minimizer")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Default for Minimizer {
    fn default() -> Self {
        Self::single(Arc::new(LightningCss))
    }
}

impl Minimizer {
    pub fn new(stages: Vec<Arc<dyn Minify>>) -> Result<Self, OptimizeError> {
        if stages.is_empty() {
            return Err(OptimizeError::Configuration(
                "minify must contain at least one function".to_string(),
            ));
        }
        Ok(Self { stages })
    }

    pub fn single(stage: Arc<dyn Minify>) -> Self {
        Self { stages: vec![stage] }
    }

    pub fn then(mut self, stage: Arc<dyn Minify>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order. The output map is dropped unless
    /// `input.source_map` is set.
    pub fn run(&self, input: MinifyInput) -> Result<MinifyOutput, TransformError> {
        let mut current = input;
        let mut warnings = Vec::new();

        for stage in &self.stages {
            if let Some(output) = stage.minify(&current)? {
                current.code = output.code;
                current.input_source_map = output.map;
                warnings.extend(output.warnings);
            }
        }

        Ok(MinifyOutput {
            code: current.code,
            map: if current.source_map {
                current.input_source_map
            } else {
                None
            },
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn input(code: &str) -> MinifyInput {
        MinifyInput {
            name: "foo.css".into(),
            code: code.into(),
            input_source_map: Some(json!({"version": 3, "sources": ["foo.scss"], "mappings": "AAAA"})),
            source_map: true,
            options: json!({}),
        }
    }

    fn append(suffix: &'static str) -> Arc<dyn Minify> {
        minify_fn(format!("append{}", suffix), move |input| {
            Ok(Some(MinifyOutput {
                code: format!("{}\n.{}{{color: red;}}", input.code, suffix),
                map: input.input_source_map.clone(),
                warnings: vec![format!("warning from {}", suffix)],
            }))
        })
    }

    #[test]
    fn test_stages_chain_in_order() {
        let minimizer = Minimizer::new(vec![append("one"), append("two"), append("three")]).unwrap();
        let output = minimizer.run(input("a{}")).unwrap();

        assert_eq!(
            output.code,
            "a{}\n.one{color: red;}\n.two{color: red;}\n.three{color: red;}"
        );
        assert_eq!(
            output.warnings,
            vec!["warning from one", "warning from two", "warning from three"]
        );
        assert!(output.map.is_some());
    }

    #[test]
    fn test_none_is_passthrough() {
        let noop = minify_fn("noop", |_| Ok(None));
        let minimizer = Minimizer::single(noop).then(append("one"));
        let output = minimizer.run(input("a{}")).unwrap();
        assert_eq!(output.code, "a{}\n.one{color: red;}");
    }

    #[test]
    fn test_first_failure_aborts_remaining_stages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let after = minify_fn("after", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        });
        let failing = minify_fn("failing", |_| Err(TransformError::new("nope").at(1, 2)));

        let minimizer = Minimizer::new(vec![append("one"), failing, after]).unwrap();
        let err = minimizer.run(input("a{}")).unwrap_err();

        assert_eq!(err.message, "nope");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_map_dropped_without_source_map_option() {
        let minimizer = Minimizer::single(append("one"));
        let mut no_maps = input("a{}");
        no_maps.source_map = false;
        assert!(minimizer.run(no_maps).unwrap().map.is_none());
    }

    #[test]
    fn test_empty_sequence_is_configuration_error() {
        assert!(matches!(Minimizer::new(vec![]), Err(OptimizeError::Configuration(_))));
    }

    #[test]
    fn test_default_is_lightningcss() {
        assert_eq!(Minimizer::default().stage_names(), vec!["lightningcss"]);
    }
}
