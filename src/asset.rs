//! # Asset Module
//!
//! Boundary con l'asset graph del build system ospite.
//!
//! ## Responsabilità:
//! - `Asset`: nome, contenuto, source map incorporata, metadata
//! - `AssetInfo`: metadata con il flag `minimized` + chiavi arbitrarie preservate
//! - `AssetGraph`: trait con enumerate / get / commit / report
//! - `AssetSet`: implementazione in-memory usata dalla CLI e dai test
//!
//! Lo scheduler non modifica mai il graph se non tramite `commit()`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Asset metadata; unknown keys survive a commit untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    #[serde(default)]
    pub minimized: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AssetInfo {
    pub fn minimized() -> Self {
        Self {
            minimized: true,
            extra: BTreeMap::new(),
        }
    }

    /// Merge `update` into `self`, keeping keys `update` does not mention.
    pub fn merge(&mut self, update: AssetInfo) {
        self.minimized |= update.minimized;
        self.extra.extend(update.extra);
    }
}

/// A named stylesheet participating in the build
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub name: String,
    pub content: String,
    pub source_map: Option<Value>,
    pub info: AssetInfo,
}

impl Asset {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            source_map: None,
            info: AssetInfo::default(),
        }
    }

    pub fn with_source_map(mut self, map: Value) -> Self {
        self.source_map = Some(map);
        self
    }

    pub fn with_info(mut self, info: AssetInfo) -> Self {
        self.info = info;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Host asset graph as seen by one optimization pass.
pub trait AssetGraph {
    /// Names of every asset currently in the graph.
    fn names(&self) -> Vec<String>;

    fn get(&self, name: &str) -> Option<&Asset>;

    /// Replace content and map of `name`, merging `info` into its metadata.
    fn commit(&mut self, name: &str, content: String, source_map: Option<Value>, info: AssetInfo);

    /// Append-only diagnostics sink.
    fn report(&mut self, severity: Severity, message: String);
}

/// In-memory asset graph
#[derive(Debug, Default)]
pub struct AssetSet {
    assets: BTreeMap<String, Asset>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: Asset) {
        self.assets.insert(asset.name.clone(), asset);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl FromIterator<Asset> for AssetSet {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        let mut set = AssetSet::new();
        for asset in iter {
            set.insert(asset);
        }
        set
    }
}

impl AssetGraph for AssetSet {
    fn names(&self) -> Vec<String> {
        self.assets.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<&Asset> {
        self.assets.get(name)
    }

    fn commit(&mut self, name: &str, content: String, source_map: Option<Value>, info: AssetInfo) {
        let asset = self
            .assets
            .entry(name.to_string())
            .or_insert_with(|| Asset::new(name, String::new()));
        asset.content = content;
        asset.source_map = source_map;
        asset.info.merge(info);
    }

    fn report(&mut self, severity: Severity, message: String) {
        match severity {
            Severity::Error => self.errors.push(message),
            Severity::Warning => self.warnings.push(message),
        }
    }
}
