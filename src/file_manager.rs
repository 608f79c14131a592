//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file per la CLI.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva degli asset testuali in una directory di output
//! - Caricamento di ogni file come `Asset`, con la `.map` adiacente come
//!   source map incorporata
//! - Scrittura sicura degli asset committati (temp file + rename)
//! - Utilità per calcoli dimensioni e percentuali
//!
//! ## Naming:
//! - il nome di un asset è il path relativo alla directory, con separatori `/`
//! - `foo.css.map` viene associato a `foo.css` e non diventa un asset
//!
//! ## Esempio:
//! ```no_run
//! use css_minimizer::file_manager::FileManager;
//!
//! let assets = FileManager::load_assets(std::path::Path::new("dist")).unwrap();
//! println!("{} assets", assets.len());
//! ```

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::asset::{Asset, AssetGraph, AssetSet};

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find every regular file below `dir` that is not a source map
    pub fn find_asset_files(dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| !Self::is_source_map(p))
            .collect()
    }

    pub fn is_source_map(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("map"))
            .unwrap_or(false)
    }

    /// Asset name of `path` relative to `dir`
    pub fn asset_name(dir: &Path, path: &Path) -> String {
        let relative = path.strip_prefix(dir).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Load every UTF-8 file below `dir` as an asset
    pub fn load_assets(dir: &Path) -> Result<AssetSet> {
        let mut assets = AssetSet::new();

        for path in Self::find_asset_files(dir) {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let Ok(content) = String::from_utf8(bytes) else {
                debug!("Skipping non-text file: {}", path.display());
                continue;
            };

            let name = Self::asset_name(dir, &path);
            let mut asset = Asset::new(name, content);
            if let Some(map) = Self::load_source_map(&path)? {
                asset = asset.with_source_map(map);
            }
            assets.insert(asset);
        }

        Ok(assets)
    }

    /// Read `<path>.map`; unparsable maps are kept as raw strings so they
    /// still flow through as present-but-invalid.
    fn load_source_map(path: &Path) -> Result<Option<Value>> {
        let map_path = Self::map_path(path);
        if !map_path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&map_path)
            .with_context(|| format!("Failed to read {}", map_path.display()))?;
        Ok(Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw))))
    }

    fn map_path(path: &Path) -> PathBuf {
        let mut map_path = path.as_os_str().to_owned();
        map_path.push(".map");
        PathBuf::from(map_path)
    }

    /// Write the named assets (and their maps) back under `dir`
    pub fn write_assets(dir: &Path, assets: &AssetSet, names: &[String]) -> Result<()> {
        for name in names {
            let Some(asset) = assets.get(name) else {
                warn!("Committed asset {} disappeared before writing", name);
                continue;
            };

            let path = dir.join(name);
            Self::replace_file(&path, asset.content.as_bytes())?;

            let map_path = Self::map_path(&path);
            match &asset.source_map {
                Some(map) => Self::replace_file(&map_path, serde_json::to_string(map)?.as_bytes())?,
                None if map_path.exists() => {
                    std::fs::remove_file(&map_path)
                        .with_context(|| format!("Failed to remove stale {}", map_path.display()))?;
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Atomically replace `path` with `content`
    pub fn replace_file(path: &Path, content: &[u8]) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content)?;
        tmp.persist(path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetInfo;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_load_assets_attaches_maps() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("css")).unwrap();
        std::fs::write(root.join("css/main.css"), "a { color: red }").unwrap();
        std::fs::write(
            root.join("css/main.css.map"),
            r#"{"version":3,"sources":["main.scss"],"mappings":"AAAA"}"#,
        )
        .unwrap();
        std::fs::write(root.join("broken.css"), "b{}").unwrap();
        std::fs::write(root.join("broken.css.map"), "{ nope").unwrap();
        std::fs::write(root.join("logo.png"), [0xff, 0xd8, 0xff, 0x00]).unwrap();

        let assets = FileManager::load_assets(root).unwrap();
        assert_eq!(assets.names(), vec!["broken.css", "css/main.css"]);

        let main = assets.get("css/main.css").unwrap();
        assert_eq!(main.source_map.as_ref().unwrap()["sources"], json!(["main.scss"]));

        let broken = assets.get("broken.css").unwrap();
        assert_eq!(broken.source_map, Some(Value::String("{ nope".into())));
    }

    #[test]
    fn test_write_assets_replaces_content_and_maps() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("a.css"), "a { color: red }").unwrap();
        std::fs::write(root.join("a.css.map"), "{}").unwrap();

        let mut assets = FileManager::load_assets(root).unwrap();
        assets.commit("a.css", "a{color:red}".into(), None, AssetInfo::minimized());
        FileManager::write_assets(root, &assets, &["a.css".to_string()]).unwrap();

        assert_eq!(std::fs::read_to_string(root.join("a.css")).unwrap(), "a{color:red}");
        assert!(!root.join("a.css.map").exists());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(FileManager::calculate_reduction(0, 10), 0.0);
        assert_eq!(FileManager::calculate_reduction(200, 50), 75.0);
    }
}
