use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Content-addressed fingerprint of one asset under one minimizer setup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key from the asset name, its content and the serialized
    /// minimizer configuration.
    ///
    /// Parts are length-prefixed so distinct inputs never concatenate to the
    /// same byte stream.
    pub fn new(name: &str, content: &[u8], fingerprint: &str) -> Self {
        let content_hash = hex::encode(Sha256::digest(content));

        let mut hasher = Sha256::new();
        for part in [name.as_bytes(), content_hash.as_bytes(), fingerprint.as_bytes()] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form for logs
        write!(f, "{}", &self.0[..16])
    }
}

/// Result of a successful minification, as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Value>,
    /// Raw warnings, filtered again on every pass
    #[serde(default)]
    pub warnings: Vec<String>,
}
