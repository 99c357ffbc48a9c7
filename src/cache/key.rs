//! Cache keys and configuration fingerprints.
//!
//! A key is the blake3 digest of (fingerprint, verb, raw pattern). The
//! fingerprint covers every resolver and security setting, so entries
//! written under one configuration are unreachable under another.

use std::fmt;

use crate::config::{ResolverSettings, SecuritySettings};

const FINGERPRINT_DOMAIN: &[u8] = b"route-dispatch.config.v1";
const KEY_DOMAIN: &[u8] = b"route-dispatch.key.v1";

/// Hex blake3 digest of the settings that influence a resolution.
pub fn config_fingerprint(resolver: &ResolverSettings, security: &SecuritySettings) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(FINGERPRINT_DOMAIN);
    // serde_json output is deterministic for structs and Vecs
    hasher.update(&serde_json::to_vec(resolver).unwrap_or_default());
    hasher.update(b"\0");
    hasher.update(&serde_json::to_vec(security).unwrap_or_default());
    hasher.finalize().to_hex().to_string()
}

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `verb` is compared case-insensitively; `raw` is taken verbatim.
    pub fn new(fingerprint: &str, raw: &str, verb: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(KEY_DOMAIN);
        for part in [fingerprint, verb.to_ascii_uppercase().as_str(), raw] {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
