//! Text fingerprints and storage keys.
//!
//! A storage key has the shape `prefix:hash:vN`. The hash is a 32-bit
//! `h * 31 + unit` string hash over UTF-16 code units rendered in base 36.
//! It is stable across runs and platforms but it is not a cryptographic
//! digest; two different texts may collide.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespaced key of one persisted collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Build `prefix:hash:v{schema_version}` for a non-blank text.
    pub fn from_text(prefix: &str, text: &str, schema_version: u32) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        Some(Self(format!(
            "{}:{}:v{}",
            prefix,
            simple_hash(text),
            schema_version
        )))
    }

    /// Wrap an already-built key (e.g. one read back from a CLI argument).
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Non-cryptographic 32-bit string hash, base-36 encoded.
pub fn simple_hash(text: &str) -> String {
    let hash = text
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32));
    to_base36(hash as u32 as u64)
}

/// Lower-case base-36 rendering of an unsigned integer.
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
