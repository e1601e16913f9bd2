use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{BackendError, KeyValueBackend, Result};

/// In-process backend. Clones share the same map, so a test can keep one
/// handle to inspect what a store wrote through another.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes whose value is larger than `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn poisoned() -> BackendError {
        BackendError::Unavailable("memory backend lock poisoned".to_string())
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(BackendError::QuotaExceeded {
                    key: key.to_string(),
                    size: value.len(),
                });
            }
        }
        let mut map = self.entries.lock().map_err(|_| Self::poisoned())?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.entries.lock().map_err(|_| Self::poisoned())?;
        map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("k").unwrap(), None);

        backend.set("k", "v").unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("v"));

        backend.remove("k").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
        backend.remove("k").unwrap();
    }

    #[test]
    fn test_clones_share_entries() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        backend.set("shared", "1").unwrap();
        assert_eq!(other.get("shared").unwrap().as_deref(), Some("1"));
        assert_eq!(other.keys(), vec!["shared".to_string()]);
    }

    #[test]
    fn test_quota_rejects_large_values() {
        let backend = MemoryBackend::with_quota(4);
        backend.set("small", "1234").unwrap();
        let err = backend.set("big", "12345").unwrap_err();
        assert!(matches!(err, BackendError::QuotaExceeded { size: 5, .. }));
        assert_eq!(backend.get("big").unwrap(), None);
    }
}
