//! File-per-key backend.
//!
//! Directory layout:
//! ```text
//! {data_dir}/kv/
//! └── {percent-encoded key}.json
//! ```
//! Writes go to a `.tmp` sibling first and are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use super::{KeyValueBackend, Result};

pub struct FileBackend {
    base_path: PathBuf,
}

impl FileBackend {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_path: data_dir.into().join("kv"),
        }
    }

    /// Default data directory (e.g. ~/.local/share/lectura)
    pub fn default_data_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("lectura"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Initialize the storage directory
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.init()?;
        let path = self.entry_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
