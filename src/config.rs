//! Runtime configuration.
//!
//! ```toml
//! [storage]
//! data_dir = "/path"
//! debounce_ms = 120
//! schema_version = 1
//!
//! [annotations]
//! prefix = "annotations"
//!
//! [study_items]
//! prefix = "studyitems"
//! ```
//! Every field is optional; a missing file yields the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotations::ANNOTATIONS_PREFIX;
use crate::backend::FileBackend;
use crate::spaced::STUDY_ITEMS_PREFIX;
use crate::store::{StoreConfig, DEFAULT_DEBOUNCE, SCHEMA_VERSION};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No data directory available")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub data_dir: Option<PathBuf>,
    pub debounce_ms: u64,
    pub schema_version: u32,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: None,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            schema_version: SCHEMA_VERSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationsSection {
    pub prefix: String,
}

impl Default for AnnotationsSection {
    fn default() -> Self {
        Self {
            prefix: ANNOTATIONS_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyItemsSection {
    pub prefix: String,
}

impl Default for StudyItemsSection {
    fn default() -> Self {
        Self {
            prefix: STUDY_ITEMS_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LecturaConfig {
    pub storage: StorageSection,
    pub annotations: AnnotationsSection,
    pub study_items: StudyItemsSection,
}

impl LecturaConfig {
    /// Parse a TOML document, filling missing fields with defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from `path`. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => {
                log::debug!("Loaded config from {:?}", path);
                Self::from_toml_str(&data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Default config location (e.g. ~/.config/lectura/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lectura").join("config.toml"))
    }

    /// Configured data directory, or the platform default.
    pub fn data_dir(&self) -> Result<PathBuf> {
        self.storage
            .data_dir
            .clone()
            .or_else(FileBackend::default_data_dir)
            .ok_or(ConfigError::NoDataDir)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.storage.debounce_ms)
    }

    pub fn annotation_store_config(&self) -> StoreConfig {
        self.store_config(&self.annotations.prefix)
    }

    pub fn study_store_config(&self) -> StoreConfig {
        self.store_config(&self.study_items.prefix)
    }

    fn store_config(&self, prefix: &str) -> StoreConfig {
        StoreConfig::new(prefix)
            .with_debounce(self.debounce())
            .with_schema_version(self.storage.schema_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = LecturaConfig::from_toml_str("").unwrap();
        assert_eq!(config, LecturaConfig::default());
        assert_eq!(config.annotation_store_config(), StoreConfig::new("annotations"));
        assert_eq!(config.study_store_config(), StoreConfig::new("studyitems"));
    }

    #[test]
    fn test_partial_document() {
        let config = LecturaConfig::from_toml_str(
            r#"
            [storage]
            data_dir = "/tmp/lectura"
            debounce_ms = 5

            [study_items]
            prefix = "srs"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/lectura"));
        assert_eq!(config.storage.schema_version, SCHEMA_VERSION);
        assert_eq!(config.annotations.prefix, "annotations");

        let study = config.study_store_config();
        assert_eq!(study.prefix, "srs");
        assert_eq!(study.debounce, Duration::from_millis(5));
    }

    #[test]
    fn test_empty_section_keeps_its_prefix() {
        let config = LecturaConfig::from_toml_str("[annotations]\n[study_items]\n").unwrap();
        assert_eq!(config.annotations.prefix, ANNOTATIONS_PREFIX);
        assert_eq!(config.study_items.prefix, STUDY_ITEMS_PREFIX);
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = LecturaConfig::load(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config, LecturaConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[storage]\nschema_version = 2\n").unwrap();
        let config = LecturaConfig::load(&path).unwrap();
        assert_eq!(config.annotation_store_config().schema_version, 2);
    }

    #[test]
    fn test_invalid_document() {
        let err = LecturaConfig::from_toml_str("[storage]\ndebounce_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
