use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use lectura_lib::annotations::AnnotationStore;
use lectura_lib::assessment::AssessmentBridge;
use lectura_lib::backend::{FileBackend, KeyValueBackend};
use lectura_lib::config::LecturaConfig;
use lectura_lib::fingerprint::StorageKey;
use lectura_lib::spaced::StudyItemStore;

/// Shared application state for CLI commands
pub struct App {
    pub annotations: AnnotationStore,
    pub study_items: StudyItemStore,
}

impl App {
    /// Load config (explicit path, else the default location) and open the
    /// file-backed stores.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path.map(PathBuf::from).or_else(LecturaConfig::default_path) {
            Some(path) => LecturaConfig::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => LecturaConfig::default(),
        };

        let data_dir = config.data_dir().context("Failed to get data directory")?;
        let backend = FileBackend::new(data_dir);
        backend.init().context("Failed to initialize storage")?;
        let backend: Arc<dyn KeyValueBackend> = Arc::new(backend);

        Ok(Self {
            annotations: AnnotationStore::with_config(backend.clone(), config.annotation_store_config()),
            study_items: StudyItemStore::with_config(backend, config.study_store_config()),
        })
    }

    /// Read a text file to assess
    pub fn read_text(path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Read a raw feedback payload
    pub fn read_json(path: &Path) -> Result<Value> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Invalid JSON in {}", path.display()))
    }

    pub fn bridge(&self, text: &str) -> Result<AssessmentBridge> {
        AssessmentBridge::new(self.annotations.clone(), text).context("Cannot assess an empty text")
    }

    pub fn annotation_key(&self, text: &str) -> Result<StorageKey> {
        self.annotations
            .compute_key_from_text(text)
            .context("Cannot key an empty text")
    }

    pub fn study_key(&self, text: &str) -> Result<StorageKey> {
        self.study_items
            .compute_key_from_text(text)
            .context("Cannot key an empty text")
    }
}
