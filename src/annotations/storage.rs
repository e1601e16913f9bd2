//! Annotation store
//!
//! Highlights, notes and anchors for one text live under a storage key
//! `annotations:{hash}:v1`. The store enforces at most one highlight per
//! paragraph; notes and anchors are unconstrained.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use super::models::*;
use crate::backend::KeyValueBackend;
use crate::fingerprint::StorageKey;
use crate::store::{Change, ReactiveStore, StoreConfig, Subscription};

pub const ANNOTATIONS_PREFIX: &str = "annotations";

const DEFAULT_MANUAL_SOURCE: &str = "manual";
const DEFAULT_ANCHOR_SOURCE: &str = "auto";

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, AnnotationError>;

/// Reactive store of annotations. Clones share state.
#[derive(Clone)]
pub struct AnnotationStore {
    store: ReactiveStore<Annotation>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl AnnotationStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::with_config(backend, StoreConfig::new(ANNOTATIONS_PREFIX))
    }

    pub fn with_config(backend: Arc<dyn KeyValueBackend>, config: StoreConfig) -> Self {
        Self {
            store: ReactiveStore::new("annotations", backend, config),
        }
    }

    /// Storage key for a text, `None` for blank text.
    pub fn compute_key_from_text(&self, text: &str) -> Option<StorageKey> {
        self.store.compute_key(text)
    }

    /// Watch a key. The callback runs immediately with the current list.
    pub fn subscribe<F>(&self, key: &StorageKey, callback: F) -> Subscription
    where
        F: Fn(&[Annotation]) + Send + Sync + 'static,
    {
        self.store.subscribe(key, callback)
    }

    // ==================== Highlights ====================

    /// Add a highlight on `paragraph_index`. An existing highlight on the
    /// same paragraph is replaced.
    pub fn add_highlight(
        &self,
        key: &StorageKey,
        paragraph_index: usize,
        text: Option<&str>,
        source: Option<&str>,
    ) -> Annotation {
        let annotation = build_highlight(paragraph_index, text, source);
        let added = annotation.clone();
        self.store.mutate(key, move |items| {
            items.retain(|a| !a.is_highlight_at(paragraph_index));
            items.push(annotation);
            Change::Changed(())
        });
        added
    }

    /// Remove the highlight on `paragraph_index` if there is one,
    /// otherwise add it.
    pub fn toggle_highlight(
        &self,
        key: &StorageKey,
        paragraph_index: usize,
        source: Option<&str>,
    ) -> ToggleOutcome {
        let candidate = build_highlight(paragraph_index, None, source);
        self.store.mutate(key, move |items| {
            match items.iter().position(|a| a.is_highlight_at(paragraph_index)) {
                Some(pos) => {
                    let removed = items.remove(pos);
                    Change::Changed(ToggleOutcome {
                        active: false,
                        added: None,
                        removed: Some(removed),
                    })
                }
                None => {
                    items.push(candidate.clone());
                    Change::Changed(ToggleOutcome {
                        active: true,
                        added: Some(candidate),
                        removed: None,
                    })
                }
            }
        })
    }

    // ==================== Notes ====================

    pub fn add_note(&self, key: &StorageKey, note: NewNote) -> Annotation {
        let mut meta = AnnotationMeta::new(
            note.source.unwrap_or_else(|| DEFAULT_MANUAL_SOURCE.to_string()),
            now_ms(),
        );
        if let Some(extra) = note.meta {
            for (k, v) in extra {
                // Bookkeeping keys are owned by the store
                if !matches!(k.as_str(), "createdAt" | "updatedAt" | "source") {
                    meta.extra.insert(k, v);
                }
            }
        }
        let annotation = Annotation {
            id: new_id(),
            body: AnnotationBody::Note {
                paragraph_index: note.paragraph_index,
                text: note.text,
            },
            meta,
        };
        self.push(key, annotation)
    }

    // ==================== Anchors ====================

    /// Attach structured data to a paragraph.
    ///
    /// Fails with `InvalidArgument` when `paragraph_index` is missing.
    pub fn add_anchor(&self, key: &StorageKey, anchor: NewAnchor) -> Result<Annotation> {
        let paragraph_index = anchor.paragraph_index.ok_or_else(|| {
            AnnotationError::InvalidArgument(format!(
                "paragraph_index is required for '{}' anchors",
                anchor.anchor_type
            ))
        })?;

        let mut meta = AnnotationMeta::new(
            anchor
                .source
                .unwrap_or_else(|| DEFAULT_ANCHOR_SOURCE.to_string()),
            now_ms(),
        );
        meta.anchor_type = Some(anchor.anchor_type);
        meta.ref_id = anchor.ref_id;
        meta.data = Some(anchor.data);

        let annotation = Annotation {
            id: new_id(),
            body: AnnotationBody::Anchor { paragraph_index },
            meta,
        };
        Ok(self.push(key, annotation))
    }

    // ==================== Updates ====================

    /// Shallow-merge `patch` into the annotation and refresh `updatedAt`.
    /// Returns `None` when the id is unknown.
    pub fn update_annotation(
        &self,
        key: &StorageKey,
        id: &str,
        patch: AnnotationPatch,
    ) -> Option<Annotation> {
        let now = now_ms();
        self.store.mutate(key, |items| {
            let Some(pos) = items.iter().position(|a| a.id == id) else {
                return Change::Unchanged(None);
            };

            let mut updated = items[pos].clone();
            match &mut updated.body {
                AnnotationBody::Highlight {
                    paragraph_index,
                    text,
                } => {
                    if let Some(p) = patch.paragraph_index {
                        *paragraph_index = p;
                    }
                    if let Some(t) = patch.text {
                        *text = Some(t);
                    }
                }
                AnnotationBody::Note {
                    paragraph_index,
                    text,
                } => {
                    if let Some(p) = patch.paragraph_index {
                        *paragraph_index = Some(p);
                    }
                    if let Some(t) = patch.text {
                        *text = t;
                    }
                }
                AnnotationBody::Anchor { paragraph_index } => {
                    if let Some(p) = patch.paragraph_index {
                        *paragraph_index = p;
                    }
                    if let Some(data) = patch.data {
                        updated.meta.data = Some(data);
                    }
                }
            }
            updated.meta.updated_at = now;

            items[pos] = updated.clone();
            // A highlight moved onto an occupied paragraph wins over the old one
            if let AnnotationBody::Highlight {
                paragraph_index, ..
            } = updated.body
            {
                items.retain(|a| a.id == updated.id || !a.is_highlight_at(paragraph_index));
            }
            Change::Changed(Some(updated))
        })
    }

    /// Returns `false` when the id is unknown.
    pub fn remove_annotation(&self, key: &StorageKey, id: &str) -> bool {
        self.store.mutate(key, |items| {
            match items.iter().position(|a| a.id == id) {
                Some(pos) => {
                    items.remove(pos);
                    Change::Changed(true)
                }
                None => Change::Unchanged(false),
            }
        })
    }

    /// Drop every annotation stored under `key`.
    pub fn clear_all(&self, key: &StorageKey) {
        self.store.mutate(key, |items| {
            items.clear();
            Change::Changed(())
        });
    }

    // ==================== Queries ====================

    pub fn list_by_storage_key(&self, key: &StorageKey, filter: &AnnotationFilter) -> Vec<Annotation> {
        self.list_kind(key, None, filter)
    }

    pub fn list_highlights(&self, key: &StorageKey, filter: &AnnotationFilter) -> Vec<Annotation> {
        self.list_kind(key, Some(AnnotationKind::Highlight), filter)
    }

    pub fn list_notes(&self, key: &StorageKey, filter: &AnnotationFilter) -> Vec<Annotation> {
        self.list_kind(key, Some(AnnotationKind::Note), filter)
    }

    pub fn list_anchors(&self, key: &StorageKey, filter: &AnnotationFilter) -> Vec<Annotation> {
        self.list_kind(key, Some(AnnotationKind::Anchor), filter)
    }

    pub fn to_export_bundle(&self, key: &StorageKey) -> ExportBundle {
        let mut bundle = ExportBundle::from_annotations(self.store.snapshot(key));
        bundle.version = self.store.config().schema_version;
        bundle
    }

    /// Write `key` to the backend now.
    pub fn flush(&self, key: &StorageKey) {
        self.store.flush(key);
    }

    fn list_kind(
        &self,
        key: &StorageKey,
        kind: Option<AnnotationKind>,
        filter: &AnnotationFilter,
    ) -> Vec<Annotation> {
        self.store.read(key, |items| {
            items
                .iter()
                .filter(|a| kind.map_or(true, |k| a.kind() == k))
                .filter(|a| filter.matches(a))
                .cloned()
                .collect()
        })
    }

    fn push(&self, key: &StorageKey, annotation: Annotation) -> Annotation {
        let added = annotation.clone();
        self.store.mutate(key, move |items| {
            items.push(annotation);
            Change::Changed(())
        });
        added
    }
}

fn build_highlight(paragraph_index: usize, text: Option<&str>, source: Option<&str>) -> Annotation {
    Annotation {
        id: new_id(),
        body: AnnotationBody::Highlight {
            paragraph_index,
            text: text.filter(|t| !t.is_empty()).map(str::to_string),
        },
        meta: AnnotationMeta::new(source.unwrap_or(DEFAULT_MANUAL_SOURCE), now_ms()),
    }
}
