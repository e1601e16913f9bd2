//! Study item store
//!
//! Study items live under `studyitems:{hash}:v1`, one collection per text.
//! Reviews go through the SM-2 scheduler; nothing else touches `dueDate`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::algorithm::{schedule_next_at, validate_grade, SchedulerError};
use super::models::{StudyItem, StudyStats};
use crate::backend::KeyValueBackend;
use crate::fingerprint::StorageKey;
use crate::store::{Change, ReactiveStore, StoreConfig, Subscription};

pub const STUDY_ITEMS_PREFIX: &str = "studyitems";

/// Reactive store of study items. Clones share state.
#[derive(Clone)]
pub struct StudyItemStore {
    store: ReactiveStore<StudyItem>,
}

impl StudyItemStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::with_config(backend, StoreConfig::new(STUDY_ITEMS_PREFIX))
    }

    pub fn with_config(backend: Arc<dyn KeyValueBackend>, config: StoreConfig) -> Self {
        Self {
            store: ReactiveStore::new("studyitems", backend, config),
        }
    }

    pub fn compute_key_from_text(&self, text: &str) -> Option<StorageKey> {
        self.store.compute_key(text)
    }

    pub fn subscribe<F>(&self, key: &StorageKey, callback: F) -> Subscription
    where
        F: Fn(&[StudyItem]) + Send + Sync + 'static,
    {
        self.store.subscribe(key, callback)
    }

    /// All items under `key`, in insertion order.
    pub fn list(&self, key: &StorageKey) -> Vec<StudyItem> {
        self.store.snapshot(key)
    }

    /// Insert items whose `(content, dimension)` is not stored yet.
    /// Returns the items actually added.
    pub fn add_items(&self, key: &StorageKey, items: Vec<StudyItem>) -> Vec<StudyItem> {
        if items.is_empty() {
            return Vec::new();
        }
        self.store.mutate(key, move |stored| {
            let mut seen: HashSet<(String, String)> = stored
                .iter()
                .map(|i| {
                    let (content, dimension) = i.signature();
                    (content.to_string(), dimension.to_string())
                })
                .collect();

            let mut added = Vec::new();
            for item in items {
                let (content, dimension) = item.signature();
                if seen.insert((content.to_string(), dimension.to_string())) {
                    stored.push(item.clone());
                    added.push(item);
                }
            }

            if added.is_empty() {
                Change::Unchanged(added)
            } else {
                log::debug!("Added {} study item(s) to {}", added.len(), key);
                Change::Changed(added)
            }
        })
    }

    /// Record a review of `item_id` with `quality` (0-5, whole number).
    ///
    /// The quality is validated before anything else, so an invalid grade
    /// is an error even for an unknown id. Returns `Ok(None)` when the id is
    /// unknown.
    pub fn update_item(
        &self,
        key: &StorageKey,
        item_id: &str,
        quality: f64,
    ) -> Result<Option<StudyItem>, SchedulerError> {
        self.update_item_at(key, item_id, quality, Utc::now())
    }

    /// `update_item` with an explicit review time.
    pub fn update_item_at(
        &self,
        key: &StorageKey,
        item_id: &str,
        quality: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<StudyItem>, SchedulerError> {
        let quality = validate_grade(quality)?;

        self.store.mutate(key, |items| {
            let Some(item) = items.iter_mut().find(|i| i.item_id == item_id) else {
                return Change::Unchanged(Ok(None));
            };

            let review = match schedule_next_at(item.schedule, quality, now) {
                Ok(review) => review,
                Err(e) => return Change::Unchanged(Err(e)),
            };

            item.schedule = review.state;
            item.due_date = review.due_date;
            item.review_count += 1;
            let n = f64::from(item.review_count);
            item.average_quality = (item.average_quality * (n - 1.0) + quality) / n;
            item.last_quality = Some(quality);

            Change::Changed(Ok(Some(item.clone())))
        })
    }

    /// Active items due at `reference`, oldest due date first.
    pub fn get_due(&self, key: &StorageKey, reference: DateTime<Utc>) -> Vec<StudyItem> {
        let mut due: Vec<StudyItem> = self.store.read(key, |items| {
            items
                .iter()
                .filter(|i| i.is_due_at(reference))
                .cloned()
                .collect()
        });
        // Stable: equal due dates keep insertion order
        due.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        due
    }

    pub fn get_due_now(&self, key: &StorageKey) -> Vec<StudyItem> {
        self.get_due(key, Utc::now())
    }

    /// Archive or restore an item. The schedule is left untouched.
    pub fn set_active(&self, key: &StorageKey, item_id: &str, active: bool) -> Option<StudyItem> {
        self.store.mutate(key, |items| {
            match items.iter_mut().find(|i| i.item_id == item_id) {
                Some(item) if item.is_active == active => Change::Unchanged(Some(item.clone())),
                Some(item) => {
                    item.is_active = active;
                    Change::Changed(Some(item.clone()))
                }
                None => Change::Unchanged(None),
            }
        })
    }

    pub fn stats(&self, key: &StorageKey, reference: DateTime<Utc>) -> StudyStats {
        self.store.read(key, |items| {
            let mut stats = StudyStats {
                total: items.len(),
                ..Default::default()
            };
            let mut quality_sum = 0.0;

            for item in items {
                if item.is_active {
                    stats.active += 1;
                }
                if item.is_due_at(reference) {
                    stats.due += 1;
                }
                if item.review_count > 0 {
                    stats.reviewed += 1;
                    quality_sum += item.average_quality;
                }
            }

            if stats.reviewed > 0 {
                stats.average_quality = quality_sum / stats.reviewed as f64;
            }
            stats
        })
    }

    pub fn flush(&self, key: &StorageKey) {
        self.store.flush(key);
    }
}
