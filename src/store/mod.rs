//! Reactive, debounced, keyed collections.
//!
//! `ReactiveStore<T>` is the engine shared by the annotation and study-item
//! stores. For every storage key it keeps an in-memory `Vec<T>` that is the
//! source of truth for the session:
//! - first access lazily loads `{version, items}` from the backend; missing or
//!   corrupt payloads load as an empty collection,
//! - every mutation is applied under the state lock, handed to the key's
//!   debounced writer, and then emitted synchronously to subscribers,
//! - readers always get clones, never the stored values,
//! - writers whose payload already landed are shut down whenever another key
//!   is written; their entries are dropped too unless someone is subscribed,
//!   and the next access reloads them.

mod writer;

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::backend::KeyValueBackend;
use crate::fingerprint::StorageKey;

use writer::DebouncedWriter;

/// Default coalescing window for persistence.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(120);

/// Current persisted schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// A value that can live in a `ReactiveStore`.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + 'static {
    fn record_id(&self) -> &str;
}

/// Per-store settings.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Key namespace, e.g. `annotations`
    pub prefix: String,
    pub schema_version: u32,
    pub debounce: Duration,
}

impl StoreConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            schema_version: SCHEMA_VERSION,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_schema_version(mut self, schema_version: u32) -> Self {
        self.schema_version = schema_version;
        self
    }
}

/// Outcome of a mutation closure: whether the collection changed.
pub enum Change<R> {
    Changed(R),
    Unchanged(R),
}

type Callback<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

#[derive(Serialize)]
struct PersistedPayload<'a, T> {
    version: u32,
    items: &'a [T],
}

#[derive(Deserialize)]
struct RawPayload {
    #[serde(default)]
    version: Option<u32>,
    items: Vec<serde_json::Value>,
}

struct State<T> {
    entries: HashMap<StorageKey, Vec<T>>,
    subscribers: HashMap<StorageKey, Vec<(u64, Callback<T>)>>,
    next_subscriber_id: u64,
}

struct Inner<T> {
    name: &'static str,
    config: StoreConfig,
    backend: Arc<dyn KeyValueBackend>,
    state: Mutex<State<T>>,
    writers: Mutex<HashMap<StorageKey, DebouncedWriter>>,
}

/// Shared handle; clones see the same entries and subscribers.
pub struct ReactiveStore<T: Record> {
    inner: Arc<Inner<T>>,
}

impl<T: Record> Clone for ReactiveStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Keeps a callback registered. Dropping it (or calling `unsubscribe`)
/// removes the callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl<T: Record> ReactiveStore<T> {
    /// `name` is used in log lines and writer thread names.
    pub fn new(name: &'static str, backend: Arc<dyn KeyValueBackend>, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                config,
                backend,
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    subscribers: HashMap::new(),
                    next_subscriber_id: 0,
                }),
                writers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Storage key for `text` in this store's namespace.
    pub fn compute_key(&self, text: &str) -> Option<StorageKey> {
        StorageKey::from_text(
            &self.inner.config.prefix,
            text,
            self.inner.config.schema_version,
        )
    }

    /// Clone of every record under `key`, in insertion order.
    pub fn snapshot(&self, key: &StorageKey) -> Vec<T> {
        self.read(key, |items| items.to_vec())
    }

    /// Run `f` against the records under `key` without cloning them all.
    pub fn read<R>(&self, key: &StorageKey, f: impl FnOnce(&[T]) -> R) -> R {
        let mut state = self.lock_state();
        let items = self.ensure_loaded(&mut state, key);
        f(items)
    }

    /// Apply a mutation. When it reports `Changed`, the new collection is
    /// scheduled for persistence and emitted to subscribers.
    pub fn mutate<R>(&self, key: &StorageKey, f: impl FnOnce(&mut Vec<T>) -> Change<R>) -> R {
        let (value, emission) = {
            let mut state = self.lock_state();
            let items = self.ensure_loaded(&mut state, key);
            match f(items) {
                Change::Unchanged(value) => (value, None),
                Change::Changed(value) => {
                    let snapshot = items.clone();
                    self.schedule_persist(key, &snapshot);
                    self.reap_idle_writers(&mut state, key);
                    let callbacks = state.subscribers.get(key).cloned().unwrap_or_default();
                    (value, Some((snapshot, callbacks)))
                }
            }
        };

        if let Some((snapshot, callbacks)) = emission {
            self.emit(&callbacks, &snapshot);
        }
        value
    }

    /// Register `callback` for `key`; it runs once right away with the
    /// current snapshot and then after every mutation of that key.
    ///
    /// A callback that owns a clone of this store keeps the store alive
    /// until the returned `Subscription` is dropped.
    pub fn subscribe<F>(&self, key: &StorageKey, callback: F) -> Subscription
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(callback);
        let (id, snapshot) = {
            let mut state = self.lock_state();
            let snapshot = self.ensure_loaded(&mut state, key).to_vec();
            let id = state.next_subscriber_id;
            state.next_subscriber_id += 1;
            state
                .subscribers
                .entry(key.clone())
                .or_default()
                .push((id, Arc::clone(&callback)));
            (id, snapshot)
        };

        self.emit(&[(id, callback)], &snapshot);

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        let key = key.clone();
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
                    if let Some(subs) = state.subscribers.get_mut(&key) {
                        subs.retain(|(sub_id, _)| *sub_id != id);
                        if subs.is_empty() {
                            state.subscribers.remove(&key);
                        }
                    }
                }
            })),
        }
    }

    /// Number of live callbacks for `key`.
    pub fn subscriber_count(&self, key: &StorageKey) -> usize {
        self.lock_state()
            .subscribers
            .get(key)
            .map_or(0, |subs| subs.len())
    }

    /// Number of keys with a running writer thread.
    pub fn writer_count(&self) -> usize {
        self.lock_writers().len()
    }

    /// Persist `key` now instead of waiting for the debounce window.
    pub fn flush(&self, key: &StorageKey) {
        let sender = {
            let writers = self.lock_writers();
            writers.get(key).map(|w| w.sender())
        };
        if let Some(sender) = sender {
            writer::flush_sync(&sender);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State<T>> {
        // A panic while holding the lock cannot leave the Vec half-written
        // in a way we care about, so recover instead of propagating.
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_writers(&self) -> MutexGuard<'_, HashMap<StorageKey, DebouncedWriter>> {
        self.inner.writers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_loaded<'s>(&self, state: &'s mut State<T>, key: &StorageKey) -> &'s mut Vec<T> {
        state
            .entries
            .entry(key.clone())
            .or_insert_with(|| self.load(key))
    }

    fn load(&self, key: &StorageKey) -> Vec<T> {
        let raw = match self.inner.backend.get(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("[{}] Could not read {}: {}", self.inner.name, key, e);
                return Vec::new();
            }
        };

        let payload: RawPayload = match serde_json::from_str(&raw) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("[{}] Ignoring corrupt payload for {}: {}", self.inner.name, key, e);
                return Vec::new();
            }
        };

        if let Some(version) = payload.version {
            if version != self.inner.config.schema_version {
                log::debug!(
                    "[{}] Payload for {} has version {}, expected {}",
                    self.inner.name,
                    key,
                    version,
                    self.inner.config.schema_version
                );
            }
        }

        let total = payload.items.len();
        let items: Vec<T> = payload
            .items
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        if items.len() < total {
            log::warn!(
                "[{}] Skipped {} malformed record(s) in {}",
                self.inner.name,
                total - items.len(),
                key
            );
        }
        log::debug!("[{}] Loaded {} record(s) from {}", self.inner.name, items.len(), key);
        items
    }

    /// Serialize and hand the payload to the key's writer. Called with the
    /// state lock held so writers receive payloads in mutation order.
    fn schedule_persist(&self, key: &StorageKey, items: &[T]) {
        let payload = PersistedPayload {
            version: self.inner.config.schema_version,
            items,
        };
        let payload = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("[{}] Could not serialize {}: {}", self.inner.name, key, e);
                return;
            }
        };

        let mut writers = self.lock_writers();
        if !writers.contains_key(key) {
            match DebouncedWriter::spawn(
                format!("{}-writer", self.inner.name),
                key.as_str().to_string(),
                Arc::clone(&self.inner.backend),
                self.inner.config.debounce,
            ) {
                Ok(writer) => {
                    writers.insert(key.clone(), writer);
                }
                Err(e) => {
                    log::warn!(
                        "[{}] Could not start writer for {}, writing synchronously: {}",
                        self.inner.name,
                        key,
                        e
                    );
                    if let Err(e) = self.inner.backend.set(key.as_str(), &payload) {
                        log::warn!("[{}] Persisting {} failed: {}", self.inner.name, key, e);
                    }
                    return;
                }
            }
        }
        if let Some(writer) = writers.get(key) {
            if !writer.schedule(payload) {
                log::warn!("[{}] Writer for {} is gone", self.inner.name, key);
                writers.remove(key);
            }
        }
    }

    /// Shut down the writers of keys other than `active` that have nothing
    /// left to write. Called with the state lock held.
    fn reap_idle_writers(&self, state: &mut State<T>, active: &StorageKey) {
        let idle: Vec<(StorageKey, DebouncedWriter)> = {
            let mut writers = self.lock_writers();
            let keys: Vec<StorageKey> = writers
                .iter()
                .filter(|(k, w)| *k != active && w.is_idle())
                .map(|(k, _)| k.clone())
                .collect();
            keys.into_iter()
                .filter_map(|k| writers.remove(&k).map(|w| (k, w)))
                .collect()
        };

        for (key, writer) in idle {
            // A failed final write leaves memory as the only copy
            if writer.shutdown() && !state.subscribers.contains_key(&key) {
                state.entries.remove(&key);
                log::debug!("[{}] Released {}", self.inner.name, key);
            }
        }
    }

    fn emit(&self, callbacks: &[(u64, Callback<T>)], snapshot: &[T]) {
        for (id, callback) in callbacks {
            let result = panic::catch_unwind(AssertUnwindSafe(|| callback(snapshot)));
            if result.is_err() {
                log::error!("[{}] Subscriber {} panicked; ignoring", self.inner.name, id);
            }
        }
    }
}
