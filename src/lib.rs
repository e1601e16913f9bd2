//! Reading-literacy assessment core.
//!
//! Annotations and study items are kept per text, keyed by a fingerprint of
//! the text, in reactive stores that persist to a pluggable key-value
//! backend. Evaluator feedback is normalized onto a canonical record, anchored
//! on paragraphs and turned into SM-2 study items.

pub mod annotations;
pub mod assessment;
pub mod backend;
pub mod config;
pub mod feedback;
pub mod fingerprint;
pub mod rubric;
pub mod spaced;
pub mod store;
