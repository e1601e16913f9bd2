//! Annotations module
//!
//! Highlights, notes and anchors keyed by a fingerprint of the text they
//! belong to.

mod models;
mod storage;

pub use models::*;
pub use storage::{AnnotationError, AnnotationStore, ANNOTATIONS_PREFIX};
