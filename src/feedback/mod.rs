//! Feedback model
//!
//! Evaluators return loosely structured JSON in several vocabularies. This
//! module turns it into one versioned `CanonicalFeedback` record, merges
//! partial evaluations of the same dimension, and derives study items from
//! the improvements a record suggests.

mod merge;
mod models;
mod normalize;
pub mod shapes;
mod study;

pub use merge::{merge_canonical, merge_feedback};
pub use models::*;
pub use normalize::{normalize_evidence, normalize_feedback_input};
pub use study::{feedback_to_study_items, FEEDBACK_IMPROVEMENT_ANCHOR, MAX_ITEMS_PER_FEEDBACK};
