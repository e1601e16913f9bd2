//! Assessment bridge
//!
//! Ties a text to its annotations for evaluation: a paragraph-indexed
//! bundle, anchors for generated questions and normalized feedback, and
//! the pipeline that turns one evaluation into stored study items.

mod bridge;
mod models;

use thiserror::Error;

use crate::annotations::AnnotationError;

pub use bridge::{record_evaluation, AssessmentBridge};
pub use models::*;

#[derive(Error, Debug)]
pub enum AssessmentError {
    #[error("Text is empty; nothing to assess")]
    InvalidText,

    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AssessmentError>;
