//! Spaced repetition for study items
//!
//! This module provides:
//! - SM-2 scheduling (pure, no I/O)
//! - Study item models
//! - A reactive, persisted store of study items per text

pub mod algorithm;
pub mod models;
pub mod storage;

pub use algorithm::{
    create_study_item, format_interval, next_interval_days, schedule_next, schedule_next_at,
    validate_quality, ReviewState, ScheduledReview, SchedulerError, MAX_INTERVAL_DAYS,
};
pub use models::*;
pub use storage::{StudyItemStore, STUDY_ITEMS_PREFIX};
