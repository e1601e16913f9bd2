//! SM-2 Spaced Repetition Algorithm
//!
//! Variant of the SuperMemo 2 algorithm used to schedule study items.
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing answer, remembered
//! - 2: Incorrect, but answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response with no hesitation
//!
//! Anything below 3 counts as forgotten and collapses the interval to one
//! day. Intervals are capped at `MAX_INTERVAL_DAYS`; the ease factor only
//! has a floor.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::models::{NewStudyItem, StudyItem};
use crate::fingerprint::to_base36;

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor of a fresh item
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Longest interval the scheduler hands out (about a century)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

pub const MIN_QUALITY: f64 = 0.0;
pub const MAX_QUALITY: f64 = 5.0;

/// Dimension given to ad-hoc items that do not name one
pub const DEFAULT_DIMENSION: &str = "comprensionAnalitica";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Quality must be a number between 0 and 5, got {0}")]
    QualityOutOfRange(f64),
    #[error("Quality must be a whole number, got {0}")]
    FractionalQuality(f64),
}

/// Scheduling fields of a study item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewState {
    /// Days until the next review
    pub interval: u32,
    /// Consecutive successful reviews
    pub repetition: u32,
    /// Ease factor, never below `MIN_EASE_FACTOR`
    pub ef: f64,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            interval: 0,
            repetition: 0,
            ef: INITIAL_EASE_FACTOR,
        }
    }
}

/// Outcome of `schedule_next`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledReview {
    pub state: ReviewState,
    pub due_date: DateTime<Utc>,
    pub quality: f64,
}

/// Reject anything that is not a finite number in [0, 5].
pub fn validate_quality(quality: f64) -> Result<f64, SchedulerError> {
    if !quality.is_finite() || !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        return Err(SchedulerError::QualityOutOfRange(quality));
    }
    Ok(quality)
}

/// Like `validate_quality`, but also requires a whole number. Used for
/// recorded reviews, which only accept the six discrete grades.
pub fn validate_grade(quality: f64) -> Result<f64, SchedulerError> {
    let quality = validate_quality(quality)?;
    if quality.fract() != 0.0 {
        return Err(SchedulerError::FractionalQuality(quality));
    }
    Ok(quality)
}

/// Compute the next interval, repetition count and ease factor.
pub fn next_interval_days(state: ReviewState, quality: f64) -> Result<ReviewState, SchedulerError> {
    let quality = validate_quality(quality)?;

    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
    let miss = MAX_QUALITY - quality;
    let ef = (state.ef + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR);

    if quality < 3.0 {
        // Forgotten: start over
        return Ok(ReviewState {
            interval: 1,
            repetition: 0,
            ef,
        });
    }

    let repetition = state.repetition + 1;
    let interval = match repetition {
        1 => 1,
        2 => 6,
        _ => (f64::from(state.interval) * ef)
            .round()
            .min(f64::from(MAX_INTERVAL_DAYS)) as u32,
    };

    Ok(ReviewState {
        interval,
        repetition,
        ef,
    })
}

/// Schedule the next review relative to the current time.
pub fn schedule_next(state: ReviewState, quality: f64) -> Result<ScheduledReview, SchedulerError> {
    schedule_next_at(state, quality, Utc::now())
}

/// Schedule the next review relative to `now`.
pub fn schedule_next_at(
    state: ReviewState,
    quality: f64,
    now: DateTime<Utc>,
) -> Result<ScheduledReview, SchedulerError> {
    let next = next_interval_days(state, quality)?;
    Ok(ScheduledReview {
        state: next,
        due_date: now
            .checked_add_signed(Duration::days(i64::from(next.interval)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        quality,
    })
}

static ITEM_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `itm_<counter>_<tag>`: the counter orders ids within a process, the
/// random tag keeps them apart across processes.
fn next_item_id() -> String {
    let n = ITEM_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let tag = Uuid::new_v4().simple().to_string();
    format!("itm_{}_{}", to_base36(n), &tag[..6])
}

/// Build a fresh item, due immediately.
pub fn create_study_item(input: NewStudyItem) -> StudyItem {
    create_study_item_at(input, Utc::now())
}

pub fn create_study_item_at(input: NewStudyItem, now: DateTime<Utc>) -> StudyItem {
    let dimension = input
        .dimension
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DEFAULT_DIMENSION.to_string());

    StudyItem {
        item_id: next_item_id(),
        content: input.content,
        dimension,
        anchor: input.anchor,
        schedule: ReviewState::default(),
        due_date: now,
        is_active: true,
        review_count: 0,
        average_quality: 0.0,
        last_quality: None,
    }
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
