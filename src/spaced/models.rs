//! Data models for spaced-repetition study items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::algorithm::ReviewState;
use crate::store::Record;

/// Provenance of a study item, e.g. the feedback improvement it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyAnchor {
    #[serde(rename = "type")]
    pub anchor_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criterion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// Epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// A reviewable unit of study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyItem {
    pub item_id: String,
    pub content: String,
    pub dimension: String,
    #[serde(default)]
    pub anchor: Option<StudyAnchor>,
    /// interval / repetition / ef
    #[serde(flatten)]
    pub schedule: ReviewState,
    pub due_date: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub review_count: u32,
    /// Running mean of submitted qualities
    #[serde(default)]
    pub average_quality: f64,
    #[serde(default)]
    pub last_quality: Option<f64>,
}

fn default_active() -> bool {
    true
}

impl StudyItem {
    /// Active and due at `reference`
    pub fn is_due_at(&self, reference: DateTime<Utc>) -> bool {
        self.is_active && self.due_date <= reference
    }

    /// Key used to drop duplicate items on insert
    pub(crate) fn signature(&self) -> (&str, &str) {
        (&self.content, &self.dimension)
    }
}

impl Record for StudyItem {
    fn record_id(&self) -> &str {
        &self.item_id
    }
}

/// Input for `create_study_item`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudyItem {
    #[serde(default)]
    pub content: String,
    /// Defaults to `comprensionAnalitica`
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default)]
    pub anchor: Option<StudyAnchor>,
}

/// Counters for one storage key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyStats {
    pub total: usize,
    pub active: usize,
    pub due: usize,
    /// Items reviewed at least once
    pub reviewed: usize,
    /// Mean of `averageQuality` over reviewed items
    pub average_quality: f64,
}
