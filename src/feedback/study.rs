//! Feedback -> study items

use crate::spaced::algorithm::create_study_item;
use crate::spaced::{NewStudyItem, StudyAnchor, StudyItem};

use super::models::{utf16_len, CanonicalFeedback};

/// Most study items derived from one feedback record
pub const MAX_ITEMS_PER_FEEDBACK: usize = 3;

pub const FEEDBACK_IMPROVEMENT_ANCHOR: &str = "feedback-improvement";

/// One study item per improvement, longest action first (a proxy for
/// specificity), at most three. Ties keep their original order. Blank
/// actions are skipped.
pub fn feedback_to_study_items(feedback: &CanonicalFeedback) -> Vec<StudyItem> {
    let mut improvements: Vec<_> = feedback
        .improvements
        .iter()
        .filter(|i| !i.action.trim().is_empty())
        .collect();
    improvements.sort_by_key(|i| std::cmp::Reverse(utf16_len(&i.action)));

    improvements
        .into_iter()
        .take(MAX_ITEMS_PER_FEEDBACK)
        .map(|improvement| {
            create_study_item(NewStudyItem {
                content: improvement.action.clone(),
                dimension: Some(feedback.dimension.clone()),
                anchor: Some(StudyAnchor {
                    anchor_type: FEEDBACK_IMPROVEMENT_ANCHOR.to_string(),
                    criterion: Some(improvement.criterion.clone()),
                    dimension: Some(feedback.dimension.clone()),
                    created_at: Some(feedback.timestamp),
                }),
            })
        })
        .collect()
}
