//! Merging partial evaluations of one dimension

use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;

use super::models::*;
use super::normalize::normalize_feedback_input;
use crate::rubric::RubricLookup;

/// Normalize every record and fold them into one.
///
/// The dimension comes from the first record. For `score10`, `level4`,
/// `levelDescriptor`, `summary` and `id` the last defined value wins. Lists
/// are unioned in first-seen order, deduplicated on their main text, and
/// capped like a single normalized record. Returns `None` for an empty list.
pub fn merge_feedback(list: &[Value], rubric: &dyn RubricLookup) -> Option<CanonicalFeedback> {
    let normalized = list
        .iter()
        .map(|raw| normalize_feedback_input(raw, rubric))
        .collect();
    merge_canonical(normalized, rubric)
}

/// `merge_feedback` over records that are already canonical.
pub fn merge_canonical(
    list: Vec<CanonicalFeedback>,
    rubric: &dyn RubricLookup,
) -> Option<CanonicalFeedback> {
    let dimension = list.first()?.dimension.clone();

    let mut merged = CanonicalFeedback {
        model_version: FEEDBACK_MODEL_VERSION,
        id: None,
        rubric_criteria: rubric.criteria(&dimension),
        dimension,
        score10: None,
        level4: None,
        level_descriptor: None,
        summary: String::new(),
        strengths: Vec::new(),
        improvements: Vec::new(),
        probing_questions: Vec::new(),
        praxis_suggestions: Vec::new(),
        evidence: Vec::new(),
        timestamp: Utc::now().timestamp_millis(),
    };

    let mut strengths = HashSet::new();
    let mut improvements = HashSet::new();
    let mut questions = HashSet::new();
    let mut praxis = HashSet::new();
    let mut evidence = HashSet::new();

    for feedback in list {
        if feedback.id.is_some() {
            merged.id = feedback.id;
        }
        if feedback.score10.is_some() {
            merged.score10 = feedback.score10;
        }
        if feedback.level4.is_some() {
            merged.level4 = feedback.level4;
        }
        if feedback.level_descriptor.as_deref().is_some_and(|d| !d.is_empty()) {
            merged.level_descriptor = feedback.level_descriptor;
        }
        if !feedback.summary.is_empty() {
            merged.summary = feedback.summary;
        }

        push_unique(&mut merged.strengths, &mut strengths, feedback.strengths, |s| &s.text);
        push_unique(&mut merged.improvements, &mut improvements, feedback.improvements, |i| {
            &i.action
        });
        push_unique(
            &mut merged.probing_questions,
            &mut questions,
            feedback.probing_questions,
            |q| &q.question,
        );
        push_unique(
            &mut merged.praxis_suggestions,
            &mut praxis,
            feedback.praxis_suggestions,
            |p| &p.action,
        );
        push_unique(&mut merged.evidence, &mut evidence, feedback.evidence, |e| &e.quote);
    }

    merged.apply_caps();
    Some(merged)
}

fn push_unique<T>(
    target: &mut Vec<T>,
    seen: &mut HashSet<String>,
    items: Vec<T>,
    key: impl Fn(&T) -> &String,
) {
    for item in items {
        if seen.insert(key(&item).clone()) {
            target.push(item);
        }
    }
}
