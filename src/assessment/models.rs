//! Bundles, questions and assessment items

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::annotations::{Annotation, AnnotationKind, ExportBundle};
use crate::feedback::CanonicalFeedback;
use crate::spaced::StudyItem;

/// Annotations of one paragraph, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParagraphAnnotations {
    pub highlights: Vec<Annotation>,
    pub notes: Vec<Annotation>,
    pub anchors: Vec<Annotation>,
}

/// Export bundle plus a per-paragraph index. Floating notes appear only in
/// `notes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentBundle {
    pub version: u32,
    pub highlights: Vec<Annotation>,
    pub notes: Vec<Annotation>,
    pub anchors: Vec<Annotation>,
    pub by_paragraph: BTreeMap<usize, ParagraphAnnotations>,
}

impl From<ExportBundle> for AssessmentBundle {
    fn from(bundle: ExportBundle) -> Self {
        let mut by_paragraph: BTreeMap<usize, ParagraphAnnotations> = BTreeMap::new();
        let all = bundle
            .highlights
            .iter()
            .chain(&bundle.notes)
            .chain(&bundle.anchors);
        for annotation in all {
            let Some(paragraph) = annotation.paragraph_index() else {
                continue;
            };
            let entry = by_paragraph.entry(paragraph).or_default();
            match annotation.kind() {
                AnnotationKind::Highlight => entry.highlights.push(annotation.clone()),
                AnnotationKind::Note => entry.notes.push(annotation.clone()),
                AnnotationKind::Anchor => entry.anchors.push(annotation.clone()),
            }
        }

        Self {
            version: bundle.version,
            highlights: bundle.highlights,
            notes: bundle.notes,
            anchors: bundle.anchors,
            by_paragraph,
        }
    }
}

/// A generated (socratic) question to anchor on a paragraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocraticQuestion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "anchoredQuestion")]
    pub question: String,
    #[serde(default)]
    pub dimension: Option<String>,
}

impl From<&str> for SocraticQuestion {
    fn from(question: &str) -> Self {
        Self {
            question: question.to_string(),
            ..Default::default()
        }
    }
}

/// Input for `build_assessment_item`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssessmentItem {
    pub paragraph_index: Option<usize>,
    pub prompt: String,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub rubric_dimension: Option<String>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

/// A reusable evaluable prompt tied to a paragraph. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentItem {
    id: String,
    paragraph_index: Option<usize>,
    prompt: String,
    expected: Option<String>,
    rubric_dimension: Option<String>,
    created_at: i64,
    meta: Map<String, Value>,
}

impl AssessmentItem {
    pub(crate) fn build(input: NewAssessmentItem) -> Self {
        let tag = Uuid::new_v4().simple().to_string();
        Self {
            id: tag[..8].to_string(),
            paragraph_index: input.paragraph_index,
            prompt: input.prompt,
            expected: input.expected,
            rubric_dimension: input.rubric_dimension,
            created_at: Utc::now().timestamp_millis(),
            meta: input.meta,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn paragraph_index(&self) -> Option<usize> {
        self.paragraph_index
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn expected(&self) -> Option<&str> {
        self.expected.as_deref()
    }

    pub fn rubric_dimension(&self) -> Option<&str> {
        self.rubric_dimension.as_deref()
    }

    /// Epoch milliseconds
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }
}

/// Everything one evaluation produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
    pub feedback: CanonicalFeedback,
    pub anchor: Annotation,
    /// Study items that were new for this text
    pub study_items_added: Vec<StudyItem>,
}
