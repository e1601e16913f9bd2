//! Data models for text annotations

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::{Record, SCHEMA_VERSION};

/// What an anchor attaches to a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnchorType {
    /// A generated (socratic) question
    Question,
    /// A normalized feedback record
    Feedback,
    /// A concept or glossary reference
    Concept,
    Custom(String),
}

impl AnchorType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Question => "question",
            Self::Feedback => "feedback",
            Self::Concept => "concept",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for AnchorType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "question" => Self::Question,
            "feedback" => Self::Feedback,
            "concept" => Self::Concept,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for AnchorType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<AnchorType> for String {
    fn from(value: AnchorType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AnchorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific part of an annotation. Highlights and anchors always sit
/// on a paragraph; notes may float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnnotationBody {
    #[serde(rename_all = "camelCase")]
    Highlight {
        paragraph_index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Note {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        paragraph_index: Option<usize>,
        #[serde(default)]
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Anchor { paragraph_index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Highlight,
    Note,
    Anchor,
}

/// Bookkeeping attached to every annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationMeta {
    /// Epoch milliseconds
    pub created_at: i64,
    /// Epoch milliseconds
    pub updated_at: i64,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_type: Option<AnchorType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Caller-supplied extra keys (notes)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnnotationMeta {
    pub fn new(source: impl Into<String>, now: i64) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            source: source.into(),
            anchor_type: None,
            ref_id: None,
            data: None,
            extra: Map::new(),
        }
    }
}

/// A highlight, note or anchor tied to one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    #[serde(flatten)]
    pub body: AnnotationBody,
    pub meta: AnnotationMeta,
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match self.body {
            AnnotationBody::Highlight { .. } => AnnotationKind::Highlight,
            AnnotationBody::Note { .. } => AnnotationKind::Note,
            AnnotationBody::Anchor { .. } => AnnotationKind::Anchor,
        }
    }

    pub fn paragraph_index(&self) -> Option<usize> {
        match &self.body {
            AnnotationBody::Highlight { paragraph_index, .. } => Some(*paragraph_index),
            AnnotationBody::Note { paragraph_index, .. } => *paragraph_index,
            AnnotationBody::Anchor { paragraph_index } => Some(*paragraph_index),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            AnnotationBody::Highlight { text, .. } => text.as_deref(),
            AnnotationBody::Note { text, .. } => Some(text),
            AnnotationBody::Anchor { .. } => None,
        }
    }

    pub fn anchor_type(&self) -> Option<&AnchorType> {
        self.meta.anchor_type.as_ref()
    }

    pub fn is_highlight_at(&self, paragraph: usize) -> bool {
        matches!(self.body, AnnotationBody::Highlight { paragraph_index, .. } if paragraph_index == paragraph)
    }
}

impl Record for Annotation {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Input for `add_note`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    #[serde(default)]
    pub paragraph_index: Option<usize>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
    /// Extra keys merged into `meta`
    #[serde(default)]
    pub meta: Option<Map<String, Value>>,
}

/// Input for `add_anchor`. `paragraph_index` is required; it is optional
/// here only because anchors are often built from loosely-typed payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnchor {
    #[serde(default)]
    pub paragraph_index: Option<usize>,
    pub anchor_type: AnchorType,
    #[serde(default)]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub source: Option<String>,
}

impl NewAnchor {
    pub fn new(paragraph_index: usize, anchor_type: AnchorType, data: Value) -> Self {
        Self {
            paragraph_index: Some(paragraph_index),
            anchor_type,
            ref_id: None,
            data,
            source: None,
        }
    }

    pub fn with_ref_id(mut self, ref_id: Option<String>) -> Self {
        self.ref_id = ref_id;
        self
    }
}

/// Shallow patch for `update_annotation`. `None` fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub paragraph_index: Option<usize>,
    /// Replaces `meta.data` (anchors)
    #[serde(default)]
    pub data: Option<Value>,
}

/// Optional narrowing for the list operations.
#[derive(Debug, Clone, Default)]
pub struct AnnotationFilter {
    pub anchor_type: Option<AnchorType>,
    pub paragraph_index: Option<usize>,
    pub source: Option<String>,
}

impl AnnotationFilter {
    pub fn anchor_type(anchor_type: AnchorType) -> Self {
        Self {
            anchor_type: Some(anchor_type),
            ..Default::default()
        }
    }

    pub fn paragraph(paragraph_index: usize) -> Self {
        Self {
            paragraph_index: Some(paragraph_index),
            ..Default::default()
        }
    }

    pub fn matches(&self, annotation: &Annotation) -> bool {
        if let Some(anchor_type) = &self.anchor_type {
            if annotation.anchor_type() != Some(anchor_type) {
                return false;
            }
        }
        if let Some(paragraph) = self.paragraph_index {
            if annotation.paragraph_index() != Some(paragraph) {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if &annotation.meta.source != source {
                return false;
            }
        }
        true
    }
}

/// Result of `toggle_highlight`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub active: bool,
    pub added: Option<Annotation>,
    pub removed: Option<Annotation>,
}

/// All annotations of one key grouped by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: u32,
    pub highlights: Vec<Annotation>,
    pub notes: Vec<Annotation>,
    pub anchors: Vec<Annotation>,
}

impl ExportBundle {
    pub fn from_annotations(annotations: Vec<Annotation>) -> Self {
        let mut bundle = Self {
            version: SCHEMA_VERSION,
            highlights: Vec::new(),
            notes: Vec::new(),
            anchors: Vec::new(),
        };
        for annotation in annotations {
            match annotation.kind() {
                AnnotationKind::Highlight => bundle.highlights.push(annotation),
                AnnotationKind::Note => bundle.notes.push(annotation),
                AnnotationKind::Anchor => bundle.anchors.push(annotation),
            }
        }
        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_highlight_json_shape() {
        let annotation = Annotation {
            id: "h1".to_string(),
            body: AnnotationBody::Highlight {
                paragraph_index: 2,
                text: Some("cita".to_string()),
            },
            meta: AnnotationMeta::new("manual", 10),
        };
        let value = serde_json::to_value(&annotation).unwrap();
        assert_eq!(value["kind"], "highlight");
        assert_eq!(value["paragraphIndex"], 2);
        assert_eq!(value["text"], "cita");
        assert_eq!(value["meta"]["createdAt"], 10);
        assert_eq!(value["meta"]["source"], "manual");
        assert!(value["meta"].get("anchorType").is_none());
    }

    #[test]
    fn test_anchor_parses_from_json() {
        let value = json!({
            "id": "a1",
            "kind": "anchor",
            "paragraphIndex": 0,
            "meta": {
                "createdAt": 1, "updatedAt": 2, "source": "auto",
                "anchorType": "question", "data": { "question": "¿Qué idea?" }
            }
        });
        let annotation: Annotation = serde_json::from_value(value).unwrap();
        assert_eq!(annotation.kind(), AnnotationKind::Anchor);
        assert_eq!(annotation.anchor_type(), Some(&AnchorType::Question));
        assert_eq!(annotation.paragraph_index(), Some(0));
        assert_eq!(annotation.text(), None);
    }

    #[test]
    fn test_highlight_without_paragraph_is_rejected() {
        let value = json!({
            "id": "h1", "kind": "highlight",
            "meta": { "createdAt": 1, "updatedAt": 1, "source": "manual" }
        });
        assert!(serde_json::from_value::<Annotation>(value).is_err());
    }

    #[test]
    fn test_note_extra_meta_roundtrips() {
        let value = json!({
            "id": "n1", "kind": "note", "text": "Nota",
            "meta": { "createdAt": 1, "updatedAt": 1, "source": "manual", "color": "yellow" }
        });
        let annotation: Annotation = serde_json::from_value(value).unwrap();
        assert_eq!(annotation.paragraph_index(), None);
        assert_eq!(annotation.meta.extra.get("color"), Some(&json!("yellow")));
        let back = serde_json::to_value(&annotation).unwrap();
        assert_eq!(back["meta"]["color"], "yellow");
    }

    #[test]
    fn test_custom_anchor_type() {
        let anchor_type: AnchorType = "concept-map".into();
        assert_eq!(anchor_type, AnchorType::Custom("concept-map".to_string()));
        assert_eq!(serde_json::to_value(&anchor_type).unwrap(), json!("concept-map"));
        assert_eq!(AnchorType::from("feedback"), AnchorType::Feedback);
    }
}
