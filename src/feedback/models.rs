//! Canonical feedback record

use serde::{Deserialize, Serialize};

/// Version of the canonical schema. Records carrying it are already normalized.
pub const FEEDBACK_MODEL_VERSION: u32 = 1;

pub const MAX_STRENGTHS: usize = 8;
pub const MAX_IMPROVEMENTS: usize = 8;
pub const MAX_PROBING_QUESTIONS: usize = 6;
pub const MAX_PRAXIS_SUGGESTIONS: usize = 6;
pub const MAX_EVIDENCE: usize = 10;

pub const MAX_SUMMARY_CHARS: usize = 1200;
pub const MAX_QUOTE_CHARS: usize = 280;
pub const MAX_PURPOSE_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strength {
    pub criterion: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub criterion: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbingQuestion {
    pub question: String,
    #[serde(default)]
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PraxisSuggestion {
    pub action: String,
    #[serde(default)]
    pub scope: String,
}

/// A quote backing the evaluation, optionally tied to a paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub quote: String,
    /// Serialized as `null` when unknown
    #[serde(default)]
    pub paragraph: Option<usize>,
}

/// One evaluation of one rubric dimension, in the shape every consumer
/// (anchors, study items, history) reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalFeedback {
    pub model_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub dimension: String,
    /// 0-10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score10: Option<f64>,
    /// 1-4, derived from `score10`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level4: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_descriptor: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<Strength>,
    #[serde(default)]
    pub improvements: Vec<Improvement>,
    #[serde(default)]
    pub probing_questions: Vec<ProbingQuestion>,
    #[serde(default)]
    pub praxis_suggestions: Vec<PraxisSuggestion>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub rubric_criteria: Vec<String>,
    /// Epoch milliseconds of normalization
    #[serde(default)]
    pub timestamp: i64,
}

impl CanonicalFeedback {
    /// Truncate every list and text field to its cap.
    pub(crate) fn apply_caps(&mut self) {
        self.strengths.truncate(MAX_STRENGTHS);
        self.improvements.truncate(MAX_IMPROVEMENTS);
        self.probing_questions.truncate(MAX_PROBING_QUESTIONS);
        self.praxis_suggestions.truncate(MAX_PRAXIS_SUGGESTIONS);
        self.evidence.truncate(MAX_EVIDENCE);
        self.summary = truncate_utf16(&self.summary, MAX_SUMMARY_CHARS);
    }
}

/// Longest prefix of `s` that fits in `max` UTF-16 code units, cut on a
/// character boundary. Lengths are counted the way the web client counts
/// them, so astral characters take two units.
pub(crate) fn truncate_utf16(s: &str, max: usize) -> String {
    let mut units = 0;
    for (idx, c) in s.char_indices() {
        units += c.len_utf16();
        if units > max {
            return s[..idx].to_string();
        }
    }
    s.to_string()
}

/// Length in UTF-16 code units.
pub(crate) fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_utf16_respects_boundaries() {
        assert_eq!(truncate_utf16("análisis", 3), "aná");
        assert_eq!(truncate_utf16("corto", 10), "corto");
        assert_eq!(truncate_utf16("", 3), "");
    }

    #[test]
    fn test_astral_characters_count_twice() {
        assert_eq!(utf16_len("📚a"), 3);
        assert_eq!(truncate_utf16("📚📚", 3), "📚");
        assert_eq!(truncate_utf16("📚📚", 4), "📚📚");
        // Never splits a surrogate pair
        assert_eq!(truncate_utf16("a📚", 2), "a");
    }

    #[test]
    fn test_canonical_json_shape() {
        let feedback = CanonicalFeedback {
            model_version: FEEDBACK_MODEL_VERSION,
            id: None,
            dimension: "acd".to_string(),
            score10: Some(7.0),
            level4: Some(3),
            level_descriptor: Some("Adecuado".to_string()),
            summary: String::new(),
            strengths: vec![],
            improvements: vec![],
            probing_questions: vec![],
            praxis_suggestions: vec![],
            evidence: vec![Evidence {
                quote: "cita".to_string(),
                paragraph: None,
            }],
            rubric_criteria: vec![],
            timestamp: 1,
        };
        let value = serde_json::to_value(&feedback).unwrap();
        assert_eq!(value["modelVersion"], 1);
        assert_eq!(value["score10"], 7.0);
        assert_eq!(value["level4"], 3);
        assert_eq!(value["levelDescriptor"], "Adecuado");
        assert_eq!(value["evidence"][0], json!({ "quote": "cita", "paragraph": null }));
        assert!(value.get("id").is_none());
    }
}
