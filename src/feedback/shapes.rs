//! Provider payload shapes
//!
//! Evaluators have used several field vocabularies over time. Each shape
//! knows one vocabulary and pulls out whatever fields it recognises; the
//! shapes are applied in order and the first one that defines a field wins.

use serde_json::{Map, Value};

/// Fields found in a raw payload, not yet validated or capped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialFeedback<'a> {
    pub dimension: Option<&'a str>,
    pub score: Option<f64>,
    pub summary: Option<&'a str>,
    pub strengths: Option<Vec<&'a Value>>,
    pub improvements: Option<Vec<&'a Value>>,
    pub probing_questions: Option<Vec<&'a Value>>,
    pub praxis_suggestions: Option<Vec<&'a Value>>,
    pub evidence: Option<Vec<&'a Value>>,
}

impl<'a> PartialFeedback<'a> {
    /// Keep fields already set, fill the rest from `other`.
    pub fn or(self, other: PartialFeedback<'a>) -> Self {
        Self {
            dimension: self.dimension.or(other.dimension),
            score: self.score.or(other.score),
            summary: self.summary.or(other.summary),
            strengths: self.strengths.or(other.strengths),
            improvements: self.improvements.or(other.improvements),
            probing_questions: self.probing_questions.or(other.probing_questions),
            praxis_suggestions: self.praxis_suggestions.or(other.praxis_suggestions),
            evidence: self.evidence.or(other.evidence),
        }
    }
}

pub trait FeedbackShape: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract<'a>(&self, raw: &'a Map<String, Value>) -> PartialFeedback<'a>;
}

/// Current English field names.
pub struct EnglishShape;

/// Short or alternative English names used by older prompts.
pub struct LegacyAliasShape;

/// Spanish names from the first generation of evaluators.
pub struct SpanishLegacyShape;

/// Output of the two-model (structural + critical) evaluator. Lists from
/// both models are concatenated, structural first.
pub struct DualEvaluatorShape;

impl FeedbackShape for EnglishShape {
    fn name(&self) -> &'static str {
        "english"
    }

    fn extract<'a>(&self, raw: &'a Map<String, Value>) -> PartialFeedback<'a> {
        PartialFeedback {
            dimension: text(raw, "dimension"),
            score: number(raw, "score"),
            summary: text(raw, "summary"),
            strengths: list(raw, "strengths"),
            improvements: list(raw, "improvements"),
            probing_questions: list(raw, "probingQuestions"),
            praxis_suggestions: list(raw, "praxisSuggestions"),
            evidence: list(raw, "evidence"),
        }
    }
}

impl FeedbackShape for LegacyAliasShape {
    fn name(&self) -> &'static str {
        "legacy-alias"
    }

    fn extract<'a>(&self, raw: &'a Map<String, Value>) -> PartialFeedback<'a> {
        PartialFeedback {
            dimension: text(raw, "dim").or_else(|| text(raw, "name")),
            score: number(raw, "score10"),
            summary: text(raw, "overview"),
            ..Default::default()
        }
    }
}

impl FeedbackShape for SpanishLegacyShape {
    fn name(&self) -> &'static str {
        "spanish-legacy"
    }

    fn extract<'a>(&self, raw: &'a Map<String, Value>) -> PartialFeedback<'a> {
        PartialFeedback {
            dimension: None,
            score: number(raw, "puntuacion").or_else(|| number(raw, "puntaje")),
            summary: text(raw, "resumen"),
            strengths: list(raw, "puntos_fuertes").or_else(|| list(raw, "fortalezas")),
            improvements: list(raw, "areas_crecimiento")
                .or_else(|| list(raw, "sugerencias"))
                .or_else(|| list(raw, "mejoras")),
            probing_questions: list(raw, "preguntas_profundizacion"),
            praxis_suggestions: list(raw, "sugerencias_praxis"),
            evidence: list(raw, "evidencia").or_else(|| list(raw, "citas")),
        }
    }
}

impl FeedbackShape for DualEvaluatorShape {
    fn name(&self) -> &'static str {
        "dual-evaluator"
    }

    fn extract<'a>(&self, raw: &'a Map<String, Value>) -> PartialFeedback<'a> {
        PartialFeedback {
            dimension: text(raw, "dimension_key"),
            strengths: concat(list(raw, "fortalezas_estructurales"), list(raw, "fortalezas_criticas")),
            improvements: concat(
                list(raw, "mejoras_precision"),
                list(raw, "oportunidades_profundizacion"),
            ),
            ..Default::default()
        }
    }
}

/// Shapes in precedence order.
pub static SHAPES: [&dyn FeedbackShape; 4] = [
    &EnglishShape,
    &LegacyAliasShape,
    &SpanishLegacyShape,
    &DualEvaluatorShape,
];

/// Run every shape over `raw` and combine the results.
pub fn extract<'a>(raw: &'a Map<String, Value>) -> PartialFeedback<'a> {
    SHAPES
        .iter()
        .fold(PartialFeedback::default(), |acc, shape| acc.or(shape.extract(raw)))
}

/// Names of the shapes that recognised at least one field.
pub fn detect(raw: &Map<String, Value>) -> Vec<&'static str> {
    SHAPES
        .iter()
        .filter(|shape| shape.extract(raw) != PartialFeedback::default())
        .map(|shape| shape.name())
        .collect()
}

/// Non-empty string field.
fn text<'a>(raw: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    raw.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn number(raw: &Map<String, Value>, field: &str) -> Option<f64> {
    raw.get(field).and_then(Value::as_f64)
}

/// Array field. An empty array still counts as defined.
fn list<'a>(raw: &'a Map<String, Value>, field: &str) -> Option<Vec<&'a Value>> {
    raw.get(field).and_then(Value::as_array).map(|items| items.iter().collect())
}

fn concat<'a>(a: Option<Vec<&'a Value>>, b: Option<Vec<&'a Value>>) -> Option<Vec<&'a Value>> {
    match (a, b) {
        (Some(mut a), Some(b)) => {
            a.extend(b);
            Some(a)
        }
        (a, b) => a.or(b),
    }
}
