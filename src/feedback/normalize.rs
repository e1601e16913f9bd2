//! Raw evaluator output -> `CanonicalFeedback`

use chrono::Utc;
use serde_json::{Map, Value};

use super::models::*;
use super::shapes;
use crate::rubric::{RubricLookup, DEFAULT_DIMENSION};

/// Normalize one evaluation.
///
/// A record that already carries the current `modelVersion` and parses as
/// canonical is returned unchanged. Anything else is read through the
/// provider shapes; unknown dimensions fall back to the rubric default and
/// every list is filtered of empty entries before being capped.
pub fn normalize_feedback_input(raw: &Value, rubric: &dyn RubricLookup) -> CanonicalFeedback {
    if let Some(canonical) = as_canonical(raw) {
        return canonical;
    }

    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);
    let partial = shapes::extract(obj);

    let dimension = rubric.resolve_dimension(partial.dimension.unwrap_or(DEFAULT_DIMENSION));
    let score10 = partial.score;
    let level = score10.and_then(|score| rubric.level_for(&dimension, score));

    let feedback = CanonicalFeedback {
        model_version: FEEDBACK_MODEL_VERSION,
        id: obj.get("id").and_then(scalar_text),
        rubric_criteria: rubric.criteria(&dimension),
        dimension,
        score10,
        level4: level.as_ref().map(|l| l.level),
        level_descriptor: level.map(|l| l.descriptor),
        summary: truncate_utf16(partial.summary.unwrap_or_default(), MAX_SUMMARY_CHARS),
        strengths: map_items(partial.strengths, MAX_STRENGTHS, strength),
        improvements: map_items(partial.improvements, MAX_IMPROVEMENTS, improvement),
        probing_questions: map_items(partial.probing_questions, MAX_PROBING_QUESTIONS, probing_question),
        praxis_suggestions: map_items(partial.praxis_suggestions, MAX_PRAXIS_SUGGESTIONS, praxis),
        evidence: map_items(partial.evidence, MAX_EVIDENCE, evidence),
        timestamp: Utc::now().timestamp_millis(),
    };

    log::debug!(
        "Normalized feedback for {} (shapes: {:?})",
        feedback.dimension,
        shapes::detect(obj)
    );
    feedback
}

/// Normalize an evidence list given as strings or `{quote|text,
/// paragraph|parrafo}` objects. Non-arrays yield an empty list.
pub fn normalize_evidence(raw: &Value) -> Vec<Evidence> {
    let items = raw.as_array().map(|items| items.iter().collect());
    map_items(items, MAX_EVIDENCE, evidence)
}

/// `modelVersion` may arrive as `1` or `1.0` depending on the producer.
fn as_canonical(raw: &Value) -> Option<CanonicalFeedback> {
    let version = raw.get("modelVersion")?.as_f64()?;
    if version != f64::from(FEEDBACK_MODEL_VERSION) {
        return None;
    }
    let mut record = raw.clone();
    record["modelVersion"] = Value::from(FEEDBACK_MODEL_VERSION);
    match serde_json::from_value(record) {
        Ok(canonical) => Some(canonical),
        Err(e) => {
            log::debug!("Record claims modelVersion {} but is not canonical: {}", version, e);
            None
        }
    }
}

/// Drop empty entries, cap, then map.
fn map_items<T>(items: Option<Vec<&Value>>, cap: usize, f: fn(&Value) -> T) -> Vec<T> {
    items
        .unwrap_or_default()
        .into_iter()
        .filter(|v| is_present(v))
        .take(cap)
        .map(f)
        .collect()
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Strings and numbers as text; empty strings count as missing.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(value: &Value, fields: &[&str]) -> Option<String> {
    let obj = value.as_object()?;
    fields.iter().find_map(|f| obj.get(*f).and_then(scalar_text))
}

fn criterion(value: &Value, fallback: &str) -> String {
    let picked = match value {
        Value::String(s) => Some(s.clone()),
        _ => first_text(value, &["criterion", "criterio"]),
    };
    match picked {
        Some(c) if !c.is_empty() => c.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn strength(value: &Value) -> Strength {
    Strength {
        criterion: criterion(value, "Fortaleza"),
        text: match value {
            Value::String(s) => s.clone(),
            _ => first_text(value, &["text", "descripcion"]).unwrap_or_default(),
        },
    }
}

fn improvement(value: &Value) -> Improvement {
    Improvement {
        criterion: criterion(value, "Mejora"),
        action: match value {
            Value::String(s) => s.clone(),
            _ => first_text(value, &["action", "accion", "text"]).unwrap_or_default(),
        },
    }
}

fn probing_question(value: &Value) -> ProbingQuestion {
    ProbingQuestion {
        question: match value {
            Value::String(s) => s.clone(),
            _ => first_text(value, &["question", "text"]).unwrap_or_default(),
        },
        purpose: truncate_utf16(
            &first_text(value, &["purpose", "objetivo"]).unwrap_or_default(),
            MAX_PURPOSE_CHARS,
        ),
    }
}

fn praxis(value: &Value) -> PraxisSuggestion {
    PraxisSuggestion {
        action: match value {
            Value::String(s) => s.clone(),
            _ => first_text(value, &["action", "text"]).unwrap_or_default(),
        },
        scope: first_text(value, &["scope", "ambito"]).unwrap_or_default(),
    }
}

fn evidence(value: &Value) -> Evidence {
    match value {
        Value::String(s) => Evidence {
            quote: truncate_utf16(s, MAX_QUOTE_CHARS),
            paragraph: None,
        },
        _ => Evidence {
            quote: truncate_utf16(
                &first_text(value, &["quote", "text"]).unwrap_or_default(),
                MAX_QUOTE_CHARS,
            ),
            paragraph: value
                .get("paragraph")
                .and_then(paragraph_index)
                .or_else(|| value.get("parrafo").and_then(paragraph_index)),
        },
    }
}

/// Whole, non-negative numbers only.
fn paragraph_index(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    let f = value.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 {
        Some(f as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::CriticalLiteracyRubric;
    use serde_json::json;

    fn normalize(raw: Value) -> CanonicalFeedback {
        normalize_feedback_input(&raw, &CriticalLiteracyRubric::new())
    }

    #[test]
    fn test_english_payload() {
        let feedback = normalize(json!({
            "id": "fb-1",
            "dimension": "ACD",
            "score": 8,
            "summary": "Buen análisis",
            "strengths": [{ "criterion": " Voces ", "text": "Identifica voces" }],
            "improvements": [{ "criterion": "Léxico", "action": "Analizar metáforas" }],
            "probingQuestions": [{ "question": "¿Quién se beneficia?", "purpose": "intereses" }],
            "praxisSuggestions": [{ "action": "Debatir", "scope": "aula" }],
            "evidence": [{ "quote": "la crisis", "paragraph": 2 }]
        }));
        assert_eq!(feedback.model_version, FEEDBACK_MODEL_VERSION);
        assert_eq!(feedback.id.as_deref(), Some("fb-1"));
        assert_eq!(feedback.dimension, "acd");
        assert_eq!(feedback.score10, Some(8.0));
        assert_eq!(feedback.level4, Some(3));
        assert!(feedback.level_descriptor.unwrap().starts_with("Adecuado"));
        assert_eq!(feedback.strengths[0].criterion, "Voces");
        assert_eq!(feedback.improvements[0].action, "Analizar metáforas");
        assert_eq!(feedback.probing_questions[0].purpose, "intereses");
        assert_eq!(feedback.praxis_suggestions[0].scope, "aula");
        assert_eq!(feedback.evidence[0].paragraph, Some(2));
        assert_eq!(feedback.rubric_criteria.len(), 5);
        assert!(feedback.timestamp > 0);
    }

    #[test]
    fn test_spanish_legacy_payload() {
        let feedback = normalize(json!({
            "dim": "Contextualización",
            "puntaje": 5,
            "resumen": "Resumen",
            "puntos_fuertes": ["Sitúa el texto"],
            "sugerencias": [{ "criterio": "Actores", "accion": "Nombrar actores" }],
            "preguntas_profundizacion": [{ "text": "¿Qué evento?", "objetivo": "contexto" }],
            "sugerencias_praxis": [{ "text": "Entrevista", "ambito": "comunidad" }],
            "evidencia": [{ "text": "en 1973", "parrafo": 1 }]
        }));
        assert_eq!(feedback.dimension, "contextualizacion");
        assert_eq!(feedback.level4, Some(2));
        assert_eq!(feedback.summary, "Resumen");
        assert_eq!(feedback.strengths[0].criterion, "Sitúa el texto");
        assert_eq!(feedback.strengths[0].text, "Sitúa el texto");
        assert_eq!(feedback.improvements[0].criterion, "Actores");
        assert_eq!(feedback.improvements[0].action, "Nombrar actores");
        assert_eq!(feedback.probing_questions[0].question, "¿Qué evento?");
        assert_eq!(feedback.probing_questions[0].purpose, "contexto");
        assert_eq!(feedback.praxis_suggestions[0].action, "Entrevista");
        assert_eq!(feedback.evidence[0].quote, "en 1973");
        assert_eq!(feedback.evidence[0].paragraph, Some(1));
    }

    #[test]
    fn test_dual_evaluator_payload() {
        let feedback = normalize(json!({
            "dimension": "acd",
            "fortalezas_estructurales": ["Identifica marco"],
            "mejoras_precision": ["Citar con precisión"],
            "fortalezas_criticas": ["Detecta silencios"],
            "oportunidades_profundizacion": ["Profundizar en intereses económicos"]
        }));
        assert_eq!(feedback.strengths.len(), 2);
        assert_eq!(feedback.improvements.len(), 2);
        assert_eq!(feedback.improvements[1].criterion, "Profundizar en intereses económicos");
        assert_eq!(feedback.score10, None);
        assert_eq!(feedback.level4, None);
    }

    #[test]
    fn test_object_items_without_criterion_get_fallback() {
        let feedback = normalize(json!({
            "strengths": [{ "text": "Algo bien" }],
            "improvements": [{ "action": "Algo mejor" }]
        }));
        assert_eq!(feedback.strengths[0].criterion, "Fortaleza");
        assert_eq!(feedback.improvements[0].criterion, "Mejora");
    }

    #[test]
    fn test_caps_and_empty_items() {
        let strengths: Vec<Value> = (0..12).map(|i| json!(format!("s{}", i))).collect();
        let mut improvements = vec![Value::Null, json!(""), json!(false)];
        improvements.extend((0..10).map(|i| json!(format!("m{}", i))));
        let evidence: Vec<Value> = (0..15).map(|_| json!("x".repeat(400))).collect();
        let questions: Vec<Value> = (0..9)
            .map(|i| json!({ "question": i.to_string(), "purpose": "p".repeat(200) }))
            .collect();
        let praxis: Vec<Value> = (0..9).map(|i| json!(i.to_string())).collect();

        let feedback = normalize(json!({
            "summary": "y".repeat(2000),
            "strengths": strengths,
            "improvements": improvements,
            "probingQuestions": questions,
            "praxisSuggestions": praxis,
            "evidence": evidence
        }));
        assert_eq!(feedback.strengths.len(), MAX_STRENGTHS);
        assert_eq!(feedback.improvements.len(), MAX_IMPROVEMENTS);
        assert_eq!(feedback.improvements[0].action, "m0");
        assert_eq!(feedback.probing_questions.len(), MAX_PROBING_QUESTIONS);
        assert_eq!(feedback.probing_questions[0].purpose.chars().count(), MAX_PURPOSE_CHARS);
        assert_eq!(feedback.praxis_suggestions.len(), MAX_PRAXIS_SUGGESTIONS);
        assert_eq!(feedback.evidence.len(), MAX_EVIDENCE);
        assert_eq!(feedback.evidence[0].quote.chars().count(), MAX_QUOTE_CHARS);
        assert_eq!(feedback.summary.chars().count(), MAX_SUMMARY_CHARS);
    }

    #[test]
    fn test_unknown_dimension_and_bad_score() {
        let feedback = normalize(json!({ "dimension": "astrología", "score": 42 }));
        assert_eq!(feedback.dimension, "comprensionAnalitica");
        assert_eq!(feedback.score10, Some(42.0));
        assert_eq!(feedback.level4, None);
        assert_eq!(feedback.level_descriptor, None);
    }

    #[test]
    fn test_non_object_input() {
        let feedback = normalize(json!("texto"));
        assert_eq!(feedback.dimension, "comprensionAnalitica");
        assert!(feedback.strengths.is_empty());
        assert_eq!(feedback.summary, "");
    }

    #[test]
    fn test_canonical_is_identity() {
        let rubric = CriticalLiteracyRubric::new();
        let first = normalize(json!({
            "dimension": "argumentacion",
            "score": 9.5,
            "improvements": ["Anticipar objeciones"]
        }));
        let value = serde_json::to_value(&first).unwrap();
        let second = normalize_feedback_input(&value, &rubric);
        assert_eq!(second, first);

        let third = normalize_feedback_input(&serde_json::to_value(&second).unwrap(), &rubric);
        assert_eq!(third, first);
    }

    #[test]
    fn test_float_model_version_is_canonical() {
        let rubric = CriticalLiteracyRubric::new();
        let first = normalize(json!({ "dimension": "acd", "score": 6, "summary": "ok" }));
        let mut value = serde_json::to_value(&first).unwrap();
        value["modelVersion"] = json!(1.0);
        value["timestamp"] = json!(42);

        let second = normalize_feedback_input(&value, &rubric);
        assert_eq!(second.timestamp, 42);
        assert_eq!(second.model_version, FEEDBACK_MODEL_VERSION);
        assert_eq!(second.summary, "ok");

        value["modelVersion"] = json!(1.5);
        assert_ne!(normalize_feedback_input(&value, &rubric).timestamp, 42);
    }

    #[test]
    fn test_normalize_evidence() {
        let evidence = normalize_evidence(&json!([
            "cita suelta",
            null,
            { "quote": "con párrafo", "paragraph": 3 },
            { "text": "párrafo inválido", "paragraph": -1, "parrafo": 2.5 }
        ]));
        assert_eq!(evidence.len(), 3);
        assert_eq!(evidence[0].paragraph, None);
        assert_eq!(evidence[1].paragraph, Some(3));
        assert_eq!(evidence[2].quote, "párrafo inválido");
        assert_eq!(evidence[2].paragraph, None);

        assert!(normalize_evidence(&json!({ "quote": "no es lista" })).is_empty());
    }
}
