//! Per-text view over the annotation store

use std::sync::Arc;

use serde_json::{json, Value};

use super::models::*;
use super::{AssessmentError, Result};
use crate::annotations::{AnchorType, Annotation, AnnotationStore, NewAnchor};
use crate::feedback::{feedback_to_study_items, normalize_feedback_input, CanonicalFeedback};
use crate::fingerprint::StorageKey;
use crate::rubric::{CriticalLiteracyRubric, RubricLookup};
use crate::spaced::StudyItemStore;

/// Binds one text to its annotations. Bridges built over the same text
/// and store see the same entry.
#[derive(Clone)]
pub struct AssessmentBridge {
    store: AnnotationStore,
    rubric: Arc<dyn RubricLookup>,
    text: Arc<str>,
    key: StorageKey,
}

impl AssessmentBridge {
    /// Fails with `InvalidText` when `text` is empty or whitespace.
    pub fn new(store: AnnotationStore, text: &str) -> Result<Self> {
        Self::with_rubric(store, text, Arc::new(CriticalLiteracyRubric::new()))
    }

    pub fn with_rubric(
        store: AnnotationStore,
        text: &str,
        rubric: Arc<dyn RubricLookup>,
    ) -> Result<Self> {
        let key = store
            .compute_key_from_text(text)
            .ok_or(AssessmentError::InvalidText)?;
        Ok(Self {
            store,
            rubric,
            text: Arc::from(text),
            key,
        })
    }

    pub fn key(&self) -> &StorageKey {
        &self.key
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rubric(&self) -> &dyn RubricLookup {
        self.rubric.as_ref()
    }

    /// Snapshot of every annotation, also indexed by paragraph.
    pub fn bundle(&self) -> AssessmentBundle {
        AssessmentBundle::from(self.store.to_export_bundle(&self.key))
    }

    /// Anchor each question on `paragraph_index` as a `question` anchor.
    pub fn register_socratic_questions(
        &self,
        paragraph_index: usize,
        questions: &[SocraticQuestion],
    ) -> Result<Vec<Annotation>> {
        questions
            .iter()
            .map(|q| -> Result<Annotation> {
                let anchor = NewAnchor::new(
                    paragraph_index,
                    AnchorType::Question,
                    json!({ "question": q.question, "dimension": q.dimension }),
                )
                .with_ref_id(q.id.clone());
                Ok(self.store.add_anchor(&self.key, anchor)?)
            })
            .collect()
    }

    /// Normalize `raw` and anchor it on `paragraph_index`.
    pub fn register_feedback(&self, paragraph_index: usize, raw: &Value) -> Result<Annotation> {
        let feedback = normalize_feedback_input(raw, self.rubric.as_ref());
        self.register_canonical_feedback(paragraph_index, &feedback)
    }

    /// Anchor an already normalized record.
    pub fn register_canonical_feedback(
        &self,
        paragraph_index: usize,
        feedback: &CanonicalFeedback,
    ) -> Result<Annotation> {
        let data = serde_json::to_value(feedback)?;
        let anchor = NewAnchor::new(paragraph_index, AnchorType::Feedback, data)
            .with_ref_id(feedback.id.clone());
        Ok(self.store.add_anchor(&self.key, anchor)?)
    }

    pub fn build_assessment_item(&self, input: NewAssessmentItem) -> AssessmentItem {
        AssessmentItem::build(input)
    }
}

/// Run one raw evaluation through the whole pipeline: normalize it, anchor
/// it on `paragraph_index`, derive study items and store the new ones
/// under the same text.
pub fn record_evaluation(
    bridge: &AssessmentBridge,
    study_store: &StudyItemStore,
    paragraph_index: usize,
    raw: &Value,
) -> Result<EvaluationOutcome> {
    let feedback = normalize_feedback_input(raw, bridge.rubric());
    let anchor = bridge.register_canonical_feedback(paragraph_index, &feedback)?;

    let study_key = study_store
        .compute_key_from_text(bridge.text())
        .ok_or(AssessmentError::InvalidText)?;
    let study_items_added = study_store.add_items(&study_key, feedback_to_study_items(&feedback));

    log::info!(
        "Recorded {} evaluation on paragraph {} ({} new study item(s))",
        feedback.dimension,
        paragraph_index,
        study_items_added.len()
    );

    Ok(EvaluationOutcome {
        feedback,
        anchor,
        study_items_added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{AnnotationFilter, NewNote};
    use crate::backend::MemoryBackend;

    const TEXT: &str = "Primer párrafo.\n\nSegundo párrafo sobre el discurso.";

    fn create_test_bridge() -> (AssessmentBridge, AnnotationStore) {
        let store = AnnotationStore::new(Arc::new(MemoryBackend::new()));
        let bridge = AssessmentBridge::new(store.clone(), TEXT).unwrap();
        (bridge, store)
    }

    #[test]
    fn test_invalid_text() {
        let store = AnnotationStore::new(Arc::new(MemoryBackend::new()));
        assert!(matches!(
            AssessmentBridge::new(store.clone(), ""),
            Err(AssessmentError::InvalidText)
        ));
        assert!(AssessmentBridge::new(store, "  \n ").is_err());
    }

    #[test]
    fn test_bridges_share_entry() {
        let (bridge, store) = create_test_bridge();
        let other = AssessmentBridge::new(store, TEXT).unwrap();
        assert_eq!(bridge.key(), other.key());

        bridge
            .register_socratic_questions(0, &[SocraticQuestion::from("¿Qué afirma?")])
            .unwrap();
        assert_eq!(other.bundle().anchors.len(), 1);
    }

    #[test]
    fn test_register_socratic_questions() {
        let (bridge, store) = create_test_bridge();
        let questions = vec![
            SocraticQuestion {
                id: Some("q1".to_string()),
                question: "¿Quién habla?".to_string(),
                dimension: Some("acd".to_string()),
            },
            SocraticQuestion::from("¿Qué se omite?"),
        ];
        let anchors = bridge.register_socratic_questions(1, &questions).unwrap();
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].meta.ref_id.as_deref(), Some("q1"));
        assert_eq!(anchors[0].meta.data.as_ref().unwrap()["question"], "¿Quién habla?");
        assert_eq!(anchors[0].meta.data.as_ref().unwrap()["dimension"], "acd");
        assert_eq!(anchors[1].meta.ref_id, None);

        let listed = store.list_anchors(bridge.key(), &AnnotationFilter::anchor_type(AnchorType::Question));
        assert_eq!(listed.len(), 2);
        assert!(bridge.register_socratic_questions(1, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_register_feedback_stores_normalized_record() {
        let (bridge, _store) = create_test_bridge();
        let anchor = bridge
            .register_feedback(
                1,
                &json!({ "id": "eval-7", "dim": "ACD", "score": 9, "mejoras": ["Analizar silencios"] }),
            )
            .unwrap();

        assert_eq!(anchor.anchor_type(), Some(&AnchorType::Feedback));
        assert_eq!(anchor.meta.ref_id.as_deref(), Some("eval-7"));
        assert_eq!(anchor.meta.source, "auto");
        let data = anchor.meta.data.as_ref().unwrap();
        assert_eq!(data["modelVersion"], 1);
        assert_eq!(data["dimension"], "acd");
        assert_eq!(data["level4"], 4);
        assert_eq!(data["improvements"][0]["action"], "Analizar silencios");
    }

    #[test]
    fn test_bundle_indexes_by_paragraph() {
        let (bridge, store) = create_test_bridge();
        store.add_highlight(bridge.key(), 0, Some("Primer párrafo"), None);
        store.add_note(bridge.key(), NewNote {
            paragraph_index: Some(1),
            text: "Nota".to_string(),
            ..Default::default()
        });
        store.add_note(bridge.key(), NewNote {
            text: "Flotante".to_string(),
            ..Default::default()
        });
        bridge
            .register_socratic_questions(1, &[SocraticQuestion::from("¿Por qué?")])
            .unwrap();

        let bundle = bridge.bundle();
        assert_eq!(bundle.version, 1);
        assert_eq!(bundle.notes.len(), 2);
        assert_eq!(bundle.by_paragraph.len(), 2);
        assert_eq!(bundle.by_paragraph[&0].highlights.len(), 1);
        assert_eq!(bundle.by_paragraph[&1].notes.len(), 1);
        assert_eq!(bundle.by_paragraph[&1].anchors.len(), 1);

        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["byParagraph"]["1"]["anchors"][0]["kind"], "anchor");
    }

    #[test]
    fn test_build_assessment_item() {
        let (bridge, _store) = create_test_bridge();
        let item = bridge.build_assessment_item(NewAssessmentItem {
            paragraph_index: Some(1),
            prompt: "Explica la tesis".to_string(),
            expected: Some("La tesis es...".to_string()),
            rubric_dimension: Some("comprensionAnalitica".to_string()),
            ..Default::default()
        });
        assert_eq!(item.id().len(), 8);
        assert_eq!(item.paragraph_index(), Some(1));
        assert_eq!(item.prompt(), "Explica la tesis");
        assert_eq!(item.rubric_dimension(), Some("comprensionAnalitica"));
        assert!(item.created_at() > 0);
        assert!(item.meta().is_empty());

        let other = bridge.build_assessment_item(NewAssessmentItem::default());
        assert_ne!(item.id(), other.id());
    }

    #[test]
    fn test_record_evaluation() {
        let (bridge, _store) = create_test_bridge();
        let study_store = StudyItemStore::new(Arc::new(MemoryBackend::new()));
        let raw = json!({
            "dimension": "argumentacion",
            "score": 7,
            "improvements": [
                { "criterion": "Objeciones", "action": "Anticipa al menos una objeción" },
                { "criterion": "Evidencia", "action": "Cita el texto" }
            ]
        });

        let outcome = record_evaluation(&bridge, &study_store, 1, &raw).unwrap();
        assert_eq!(outcome.feedback.level4, Some(3));
        assert_eq!(outcome.anchor.paragraph_index(), Some(1));
        assert_eq!(outcome.study_items_added.len(), 2);
        assert_eq!(outcome.study_items_added[0].content, "Anticipa al menos una objeción");

        // Same evaluation again: a second anchor, but no duplicate study items
        let again = record_evaluation(&bridge, &study_store, 1, &raw).unwrap();
        assert!(again.study_items_added.is_empty());
        assert_eq!(bridge.bundle().anchors.len(), 2);

        let study_key = study_store.compute_key_from_text(TEXT).unwrap();
        assert_eq!(study_store.list(&study_key).len(), 2);
    }
}
