use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use lectura_lib::annotations::{AnchorType, AnnotationFilter, AnnotationStore, NewNote};
use lectura_lib::assessment::{record_evaluation, AssessmentBridge, SocraticQuestion};
use lectura_lib::backend::{FileBackend, KeyValueBackend};
use lectura_lib::config::LecturaConfig;
use lectura_lib::spaced::algorithm::create_study_item_at;
use lectura_lib::spaced::{
    create_study_item, next_interval_days, schedule_next_at, NewStudyItem, ReviewState, StudyItemStore,
};

const TEXT: &str = "El discurso construye sujetos.\n\nLa ideología se naturaliza.\n\nToda lectura es situada.";

fn config_for(dir: &TempDir) -> LecturaConfig {
    LecturaConfig::from_toml_str(&format!(
        "[storage]\ndata_dir = {:?}\ndebounce_ms = 10\n",
        dir.path().display().to_string()
    ))
    .unwrap()
}

fn open_stores(config: &LecturaConfig) -> (AnnotationStore, StudyItemStore) {
    let backend: Arc<dyn KeyValueBackend> = Arc::new(FileBackend::new(config.data_dir().unwrap()));
    (
        AnnotationStore::with_config(backend.clone(), config.annotation_store_config()),
        StudyItemStore::with_config(backend, config.study_store_config()),
    )
}

fn evaluator_payload() -> serde_json::Value {
    json!({
        "id": "eval-1",
        "dimension": "Análisis ideológico-discursivo",
        "score": 7,
        "summary": "Identifica la ideología pero no la contextualiza.",
        "strengths": [{ "criterion": "Identificación", "text": "Señala la naturalización" }],
        "improvements": [
            { "criterion": "Contexto", "action": "Relaciona el texto con su momento histórico" },
            { "criterion": "Voces", "action": "Nombra quién habla" }
        ],
        "evidence": [{ "quote": "La ideología se naturaliza", "paragraph": 1 }]
    })
}

#[test]
fn test_evaluation_survives_reload() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);

    let (annotations, study_items) = open_stores(&config);
    let bridge = AssessmentBridge::new(annotations.clone(), TEXT).unwrap();
    let outcome = record_evaluation(&bridge, &study_items, 1, &evaluator_payload()).unwrap();

    assert_eq!(outcome.feedback.dimension, "acd");
    assert_eq!(outcome.feedback.level4, Some(3));
    assert_eq!(outcome.study_items_added.len(), 2);
    assert_eq!(
        outcome.study_items_added[0].content,
        "Relaciona el texto con su momento histórico"
    );

    let study_key = study_items.compute_key_from_text(TEXT).unwrap();
    annotations.flush(bridge.key());
    study_items.flush(&study_key);

    // Fresh stores over the same directory see the persisted state.
    let (annotations, study_items) = open_stores(&config);
    let reloaded = AssessmentBridge::new(annotations, TEXT).unwrap();
    let bundle = reloaded.bundle();
    assert_eq!(bundle.anchors.len(), 1);
    assert_eq!(bundle.anchors[0].anchor_type(), Some(&AnchorType::Feedback));
    assert_eq!(bundle.anchors[0].meta.ref_id.as_deref(), Some("eval-1"));
    assert_eq!(bundle.by_paragraph[&1].anchors.len(), 1);

    assert_eq!(study_items.list(&study_key).len(), 2);

    // Same evaluation again adds nothing new.
    let again = record_evaluation(&reloaded, &study_items, 1, &evaluator_payload()).unwrap();
    assert!(again.study_items_added.is_empty());
    assert_eq!(study_items.list(&study_key).len(), 2);
}

#[test]
fn test_debounced_write_lands_without_flush() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);

    let (annotations, _) = open_stores(&config);
    let key = annotations.compute_key_from_text(TEXT).unwrap();
    annotations.add_highlight(&key, 0, None, None);

    thread::sleep(Duration::from_millis(500));

    let (annotations, _) = open_stores(&config);
    assert_eq!(annotations.list_highlights(&key, &AnnotationFilter::default()).len(), 1);
}

#[test]
fn test_review_cycle_persists() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let (_, study_items) = open_stores(&config);
    let key = study_items.compute_key_from_text(TEXT).unwrap();

    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let item = create_study_item_at(
        NewStudyItem {
            content: "Explica qué significa naturalizar".to_string(),
            ..Default::default()
        },
        start,
    );
    let id = item.item_id.clone();
    study_items.add_items(&key, vec![item]);
    assert_eq!(study_items.get_due(&key, start).len(), 1);

    let first = study_items.update_item_at(&key, &id, 5.0, start).unwrap().unwrap();
    assert_eq!(first.schedule.interval, 1);
    let second = study_items
        .update_item_at(&key, &id, 4.0, first.due_date)
        .unwrap()
        .unwrap();
    assert_eq!(second.schedule.interval, 6);
    assert_eq!(second.review_count, 2);
    assert_eq!(second.average_quality, 4.5);
    study_items.flush(&key);

    let (_, study_items) = open_stores(&config);
    let stored = &study_items.list(&key)[0];
    assert_eq!(stored.schedule, second.schedule);
    assert_eq!(stored.due_date, second.due_date);
    assert!(study_items.get_due(&key, first.due_date).is_empty());
}

#[test]
fn test_new_item_scheduled_with_perfect_recall() {
    let item = create_study_item(NewStudyItem {
        content: "¿Qué voz domina el texto?".to_string(),
        ..Default::default()
    });
    assert_eq!(item.schedule, ReviewState::default());
    assert_eq!(item.dimension, "comprensionAnalitica");

    let now = Utc::now();
    let review = schedule_next_at(item.schedule, 5.0, now).unwrap();
    assert_eq!(review.state.interval, 1);
    assert_eq!(review.state.repetition, 1);
    assert!((review.state.ef - 2.6).abs() < 1e-9);
    assert_eq!(review.due_date, now + chrono::Duration::days(1));
}

#[test]
fn test_forgotten_card_restarts() {
    let state = ReviewState {
        interval: 10,
        repetition: 3,
        ef: 2.5,
    };
    let next = next_interval_days(state, 2.0).unwrap();
    assert_eq!(next.interval, 1);
    assert_eq!(next.repetition, 0);
    assert!(next.ef < 2.5);
}

#[test]
fn test_toggle_twice_restores_state() {
    let dir = TempDir::new().unwrap();
    let (annotations, _) = open_stores(&config_for(&dir));
    let key = annotations.compute_key_from_text(TEXT).unwrap();
    annotations.add_note(
        &key,
        NewNote {
            paragraph_index: Some(2),
            text: "situada ¿para quién?".to_string(),
            ..Default::default()
        },
    );
    let before = annotations.list_by_storage_key(&key, &AnnotationFilter::default());

    assert!(annotations.toggle_highlight(&key, 2, None).active);
    assert!(!annotations.toggle_highlight(&key, 2, None).active);

    assert_eq!(annotations.list_by_storage_key(&key, &AnnotationFilter::default()), before);
}

#[test]
fn test_subscriber_sees_replay_and_updates() {
    let dir = TempDir::new().unwrap();
    let (annotations, _) = open_stores(&config_for(&dir));
    let bridge = AssessmentBridge::new(annotations.clone(), TEXT).unwrap();
    bridge
        .register_socratic_questions(0, &[SocraticQuestion::from("¿Qué sujetos construye?")])
        .unwrap();

    let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = annotations.subscribe(bridge.key(), move |items| {
        sink.lock().unwrap().push(items.len());
    });

    bridge.register_feedback(0, &json!({ "score": 4 })).unwrap();
    drop(subscription);
    bridge.register_feedback(0, &json!({ "score": 9 })).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}
