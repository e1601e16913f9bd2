//! Rubric lookup
//!
//! The feedback model only needs three things from a rubric: resolving a
//! free-form dimension name to a key, the criteria of a dimension, and the
//! level a score falls into. `RubricLookup` is that seam;
//! `CriticalLiteracyRubric` is the built-in implementation.

mod critical_literacy;

use serde::Serialize;

pub use critical_literacy::{score_to_level, CriticalLiteracyRubric, DEFAULT_DIMENSION};

/// One scored dimension of a rubric.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricDimension {
    pub key: &'static str,
    pub nombre: &'static str,
    pub descripcion: &'static str,
    pub criterios: &'static [&'static str],
    /// Descriptors for levels 1 to 4
    pub niveles: [&'static str; 4],
    pub preguntas_guia: &'static [&'static str],
}

/// Level (1-4) and its descriptor for a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSummary {
    pub level: u8,
    pub descriptor: String,
}

pub trait RubricLookup: Send + Sync {
    /// Canonical dimension key for `input`. Unknown input maps to the
    /// rubric's default dimension.
    fn resolve_dimension(&self, input: &str) -> String;

    fn dimension(&self, key: &str) -> Option<&RubricDimension>;

    /// `None` when the score is outside the rubric's scale.
    fn level_for(&self, key: &str, score: f64) -> Option<LevelSummary>;

    fn criteria(&self, key: &str) -> Vec<String> {
        self.dimension(key)
            .map(|d| d.criterios.iter().map(|c| c.to_string()).collect())
            .unwrap_or_default()
    }
}
