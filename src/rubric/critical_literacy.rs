//! Built-in critical-literacy rubric: four dimensions scored 1-10.

use std::sync::OnceLock;

use regex::Regex;

use super::{LevelSummary, RubricDimension, RubricLookup};

pub const DEFAULT_DIMENSION: &str = "comprensionAnalitica";

pub const SCORE_MIN: f64 = 1.0;
pub const SCORE_MAX: f64 = 10.0;

static DIMENSIONS: [RubricDimension; 4] = [
    RubricDimension {
        key: "comprensionAnalitica",
        nombre: "Comprensión analítica",
        descripcion: "Reconstruye el significado literal e inferencial del texto con evidencia explícita",
        criterios: &[
            "Identifica tesis central con citas precisas",
            "Distingue hechos de opiniones con ejemplos textuales",
            "Parafrasea manteniendo fidelidad conceptual",
            "Analiza estructura argumentativa y jerarquía de ideas",
            "Fundamenta deducciones en evidencia textual explícita",
        ],
        niveles: [
            "Insuficiente: Repite información superficial sin evidencia. No identifica tesis ni distingue tipos de información.",
            "Básico: Identifica ideas principales pero con evidencia escasa o imprecisa. Paráfrasis literal sin análisis.",
            "Adecuado: Parafrasea con fidelidad, distingue información central/secundaria, usa evidencia textual apropiada.",
            "Avanzado: Reconstruye tesis con precisión, analiza estructura argumentativa completa, fundamenta con citas estratégicas.",
        ],
        preguntas_guia: &[
            "¿Cuál es la tesis central y qué evidencias la sustentan?",
            "¿Qué afirmaciones son hechos verificables y cuáles opiniones del autor?",
            "¿Cómo organizó el autor sus argumentos? ¿Qué información es central vs secundaria?",
        ],
    },
    RubricDimension {
        key: "acd",
        nombre: "Análisis ideológico-discursivo (ACD)",
        descripcion: "Desvela ideologías, sesgos y estrategias retóricas que subyacen al discurso",
        criterios: &[
            "Identifica perspectiva ideológica y posicionamiento del autor",
            "Analiza estrategias retóricas y elecciones léxicas intencionadas",
            "Detecta voces autorizadas vs silenciadas o marginadas",
            "Determina intereses, beneficiarios y marcos interpretativos",
            "Examina metáforas, eufemismos y carga valorativa del lenguaje",
        ],
        niveles: [
            "Insuficiente: No reconoce perspectiva ni sesgos. Acepta el texto como neutral u objetivo.",
            "Básico: Identifica algunas estrategias retóricas evidentes pero sin conectar con ideología subyacente.",
            "Adecuado: Analiza marcos interpretativos y voces, identifica algunos sesgos con ejemplos textuales.",
            "Avanzado: Desvela sistemáticamente ideología, intereses y silencios. Analiza estrategias retóricas complejas.",
        ],
        preguntas_guia: &[
            "¿Desde qué perspectiva ideológica se escribe este texto? ¿Qué sesgos detectas?",
            "¿Qué voces tienen autoridad y cuáles están ausentes o silenciadas?",
            "¿A quién beneficia esta interpretación y qué intereses podrían estar en juego?",
            "¿Qué estrategias retóricas usa el autor para persuadir o manipular?",
        ],
    },
    RubricDimension {
        key: "contextualizacion",
        nombre: "Contextualización socio-histórica",
        descripcion: "Sitúa el texto en su entorno de producción y analiza sus implicaciones sociales",
        criterios: &[
            "Identifica actores sociales y políticos relevantes",
            "Conecta con eventos históricos y procesos sociales específicos",
            "Analiza impacto y consecuencias en grupos/comunidades concretas",
            "Ubica en debates públicos y tensiones sociales actuales",
            "Reconoce el texto como intervención en diálogos sociales amplios",
        ],
        niveles: [
            "Insuficiente: Trata el texto como objeto aislado, sin conexión con su contexto social o histórico.",
            "Básico: Menciona contexto general pero sin conexiones específicas con procesos o consecuencias.",
            "Adecuado: Conecta con procesos sociales y actores específicos, identifica algunas implicaciones.",
            "Avanzado: Sitúa sistemáticamente en debates públicos, analiza consecuencias concretas y dinámicas de poder.",
        ],
        preguntas_guia: &[
            "¿En qué contexto socio-político se produce este texto y qué eventos lo influenciaron?",
            "¿Qué actores sociales están involucrados y cómo los afecta?",
            "¿Qué consecuencias reales ha tenido o busca tener este discurso?",
            "¿En qué debates públicos actuales se inscribe esta discusión?",
        ],
    },
    RubricDimension {
        key: "argumentacion",
        nombre: "Argumentación y contraargumento",
        descripcion: "Construye posturas propias y maneja objeciones con pensamiento dialógico",
        criterios: &[
            "Formula postura propia clara y fundamentada",
            "Articula razones lógicas respaldadas por evidencia textual",
            "Anticipa objeciones legítimas y las aborda sistemáticamente",
            "Integra perspectivas alternativas sin debilitar la argumentación",
            "Demuestra pensamiento dialógico y manejo de la complejidad",
        ],
        niveles: [
            "Insuficiente: Expresa opinión personal sin razones ni evidencia. Ignora perspectivas alternativas.",
            "Básico: Ofrece razones generales con evidencia limitada. Reconoce otras perspectivas superficialmente.",
            "Adecuado: Postura fundamentada con evidencia textual, anticipa algunas objeciones principales.",
            "Avanzado: Argumentación robusta, refuta objeciones con rigor, integra complejidad sin simplificar.",
        ],
        preguntas_guia: &[
            "¿Cuál es tu postura fundamentada sobre este tema y qué evidencias del texto la sustentan?",
            "¿Qué objeciones válidas podrían hacer a tu argumento y cómo las responderías?",
            "¿Cómo integras perspectivas alternativas sin debilitar tu posición?",
            "¿Qué limitaciones reconoces en tu propio argumento?",
        ],
    },
];

/// Sanitized spelling -> dimension key
const ALIASES: &[(&str, &str)] = &[
    ("comprensionanalitica", "comprensionAnalitica"),
    ("comprensiónanalítica", "comprensionAnalitica"),
    ("analisisideologicodiscursivo", "acd"),
    ("análisisideológicodiscursivo", "acd"),
    ("acd", "acd"),
    ("contextualizacion", "contextualizacion"),
    ("contextualización", "contextualizacion"),
    ("argumentacion", "argumentacion"),
    ("argumentación", "argumentacion"),
];

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_\sñáéíóúü-]").expect("static pattern"))
}

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_.-]").expect("static pattern"))
}

/// Lower-case, drop punctuation, then drop whitespace and separators.
fn sanitize(input: &str) -> String {
    let lower = input.to_lowercase();
    let kept = disallowed_chars().replace_all(&lower, "");
    separators().replace_all(&kept, "").into_owned()
}

/// Map a 1-10 score onto the four rubric levels.
pub fn score_to_level(score: f64) -> u8 {
    let score = if score.is_nan() {
        SCORE_MIN
    } else {
        score.clamp(SCORE_MIN, SCORE_MAX)
    };
    if score >= 9.0 {
        4
    } else if score >= 7.0 {
        3
    } else if score >= 5.0 {
        2
    } else {
        1
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalLiteracyRubric;

impl CriticalLiteracyRubric {
    pub fn new() -> Self {
        Self
    }

    /// Every dimension, in display order.
    pub fn dimensions(&self) -> impl Iterator<Item = &'static RubricDimension> {
        DIMENSIONS.iter()
    }
}

impl RubricLookup for CriticalLiteracyRubric {
    fn resolve_dimension(&self, input: &str) -> String {
        if input.trim().is_empty() {
            return DEFAULT_DIMENSION.to_string();
        }
        let sanitized = sanitize(input);
        if let Some((_, key)) = ALIASES.iter().find(|(alias, _)| *alias == sanitized) {
            return (*key).to_string();
        }
        if self.dimension(input).is_some() {
            return input.to_string();
        }
        DEFAULT_DIMENSION.to_string()
    }

    fn dimension(&self, key: &str) -> Option<&RubricDimension> {
        DIMENSIONS.iter().find(|d| d.key == key)
    }

    fn level_for(&self, key: &str, score: f64) -> Option<LevelSummary> {
        if !score.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&score) {
            return None;
        }
        let dimension = self
            .dimension(key)
            .or_else(|| self.dimension(DEFAULT_DIMENSION))?;
        let level = score_to_level(score);
        Some(LevelSummary {
            level,
            descriptor: dimension.niveles[usize::from(level) - 1].to_string(),
        })
    }
}
