//! Request analysis stage: turns the free-text request into a
//! [`SourceAnalysis`] record.
//!
//! Detection is heuristic throughout: Unicode script ranges plus keyword
//! lists for language, keyword tables for subject and topic, and a small
//! regex for explicit grade mentions. Anything the heuristics cannot place
//! falls back to neutral defaults rather than failing the pass.

use async_trait::async_trait;
use regex::Regex;

use crate::content::{Complexity, ContentKind, Language, SourceAnalysis};
use crate::pipeline::stage::{Stage, StageError};
use crate::session::{keys, SessionState, SessionValue};

/// Marathi function words that distinguish Marathi from Hindi within the
/// shared Devanagari script.
const MARATHI_MARKERS: &[&str] = &["आहे", "आणि", "मराठी", "शेतकरी", "पाणी", "माती"];

/// Subject keyword table, checked in order; first match wins.
const SUBJECT_KEYWORDS: &[(&str, &[&str])] = &[
    ("mathematics", &["math", "algebra", "geometry", "fraction", "equation", "arithmetic", "गणित"]),
    ("physics", &["physics", "force", "motion", "electricity", "magnet"]),
    ("chemistry", &["chemistry", "chemical", "reaction", "acid", "molecule"]),
    ("biology", &["biology", "cell", "organism", "digestion", "anatomy"]),
    ("english", &["english", "grammar", "essay", "vocabulary", "reading comprehension"]),
    ("history", &["history", "independence", "empire", "freedom struggle", "इतिहास"]),
    ("geography", &["geography", "river", "climate", "monsoon", "mountain"]),
    ("social_studies", &["social studies", "civics", "community", "government"]),
    ("science", &["science", "photosynthesis", "plant", "soil", "water cycle", "energy", "विज्ञान"]),
];

/// Topic table: keyword in the request, topic identifier out.
const TOPIC_KEYWORDS: &[(&str, &str)] = &[
    ("soil", "agriculture/soil_science"),
    ("farming", "agriculture/soil_science"),
    ("crop", "agriculture/soil_science"),
    ("photosynthesis", "plant_biology/photosynthesis"),
    ("water cycle", "earth_science/water_cycle"),
    ("monsoon", "earth_science/monsoon"),
    ("fraction", "arithmetic/fractions"),
    ("algebra", "algebra/equations"),
    ("grammar", "language/grammar"),
    ("electricity", "physics/electricity"),
    ("digestion", "biology/digestion"),
];

/// Concept lexicon scanned against the request text.
const CONCEPT_WORDS: &[&str] = &[
    "soil", "water", "nutrients", "crops", "farming", "photosynthesis", "sunlight",
    "chlorophyll", "energy", "fractions", "equations", "grammar", "vocabulary",
    "electricity", "circuits", "digestion", "cells", "climate", "rivers", "monsoon",
];

/// Detects the language, subject, topic, grade estimate and complexity of a
/// request.
pub struct RequestAnalysisStage {
    default_kind: ContentKind,
    grade_mention: Regex,
    devanagari: Regex,
    scripts: Vec<(Language, Regex)>,
}

impl RequestAnalysisStage {
    /// Creates the stage with `default_kind` used when the request names no
    /// artifact kind.
    pub fn new(default_kind: ContentKind) -> Result<Self, regex::Error> {
        let scripts = vec![
            (Language::Gujarati, Regex::new(r"[\u{0A80}-\u{0AFF}]")?),
            (Language::Punjabi, Regex::new(r"[\u{0A00}-\u{0A7F}]")?),
            (Language::Bengali, Regex::new(r"[\u{0980}-\u{09FF}]")?),
            (Language::Tamil, Regex::new(r"[\u{0B80}-\u{0BFF}]")?),
            (Language::Telugu, Regex::new(r"[\u{0C00}-\u{0C7F}]")?),
            (Language::Kannada, Regex::new(r"[\u{0C80}-\u{0CFF}]")?),
            (Language::Malayalam, Regex::new(r"[\u{0D00}-\u{0D7F}]")?),
        ];
        Ok(Self {
            default_kind,
            grade_mention: Regex::new(r"(?i)(?:grade|class|std\.?|standard)\s*(\d{1,2})")?,
            devanagari: Regex::new(r"[\u{0900}-\u{097F}]")?,
            scripts,
        })
    }

    /// Runs every heuristic over one request.
    pub fn analyze(&self, request: &str) -> SourceAnalysis {
        let lower = request.to_lowercase();
        let language = self.detect_language(request);
        let subject = detect_subject(&lower);
        let topic = detect_topic(&lower, &subject);
        SourceAnalysis {
            request: request.to_string(),
            language,
            content_kind: self.detect_kind(&lower),
            subject,
            topic,
            concepts: detect_concepts(&lower),
            estimated_level: self.estimate_grade(&lower),
            complexity: detect_complexity(&lower),
            cultural_region: language.cultural_region().to_string(),
        }
    }

    fn detect_language(&self, request: &str) -> Language {
        if self.devanagari.is_match(request) {
            let marathi = MARATHI_MARKERS.iter().any(|m| request.contains(m));
            return if marathi { Language::Marathi } else { Language::Hindi };
        }
        for (language, script) in &self.scripts {
            if script.is_match(request) {
                return *language;
            }
        }
        Language::English
    }

    fn detect_kind(&self, lower: &str) -> ContentKind {
        if lower.contains("worksheet") {
            ContentKind::Worksheet
        } else if lower.contains("story") {
            ContentKind::Story
        } else if lower.contains("poem") {
            ContentKind::Poem
        } else if lower.contains("dialogue") || lower.contains("conversation") {
            ContentKind::Dialogue
        } else if lower.contains("explanation") || lower.contains("explain") {
            ContentKind::Explanation
        } else if lower.contains("example") {
            ContentKind::Example
        } else if lower.contains("lesson") {
            ContentKind::Lesson
        } else {
            self.default_kind
        }
    }

    fn estimate_grade(&self, lower: &str) -> u8 {
        self.grade_mention
            .captures(lower)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u8>().ok())
            .map(|g| g.clamp(1, 12))
            .unwrap_or(7)
    }
}

fn detect_subject(lower: &str) -> String {
    for (subject, words) in SUBJECT_KEYWORDS {
        if words.iter().any(|w| lower.contains(w)) {
            return (*subject).to_string();
        }
    }
    "science".to_string()
}

fn detect_topic(lower: &str, subject: &str) -> String {
    for (word, topic) in TOPIC_KEYWORDS {
        if lower.contains(word) {
            return (*topic).to_string();
        }
    }
    format!("{}/general", subject)
}

fn detect_concepts(lower: &str) -> Vec<String> {
    CONCEPT_WORDS
        .iter()
        .filter(|w| lower.contains(*w))
        .take(8)
        .map(|w| (*w).to_string())
        .collect()
}

fn detect_complexity(lower: &str) -> Complexity {
    const HIGH: &[&str] = &["advanced", "complex", "detailed", "in-depth", "analysis"];
    const LOW: &[&str] = &["simple", "basic", "easy", "introduction", "beginner"];
    if HIGH.iter().any(|w| lower.contains(w)) {
        Complexity::High
    } else if LOW.iter().any(|w| lower.contains(w)) {
        Complexity::Low
    } else {
        Complexity::Medium
    }
}

#[async_trait]
impl Stage for RequestAnalysisStage {
    fn name(&self) -> &'static str {
        "request_analysis"
    }

    fn required_keys(&self) -> &[&'static str] {
        &[keys::REQUEST]
    }

    fn output_key(&self) -> &'static str {
        keys::SOURCE_ANALYSIS
    }

    async fn transform(&self, state: &SessionState) -> Result<SessionValue, StageError> {
        let request = state.request().ok_or_else(|| StageError::MissingDependency {
            key: keys::REQUEST.to_string(),
        })?;
        Ok(SessionValue::Analysis(self.analyze(request)))
    }

    fn degraded_output(&self, state: &SessionState) -> SessionValue {
        SessionValue::Analysis(SourceAnalysis::fallback(state.request().unwrap_or_default()))
    }
}
