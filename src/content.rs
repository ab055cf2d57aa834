//! Typed records shared across the content pipeline.
//!
//! Every value a stage reads from or writes into the session state is one of
//! the closed set of records defined here. There are no untyped maps flowing
//! between stages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Subjects the pipeline knows how to plan and synthesize content for.
///
/// Generation categories outside this list cannot be template-synthesized and
/// cause `GenerationExhausted`.
pub const SUPPORTED_SUBJECTS: &[&str] = &[
    "mathematics",
    "science",
    "english",
    "social_studies",
    "physics",
    "chemistry",
    "biology",
    "history",
    "geography",
];

/// Returns whether a subject has template coverage.
pub fn is_supported_subject(subject: &str) -> bool {
    SUPPORTED_SUBJECTS.contains(&subject)
}

/// Coarse educational band a grade level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationalLevel {
    /// Grades 1-5.
    Elementary,
    /// Grades 6-8.
    Middle,
    /// Grades 9-12.
    High,
}

impl EducationalLevel {
    /// Classifies a grade into its educational band.
    pub fn for_grade(grade: u8) -> Self {
        match grade {
            0..=5 => EducationalLevel::Elementary,
            6..=8 => EducationalLevel::Middle,
            _ => EducationalLevel::High,
        }
    }

    /// Lowercase identifier used in template names and metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            EducationalLevel::Elementary => "elementary",
            EducationalLevel::Middle => "middle",
            EducationalLevel::High => "high",
        }
    }

    /// Recommended question count for a worksheet at this level.
    pub fn question_count(&self) -> u32 {
        match self {
            EducationalLevel::Elementary => 8,
            EducationalLevel::Middle => 10,
            EducationalLevel::High => 12,
        }
    }
}

impl std::fmt::Display for EducationalLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complexity signal extracted from the source request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    /// Half-width of the symmetric grade spread for this complexity.
    pub fn spread_width(&self) -> u8 {
        match self {
            Complexity::Low | Complexity::Medium => 1,
            Complexity::High => 2,
        }
    }
}

/// Kind of artifact a lesson request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Story,
    Explanation,
    Dialogue,
    Poem,
    Lesson,
    Example,
    /// Differentiated worksheet with questions and an answer key.
    Worksheet,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Story => "story",
            ContentKind::Explanation => "explanation",
            ContentKind::Dialogue => "dialogue",
            ContentKind::Poem => "poem",
            ContentKind::Lesson => "lesson",
            ContentKind::Example => "example",
            ContentKind::Worksheet => "worksheet",
        }
    }
}

/// Languages the analysis stage can detect from request text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Hindi,
    Marathi,
    Gujarati,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Bengali,
    Punjabi,
    English,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Hindi => "hindi",
            Language::Marathi => "marathi",
            Language::Gujarati => "gujarati",
            Language::Tamil => "tamil",
            Language::Telugu => "telugu",
            Language::Kannada => "kannada",
            Language::Malayalam => "malayalam",
            Language::Bengali => "bengali",
            Language::Punjabi => "punjabi",
            Language::English => "english",
        }
    }

    /// Cultural region associated with the language, used for localization.
    pub fn cultural_region(&self) -> &'static str {
        match self {
            Language::Hindi => "North India",
            Language::Marathi => "Maharashtra",
            Language::Gujarati => "Gujarat",
            Language::Tamil => "Tamil Nadu",
            Language::Telugu => "Andhra Pradesh/Telangana",
            Language::Kannada => "Karnataka",
            Language::Malayalam => "Kerala",
            Language::Bengali => "West Bengal",
            Language::Punjabi => "Punjab",
            Language::English => "India (General)",
        }
    }
}

/// Structured result of analyzing the free-text request.
///
/// Written by the analysis stage and consumed by every downstream stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAnalysis {
    /// The original request text, verbatim.
    pub request: String,
    /// Detected request language.
    pub language: Language,
    /// Kind of artifact to produce.
    pub content_kind: ContentKind,
    /// Detected subject area (one of `SUPPORTED_SUBJECTS` in normal operation).
    pub subject: String,
    /// Educational topic, e.g. "agriculture/soil_science".
    pub topic: String,
    /// Key concepts extracted from the request.
    pub concepts: Vec<String>,
    /// Primary grade-level estimate for the content.
    pub estimated_level: u8,
    /// Complexity signal driving the differentiation spread.
    pub complexity: Complexity,
    /// Cultural region for localization.
    pub cultural_region: String,
}

impl SourceAnalysis {
    /// Neutral analysis used when the analysis stage degrades.
    pub fn fallback(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            language: Language::English,
            content_kind: ContentKind::Worksheet,
            subject: "science".to_string(),
            topic: "general".to_string(),
            concepts: Vec::new(),
            estimated_level: 7,
            complexity: Complexity::Medium,
            cultural_region: Language::English.cultural_region().to_string(),
        }
    }
}

/// Plan for one target grade level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradePlan {
    /// Target grade.
    pub grade: u8,
    /// Educational band the grade falls into.
    pub level: EducationalLevel,
    /// Learning objectives adapted to the level.
    pub objectives: Vec<String>,
    /// Number of questions or sections to produce.
    pub question_count: u32,
    /// Dominant question types for the level, most important first.
    pub question_types: Vec<String>,
    /// Instruction style guidance passed to generation.
    pub instruction_style: String,
    /// Cognitive focus for the level (Bloom-style phrasing).
    pub cognitive_focus: String,
    /// Estimated completion time, human readable.
    pub completion_time: String,
    /// Cultural references to weave in (lesson pipeline).
    pub cultural_references: Vec<String>,
}

/// The full set of per-grade plans for one iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSet {
    /// Plans keyed by grade, ascending.
    pub plans: BTreeMap<u8, GradePlan>,
    /// Subject the plans were built for.
    pub subject: String,
    /// Concepts the plans focus on (at most five).
    pub focus_concepts: Vec<String>,
}

impl PlanSet {
    /// Looks up the plan for a grade.
    pub fn for_grade(&self, grade: u8) -> Option<&GradePlan> {
        self.plans.get(&grade)
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// How an artifact's content was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMethod {
    /// External generation backend produced the text.
    Generated,
    /// Deterministic template synthesis produced the text.
    Templated,
}

/// One generated artifact for a single target grade.
///
/// `content` is non-empty whenever construction succeeds; the fallback engine
/// enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// The artifact text.
    pub content: String,
    /// Production method.
    pub method: GenerationMethod,
    /// Target grade the artifact was produced for.
    pub target: u8,
    /// Free-form metadata (subject, level, content kind, ...).
    pub metadata: BTreeMap<String, String>,
}

impl ArtifactRecord {
    /// Creates a record, returning `None` for empty content.
    pub fn new(content: impl Into<String>, method: GenerationMethod, target: u8) -> Option<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return None;
        }
        Some(Self {
            content,
            method,
            target,
            metadata: BTreeMap::new(),
        })
    }

    /// Attaches a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Artifacts for one iteration, keyed by target grade.
///
/// Overwritten wholesale each iteration; the last iteration's set is
/// authoritative on exhaustion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSet {
    artifacts: BTreeMap<u8, ArtifactRecord>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an artifact, replacing any previous one for the same grade.
    pub fn insert(&mut self, record: ArtifactRecord) {
        self.artifacts.insert(record.target, record);
    }

    pub fn get(&self, grade: u8) -> Option<&ArtifactRecord> {
        self.artifacts.get(&grade)
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Iterates artifacts in ascending grade order.
    pub fn iter(&self) -> impl Iterator<Item = (&u8, &ArtifactRecord)> {
        self.artifacts.iter()
    }
}

/// Integer quality score produced once per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Awarded points, in `[0, max]`.
    pub points: u32,
    /// Maximum attainable points.
    pub max: u32,
}

impl QualityScore {
    /// Default maximum used by the validation heuristics.
    pub const DEFAULT_MAX: u32 = 50;

    /// Creates a score clamped to `[0, max]`.
    pub fn new(points: u32, max: u32) -> Self {
        Self {
            points: points.min(max),
            max,
        }
    }

    /// Score as a percentage of the maximum.
    pub fn percentage(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        self.points as f64 / self.max as f64 * 100.0
    }
}

impl std::fmt::Display for QualityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.points, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn educational_level_bands() {
        assert_eq!(EducationalLevel::for_grade(1), EducationalLevel::Elementary);
        assert_eq!(EducationalLevel::for_grade(5), EducationalLevel::Elementary);
        assert_eq!(EducationalLevel::for_grade(6), EducationalLevel::Middle);
        assert_eq!(EducationalLevel::for_grade(8), EducationalLevel::Middle);
        assert_eq!(EducationalLevel::for_grade(9), EducationalLevel::High);
        assert_eq!(EducationalLevel::for_grade(12), EducationalLevel::High);
    }

    #[test]
    fn question_counts_per_level() {
        assert_eq!(EducationalLevel::Elementary.question_count(), 8);
        assert_eq!(EducationalLevel::Middle.question_count(), 10);
        assert_eq!(EducationalLevel::High.question_count(), 12);
    }

    #[test]
    fn artifact_record_rejects_empty_content() {
        assert!(ArtifactRecord::new("", GenerationMethod::Templated, 5).is_none());
        assert!(ArtifactRecord::new("   \n", GenerationMethod::Generated, 5).is_none());
        assert!(ArtifactRecord::new("text", GenerationMethod::Templated, 5).is_some());
    }

    #[test]
    fn artifact_set_replaces_per_grade() {
        let mut set = ArtifactSet::new();
        let first = ArtifactRecord::new("first", GenerationMethod::Templated, 5).unwrap();
        let second = ArtifactRecord::new("second", GenerationMethod::Generated, 5).unwrap();
        set.insert(first);
        set.insert(second);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(5).unwrap().content, "second");
    }

    #[test]
    fn quality_score_clamps_and_formats() {
        let score = QualityScore::new(80, 50);
        assert_eq!(score.points, 50);
        assert_eq!(score.to_string(), "50/50");
        assert!((QualityScore::new(25, 50).percentage() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn supported_subject_lookup() {
        assert!(is_supported_subject("mathematics"));
        assert!(is_supported_subject("geography"));
        assert!(!is_supported_subject("astrology"));
    }
}
