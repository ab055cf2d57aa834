//! Validation stage: heuristic quality scoring of the generated artifacts.
//!
//! Scoring is intentionally cheap and structural. Base points for having any
//! artifacts at all, a coverage bonus when every target grade is covered,
//! and content checks per artifact (length, headers, question structure,
//! answer key for worksheets; narrative structure and localization for the
//! other kinds). The total is capped at [`QualityScore::DEFAULT_MAX`].

use async_trait::async_trait;

use crate::content::{ArtifactSet, ContentKind, QualityScore, SourceAnalysis};
use crate::partition::TargetSet;
use crate::pipeline::stage::{Stage, StageError};
use crate::session::{keys, SessionState, SessionValue};

const BASE_POINTS: u32 = 20;
const COVERAGE_BONUS: u32 = 10;
const CONTENT_POINTS: u32 = 20;
/// Minimum length for an artifact to count as substantial.
const MIN_CONTENT_LEN: usize = 500;

/// Scores the current pass's artifacts.
pub struct ValidationStage;

impl ValidationStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ValidationStage {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure scoring function over one pass's output.
pub fn score_artifacts(
    analysis: &SourceAnalysis,
    targets: &TargetSet,
    artifacts: &ArtifactSet,
) -> QualityScore {
    if artifacts.is_empty() {
        return QualityScore::new(0, QualityScore::DEFAULT_MAX);
    }

    let mut points = BASE_POINTS;
    if artifacts.len() >= targets.len() && !targets.is_empty() {
        points += COVERAGE_BONUS;
    }

    let mut passed = 0usize;
    let mut total = 0usize;
    for (_, record) in artifacts.iter() {
        let checks = content_checks(analysis, &record.content);
        passed += checks.iter().filter(|c| **c).count();
        total += checks.len();
    }
    if total > 0 {
        points += (CONTENT_POINTS as f64 * passed as f64 / total as f64).round() as u32;
    }

    QualityScore::new(points, QualityScore::DEFAULT_MAX)
}

fn content_checks(analysis: &SourceAnalysis, content: &str) -> Vec<bool> {
    let substantial = content.len() > MIN_CONTENT_LEN;
    match analysis.content_kind {
        ContentKind::Worksheet => vec![
            substantial,
            content.contains("Name:") && content.contains("Date:"),
            content.contains("Part") || content.contains("Question"),
            content.contains("Answer"),
        ],
        // Lesson criteria: language appropriateness, educational value,
        // local context, engagement, practical application.
        _ => {
            let lower = content.to_lowercase();
            let topic_word = analysis
                .topic
                .rsplit('/')
                .next()
                .unwrap_or(analysis.topic.as_str());
            vec![
                substantial,
                lower.contains(&topic_word.to_lowercase())
                    || analysis
                        .concepts
                        .iter()
                        .any(|c| lower.contains(&c.to_lowercase())),
                content.contains(&analysis.cultural_region),
                content.contains('#') || content.contains("Setting") || content.contains("Moral"),
                lower.contains("daily life")
                    || lower.contains("home")
                    || lower.contains("appl")
                    || lower.contains("real situation"),
            ]
        }
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn required_keys(&self) -> &[&'static str] {
        &[keys::SOURCE_ANALYSIS, keys::TARGET_PLAN, keys::GENERATED_ARTIFACTS]
    }

    fn output_key(&self) -> &'static str {
        keys::QUALITY_SCORE
    }

    async fn transform(&self, state: &SessionState) -> Result<SessionValue, StageError> {
        let analysis = state
            .analysis()
            .ok_or_else(|| StageError::MissingDependency {
                key: keys::SOURCE_ANALYSIS.to_string(),
            })?;
        let targets = state
            .targets()
            .ok_or_else(|| StageError::MissingDependency {
                key: keys::TARGET_PLAN.to_string(),
            })?;
        let artifacts = state
            .artifacts()
            .ok_or_else(|| StageError::MissingDependency {
                key: keys::GENERATED_ARTIFACTS.to_string(),
            })?;
        Ok(SessionValue::Score(score_artifacts(analysis, targets, artifacts)))
    }

    fn degraded_output(&self, _state: &SessionState) -> SessionValue {
        // Neutral mid score: below the primary threshold, above zero.
        SessionValue::Score(QualityScore::new(30, QualityScore::DEFAULT_MAX))
    }
}
