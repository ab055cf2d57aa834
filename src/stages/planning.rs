//! Planning stage: one differentiated [`GradePlan`] per target grade.
//!
//! Plans encode how the same topic is pitched at each educational band:
//! objectives, question mix, instruction style, and (for narrative content)
//! cultural references matched to the detected region.

use async_trait::async_trait;

use crate::content::{
    ContentKind, EducationalLevel, GradePlan, PlanSet, SourceAnalysis,
};
use crate::partition::TargetSet;
use crate::pipeline::stage::{Stage, StageError};
use crate::session::{keys, SessionState, SessionValue};

/// Cultural reference pools per region, used for narrative content kinds.
const CULTURAL_REFERENCES: &[(&str, &[&str])] = &[
    ("Maharashtra", &["Ganesh Chaturthi", "warkari tradition", "puran poli", "local bazaars"]),
    ("North India", &["Diwali celebrations", "wheat fields", "village wells"]),
    ("Tamil Nadu", &["Pongal festival", "rice paddies", "temple towns"]),
    ("Gujarat", &["Navratri garba", "salt pans", "cotton farms"]),
    ("West Bengal", &["Durga Puja", "fish markets", "river ferries"]),
    ("Kerala", &["Onam festival", "backwaters", "spice gardens"]),
    ("Punjab", &["Baisakhi festival", "mustard fields", "village fairs"]),
    ("Karnataka", &["Mysore Dasara", "coffee estates", "silk weaving"]),
    ("Andhra Pradesh/Telangana", &["Sankranti kites", "chilli farms", "handloom weaving"]),
    ("India (General)", &["Diwali", "cricket matches", "monsoon season"]),
];

/// Builds the per-grade plan set from the analysis and target set.
pub struct PlanningStage;

impl PlanningStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlanningStage {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure plan construction, shared by the stage and its degraded path.
pub fn build_plans(analysis: &SourceAnalysis, targets: &TargetSet) -> PlanSet {
    let mut set = PlanSet {
        plans: Default::default(),
        subject: analysis.subject.clone(),
        focus_concepts: analysis.concepts.iter().take(5).cloned().collect(),
    };
    for grade in targets.iter() {
        set.plans.insert(grade, plan_for_grade(analysis, grade));
    }
    set
}

fn plan_for_grade(analysis: &SourceAnalysis, grade: u8) -> GradePlan {
    let level = EducationalLevel::for_grade(grade);
    GradePlan {
        grade,
        level,
        objectives: objectives(level, &analysis.topic),
        question_count: level.question_count(),
        question_types: question_types(level),
        instruction_style: instruction_style(level).to_string(),
        cognitive_focus: cognitive_focus(level).to_string(),
        completion_time: completion_time(level).to_string(),
        cultural_references: cultural_references(analysis),
    }
}

fn objectives(level: EducationalLevel, topic: &str) -> Vec<String> {
    match level {
        EducationalLevel::Elementary => vec![
            format!("Identify and recall basic facts about {topic}"),
            "Match key terms to simple definitions".to_string(),
            format!("Connect {topic} to familiar everyday situations"),
        ],
        EducationalLevel::Middle => vec![
            format!("Explain the main processes involved in {topic}"),
            "Compare and contrast related concepts".to_string(),
            format!("Apply knowledge of {topic} to solve problems"),
        ],
        EducationalLevel::High => vec![
            format!("Analyze the mechanisms underlying {topic}"),
            "Evaluate evidence and draw supported conclusions".to_string(),
            format!("Design investigations related to {topic}"),
        ],
    }
}

fn question_types(level: EducationalLevel) -> Vec<String> {
    let types: &[&str] = match level {
        EducationalLevel::Elementary => &["matching", "fill in the blank", "true/false", "drawing"],
        EducationalLevel::Middle => &["multiple choice", "short answer", "diagram labeling"],
        EducationalLevel::High => &["short answer", "data analysis", "extended response"],
    };
    types.iter().map(|t| (*t).to_string()).collect()
}

fn instruction_style(level: EducationalLevel) -> &'static str {
    match level {
        EducationalLevel::Elementary => "Simple step-by-step instructions with visual cues",
        EducationalLevel::Middle => "Detailed instructions with guided steps",
        EducationalLevel::High => "Concise instructions expecting independent work",
    }
}

fn cognitive_focus(level: EducationalLevel) -> &'static str {
    match level {
        EducationalLevel::Elementary => "Remember and understand",
        EducationalLevel::Middle => "Understand and apply",
        EducationalLevel::High => "Analyze and evaluate",
    }
}

fn completion_time(level: EducationalLevel) -> &'static str {
    match level {
        EducationalLevel::Elementary => "20-30 minutes",
        EducationalLevel::Middle => "30-40 minutes",
        EducationalLevel::High => "40-50 minutes",
    }
}

fn cultural_references(analysis: &SourceAnalysis) -> Vec<String> {
    // Worksheets stay culturally neutral; narrative kinds are localized.
    if analysis.content_kind == ContentKind::Worksheet {
        return Vec::new();
    }
    let pool = CULTURAL_REFERENCES
        .iter()
        .find(|(region, _)| *region == analysis.cultural_region)
        .or_else(|| CULTURAL_REFERENCES.iter().find(|(r, _)| *r == "India (General)"))
        .map(|(_, refs)| *refs)
        .unwrap_or(&[]);
    pool.iter().map(|r| (*r).to_string()).collect()
}

#[async_trait]
impl Stage for PlanningStage {
    fn name(&self) -> &'static str {
        "planning"
    }

    fn required_keys(&self) -> &[&'static str] {
        &[keys::SOURCE_ANALYSIS, keys::TARGET_PLAN]
    }

    fn output_key(&self) -> &'static str {
        keys::CONTENT_PLANS
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
        Ok(SessionValue::Plans(build_plans(analysis, targets)))
    }

    fn degraded_output(&self, state: &SessionState) -> SessionValue {
        let fallback = SourceAnalysis::fallback(state.request().unwrap_or_default());
        let targets = state.targets().cloned().unwrap_or_default();
        SessionValue::Plans(build_plans(&fallback, &targets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Complexity, Language};
    use crate::partition::TargetSet;

    fn analysis(kind: ContentKind, region: &str) -> SourceAnalysis {
        SourceAnalysis {
            request: "request".to_string(),
            language: Language::Marathi,
            content_kind: kind,
            subject: "science".to_string(),
            topic: "agriculture/soil_science".to_string(),
            concepts: vec!["soil".into(), "water".into(), "crops".into()],
            estimated_level: 7,
            complexity: Complexity::Medium,
            cultural_region: region.to_string(),
        }
    }

    #[test]
    fn plans_cover_every_target_with_level_settings() {
        let targets = TargetSet::from_grades(vec![3, 7, 10]);
        let plans = build_plans(&analysis(ContentKind::Worksheet, "Maharashtra"), &targets);

        assert_eq!(plans.plans.len(), 3);
        assert_eq!(plans.for_grade(3).unwrap().question_count, 8);
        assert_eq!(plans.for_grade(7).unwrap().question_count, 10);
        assert_eq!(plans.for_grade(10).unwrap().question_count, 12);
        assert_eq!(plans.for_grade(10).unwrap().level, EducationalLevel::High);
        assert!(plans.for_grade(3).unwrap().objectives[0].contains("soil_science"));
    }

    #[test]
    fn worksheets_skip_cultural_references() {
        let targets = TargetSet::from_grades(vec![7]);
        let plans = build_plans(&analysis(ContentKind::Worksheet, "Maharashtra"), &targets);
        assert!(plans.for_grade(7).unwrap().cultural_references.is_empty());
    }

    #[test]
    fn stories_get_regional_references() {
        let targets = TargetSet::from_grades(vec![7]);
        let plans = build_plans(&analysis(ContentKind::Story, "Maharashtra"), &targets);
        let refs = &plans.for_grade(7).unwrap().cultural_references;
        assert!(refs.iter().any(|r| r.contains("Ganesh")));
    }

    #[test]
    fn unknown_region_uses_general_pool() {
        let targets = TargetSet::from_grades(vec![7]);
        let plans = build_plans(&analysis(ContentKind::Story, "Atlantis"), &targets);
        let refs = &plans.for_grade(7).unwrap().cultural_references;
        assert!(refs.iter().any(|r| r.contains("Diwali")));
    }

    #[test]
    fn focus_concepts_capped_at_five() {
        let mut a = analysis(ContentKind::Worksheet, "Maharashtra");
        a.concepts = (0..8).map(|i| format!("c{i}")).collect();
        let plans = build_plans(&a, &TargetSet::from_grades(vec![5]));
        assert_eq!(plans.focus_concepts.len(), 5);
    }
}
