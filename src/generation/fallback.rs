//! Two-tier artifact production: external backend first, templates second.
//!
//! Every produced artifact is non-empty and carries its production method.
//! Backend failures of any kind degrade to deterministic template synthesis
//! within the same call; only a subject with no template coverage makes
//! production fail outright.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::content::{
    ArtifactRecord, ContentKind, GenerationMethod, GradePlan, SourceAnalysis,
};
use crate::generation::backend::{DelayPolicy, GenerationBackend, JitterDelay};
use crate::generation::templates::{TemplateContext, TemplateError, TemplateLibrary};

/// Longest request excerpt embedded into a generation prompt.
const MAX_REQUEST_EXCERPT: usize = 1000;

/// Errors from artifact production after all fallback tiers are spent.
#[derive(Debug, Error)]
pub enum ProduceError {
    /// Neither the backend nor any template can cover this subject.
    #[error("No synthesis path for subject '{0}'")]
    UnknownCategory(String),

    /// Template synthesis itself failed.
    #[error("Template synthesis failed: {0}")]
    Synthesis(String),
}

impl From<TemplateError> for ProduceError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::UnknownCategory(subject) => ProduceError::UnknownCategory(subject),
            TemplateError::Render(e) => ProduceError::Synthesis(e.to_string()),
        }
    }
}

/// Produces one artifact per target grade, degrading from the external
/// backend to template synthesis.
pub struct FallbackEngine {
    backend: Option<Arc<dyn GenerationBackend>>,
    templates: TemplateLibrary,
    delay: Box<dyn DelayPolicy>,
}

impl FallbackEngine {
    /// Creates an engine. Without a backend every artifact is templated.
    pub fn new(backend: Option<Arc<dyn GenerationBackend>>) -> Result<Self, ProduceError> {
        Ok(Self {
            backend,
            templates: TemplateLibrary::new()?,
            delay: Box::new(JitterDelay::default()),
        })
    }

    /// Replaces the pre-call delay policy.
    pub fn with_delay_policy(mut self, delay: Box<dyn DelayPolicy>) -> Self {
        self.delay = delay;
        self
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Produces an artifact for one grade.
    ///
    /// Attempts the backend (when configured) and degrades to template
    /// synthesis on any backend failure or empty completion. The delay
    /// policy paces external calls only; a backend-less engine synthesizes
    /// immediately. `attempt` is the 1-based position of this call within
    /// the current iteration's grade loop.
    pub async fn produce(
        &self,
        analysis: &SourceAnalysis,
        plan: &GradePlan,
        attempt: u32,
    ) -> Result<ArtifactRecord, ProduceError> {
        if let Some(ref backend) = self.backend {
            let pause = self.delay.delay(attempt);
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            let prompt = build_prompt(analysis, plan);
            match backend.generate(&prompt).await {
                Ok(text) => {
                    if let Some(record) =
                        ArtifactRecord::new(text, GenerationMethod::Generated, plan.grade)
                    {
                        debug!(grade = plan.grade, "backend produced artifact");
                        return Ok(self.annotate(record, analysis, plan));
                    }
                    warn!(grade = plan.grade, "backend returned blank text, using template");
                }
                Err(e) => {
                    warn!(grade = plan.grade, error = %e, "backend failed, using template");
                }
            }
        }

        self.synthesize(analysis, plan)
    }

    /// Renders the template tier directly, bypassing the backend.
    pub fn synthesize(
        &self,
        analysis: &SourceAnalysis,
        plan: &GradePlan,
    ) -> Result<ArtifactRecord, ProduceError> {
        let context = TemplateContext {
            grade: plan.grade,
            level: plan.level.as_str().to_string(),
            subject: analysis.subject.clone(),
            topic: analysis.topic.clone(),
            kind: analysis.content_kind.as_str().to_string(),
            concepts: analysis.concepts.clone(),
            objectives: plan.objectives.clone(),
            region: analysis.cultural_region.clone(),
            cultural_references: plan.cultural_references.clone(),
            question_count: plan.question_count,
            instruction_style: plan.instruction_style.clone(),
            completion_time: plan.completion_time.clone(),
        };
        let text = self
            .templates
            .render(&analysis.subject, plan.level, &context)?;
        let record = ArtifactRecord::new(text, GenerationMethod::Templated, plan.grade)
            .ok_or_else(|| ProduceError::Synthesis("template rendered empty".to_string()))?;
        Ok(self.annotate(record, analysis, plan))
    }

    fn annotate(
        &self,
        record: ArtifactRecord,
        analysis: &SourceAnalysis,
        plan: &GradePlan,
    ) -> ArtifactRecord {
        record
            .with_metadata("subject", &analysis.subject)
            .with_metadata("topic", &analysis.topic)
            .with_metadata("level", plan.level.as_str())
            .with_metadata("kind", analysis.content_kind.as_str())
            .with_metadata("region", &analysis.cultural_region)
    }
}

/// Builds the backend prompt for one grade from the analysis and plan.
fn build_prompt(analysis: &SourceAnalysis, plan: &GradePlan) -> String {
    let mut excerpt = analysis.request.as_str();
    if excerpt.len() > MAX_REQUEST_EXCERPT {
        let mut end = MAX_REQUEST_EXCERPT;
        while !excerpt.is_char_boundary(end) {
            end -= 1;
        }
        excerpt = &excerpt[..end];
    }

    let mut prompt = String::new();
    match analysis.content_kind {
        ContentKind::Worksheet => {
            prompt.push_str(&format!(
                "Create a complete educational worksheet for Grade {} ({} level) on the topic '{}' in {}.\n\n",
                plan.grade,
                plan.level.as_str(),
                analysis.topic,
                analysis.subject,
            ));
            prompt.push_str(&format!(
                "Include exactly {} questions. Question types, most important first: {}.\n",
                plan.question_count,
                plan.question_types.join(", "),
            ));
            prompt.push_str(
                "Start with a title line, then 'Name: ___ Date: ___', \
                 organize questions into parts, and end with an answer key.\n",
            );
        }
        kind => {
            prompt.push_str(&format!(
                "Create a {} for Grade {} students about '{}' in {}, localized for {}.\n\n",
                kind.as_str(),
                plan.grade,
                analysis.topic,
                analysis.subject,
                analysis.cultural_region,
            ));
            if !plan.cultural_references.is_empty() {
                prompt.push_str(&format!(
                    "Weave in these cultural elements: {}.\n",
                    plan.cultural_references.join(", "),
                ));
            }
        }
    }

    if !analysis.concepts.is_empty() {
        prompt.push_str(&format!(
            "Cover these key concepts: {}.\n",
            analysis.concepts.join(", "),
        ));
    }
    if !plan.objectives.is_empty() {
        prompt.push_str(&format!(
            "Learning objectives:\n{}\n",
            plan.objectives
                .iter()
                .map(|o| format!("- {}", o))
                .collect::<Vec<_>>()
                .join("\n"),
        ));
    }
    prompt.push_str(&format!(
        "Instruction style: {}. Cognitive focus: {}. Target completion time: {}.\n",
        plan.instruction_style, plan.cognitive_focus, plan.completion_time,
    ));
    prompt.push_str(&format!("\nOriginal request:\n{}\n", excerpt));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Complexity, EducationalLevel, Language};
    use crate::generation::backend::{BackendError, NoDelay};
    use async_trait::async_trait;

    struct FixedBackend(String);

    #[async_trait]
    impl GenerationBackend for FixedBackend {
        async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl GenerationBackend for FailingBackend {
        async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
            Err(BackendError::RequestFailed("connection refused".to_string()))
        }
    }

    fn analysis(subject: &str) -> SourceAnalysis {
        SourceAnalysis {
            request: "worksheet on photosynthesis for grade 7".to_string(),
            language: Language::English,
            content_kind: ContentKind::Worksheet,
            subject: subject.to_string(),
            topic: "photosynthesis".to_string(),
            concepts: vec!["chlorophyll".to_string(), "sunlight".to_string()],
            estimated_level: 7,
            complexity: Complexity::Medium,
            cultural_region: "India (General)".to_string(),
        }
    }

    fn plan(grade: u8) -> GradePlan {
        let level = EducationalLevel::for_grade(grade);
        GradePlan {
            grade,
            level,
            objectives: vec!["Explain the process of photosynthesis".to_string()],
            question_count: level.question_count(),
            question_types: vec!["multiple choice".to_string(), "short answer".to_string()],
            instruction_style: "Detailed instructions with guided steps".to_string(),
            cognitive_focus: "Understand and apply".to_string(),
            completion_time: "30-40 minutes".to_string(),
            cultural_references: Vec::new(),
        }
    }

    fn engine(backend: Option<Arc<dyn GenerationBackend>>) -> FallbackEngine {
        FallbackEngine::new(backend)
            .unwrap()
            .with_delay_policy(Box::new(NoDelay))
    }

    #[tokio::test]
    async fn backend_success_yields_generated_artifact() {
        let engine = engine(Some(Arc::new(FixedBackend("a full worksheet".to_string()))));
        let record = engine.produce(&analysis("science"), &plan(7), 1).await.unwrap();
        assert_eq!(record.method, GenerationMethod::Generated);
        assert_eq!(record.content, "a full worksheet");
        assert_eq!(record.metadata.get("subject").unwrap(), "science");
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_template() {
        let engine = engine(Some(Arc::new(FailingBackend)));
        let record = engine.produce(&analysis("science"), &plan(7), 1).await.unwrap();
        assert_eq!(record.method, GenerationMethod::Templated);
        assert!(record.content.contains("photosynthesis"));
    }

    #[tokio::test]
    async fn blank_completion_degrades_to_template() {
        let engine = engine(Some(Arc::new(FixedBackend("   \n".to_string()))));
        let record = engine.produce(&analysis("science"), &plan(7), 1).await.unwrap();
        assert_eq!(record.method, GenerationMethod::Templated);
    }

    struct CountingDelay(Arc<std::sync::atomic::AtomicU32>);

    impl crate::generation::backend::DelayPolicy for CountingDelay {
        fn delay(&self, _attempt: u32) -> std::time::Duration {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            std::time::Duration::ZERO
        }
    }

    #[tokio::test]
    async fn delay_policy_paces_external_calls_only() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let calls = Arc::new(AtomicU32::new(0));
        let engine = FallbackEngine::new(None)
            .unwrap()
            .with_delay_policy(Box::new(CountingDelay(calls.clone())));
        engine.produce(&analysis("science"), &plan(7), 1).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let calls = Arc::new(AtomicU32::new(0));
        let engine = FallbackEngine::new(Some(Arc::new(FailingBackend)))
            .unwrap()
            .with_delay_policy(Box::new(CountingDelay(calls.clone())));
        engine.produce(&analysis("science"), &plan(7), 1).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_backend_always_templates() {
        let engine = engine(None);
        let record = engine.produce(&analysis("mathematics"), &plan(4), 1).await.unwrap();
        assert_eq!(record.method, GenerationMethod::Templated);
        assert_eq!(record.target, 4);
    }

    #[tokio::test]
    async fn unknown_subject_exhausts_both_tiers() {
        let engine = engine(Some(Arc::new(FailingBackend)));
        let err = engine
            .produce(&analysis("astrology"), &plan(7), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ProduceError::UnknownCategory(_)));
    }

    #[test]
    fn prompt_truncates_long_requests() {
        let mut a = analysis("science");
        a.request = "x".repeat(5000);
        let prompt = build_prompt(&a, &plan(7));
        assert!(prompt.len() < 3000);
        assert!(prompt.contains("Grade 7"));
    }
}
