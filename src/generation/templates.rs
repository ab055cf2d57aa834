//! Deterministic template synthesis for generation fallback.
//!
//! Templates are keyed by `(subject, level)` with progressively more generic
//! fallbacks: an exact subject+level template, a level-agnostic subject
//! template, then the generic template. Subjects outside the supported list
//! have no template coverage at all and fail with
//! [`TemplateError::UnknownCategory`].

use serde::Serialize;
use tera::Tera;
use thiserror::Error;

use crate::content::{is_supported_subject, EducationalLevel};

/// Errors raised during template synthesis.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The category's subject has no template coverage.
    #[error("No template coverage for subject '{0}'")]
    UnknownCategory(String),

    /// Tera rendering failed.
    #[error("Template rendering failed: {0}")]
    Render(#[from] tera::Error),
}

/// Placeholder values a template can reference.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// Target grade level.
    pub grade: u8,
    /// Educational band, lowercase.
    pub level: String,
    /// Subject identifier.
    pub subject: String,
    /// Educational topic.
    pub topic: String,
    /// Artifact kind ("worksheet", "story", ...).
    pub kind: String,
    /// Key concepts to cover.
    pub concepts: Vec<String>,
    /// Learning objectives for the grade.
    pub objectives: Vec<String>,
    /// Cultural region for localization.
    pub region: String,
    /// Cultural references to weave in.
    pub cultural_references: Vec<String>,
    /// Number of questions or sections.
    pub question_count: u32,
    /// Instruction style guidance.
    pub instruction_style: String,
    /// Estimated completion time.
    pub completion_time: String,
}

/// Library of built-in fallback templates.
pub struct TemplateLibrary {
    tera: Tera,
}

impl TemplateLibrary {
    /// Creates the library with all built-in templates registered.
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("mathematics", MATHEMATICS_TEMPLATE),
            ("science_elementary", SCIENCE_ELEMENTARY_TEMPLATE),
            ("science_middle", SCIENCE_MIDDLE_TEMPLATE),
            ("science_high", SCIENCE_HIGH_TEMPLATE),
            ("english", ENGLISH_TEMPLATE),
            ("general", GENERAL_TEMPLATE),
        ])?;
        Ok(Self { tera })
    }

    /// Renders the best-matching template for a subject and level.
    ///
    /// Lookup order: `{subject}_{level}`, `{subject}`, `general_{level}`,
    /// `general`. Subjects without template coverage are rejected before
    /// lookup.
    pub fn render(
        &self,
        subject: &str,
        level: EducationalLevel,
        context: &TemplateContext,
    ) -> Result<String, TemplateError> {
        if !is_supported_subject(subject) {
            return Err(TemplateError::UnknownCategory(subject.to_string()));
        }
        let family = template_family(subject);
        let name = self.resolve(family, level);
        let mut ctx = tera::Context::from_serialize(context)?;
        // The level argument wins over whatever the context carries.
        ctx.insert("level", level.as_str());
        Ok(self.tera.render(name, &ctx)?)
    }

    fn resolve(&self, family: &str, level: EducationalLevel) -> &str {
        let candidates = [
            format!("{}_{}", family, level.as_str()),
            family.to_string(),
            format!("general_{}", level.as_str()),
        ];
        for candidate in &candidates {
            if let Some(name) = self
                .tera
                .get_template_names()
                .find(|n| *n == candidate.as_str())
            {
                return name;
            }
        }
        "general"
    }
}

/// Maps a supported subject to its template family.
fn template_family(subject: &str) -> &'static str {
    match subject {
        "mathematics" => "mathematics",
        "science" | "physics" | "chemistry" | "biology" => "science",
        "english" => "english",
        _ => "general",
    }
}

const MATHEMATICS_TEMPLATE: &str = r#"# Grade {{ grade }} - Mathematics: {{ topic }}

**Name: _________________ Date: _________________**

## Learning Objectives
{% for objective in objectives %}- {{ objective }}
{% endfor %}
---
{% if level == "elementary" %}
### Part 1: Practice Problems
1. 25 + 17 = ____
2. 43 - 18 = ____
3. 56 + 29 = ____

### Part 2: Word Problems
4. Sarah has 15 stickers. She gives 7 to her friend. How many stickers does she have left?
5. There are 23 birds in a tree. 8 more birds come. How many birds are there now?

### Part 3: Patterns
6. Continue the pattern: 2, 4, 6, 8, ____, ____

**Answer Key:** 1. 42  2. 25  3. 85  4. 8 stickers  5. 31 birds  6. 10, 12
{% elif level == "middle" %}
### Part 1: Solve for x
1. 3x + 5 = 17
2. 2(x - 3) = 10
3. x/4 + 7 = 12

### Part 2: Word Problems
4. A rectangle has a length of (x + 3) and width of (x - 1). If the perimeter is 24, find x.
5. The sum of two consecutive integers is 47. What are the integers?

### Part 3: Graphing
6. Graph the equation y = 2x - 3.

**Answer Key:** 1. x = 4  2. x = 8  3. x = 20  4. x = 4.5  5. 23 and 24
{% else %}
### Part 1: Functions and Analysis
1. Given f(x) = x^2 - 4x + 3, find f(-2), the vertex, and the x-intercepts.

### Part 2: Applications
2. Find the derivative of f(x) = 3x^3 - 2x^2 + 5x - 1.
3. A ball is thrown upward with initial velocity 64 ft/s; its height is h(t) = -16t^2 + 64t.
   When does it reach maximum height, and what is that height?

**Answer Key:** 1. f(-2) = 15; vertex (2, -1); x = 1, 3  2. f'(x) = 9x^2 - 4x + 5  3. 2 seconds; 64 feet
{% endif %}
*Estimated completion time: {{ completion_time }}. {{ instruction_style }}.*
"#;

const SCIENCE_ELEMENTARY_TEMPLATE: &str = r#"# Grade {{ grade }} - {{ topic }}

**Name: _________________ Date: _________________**

## Learning Goals
{% for objective in objectives %}- {{ objective }}
{% endfor %}
---

### Part 1: Fill in the Blanks
**Word Bank: {{ concepts | join(sep=", ") }}**
{% for concept in concepts %}{{ loop.index }}. The word ____________ describes something we learned about {{ topic }}.
{% endfor %}
### Part 2: Circle the Correct Answer
{% if kind == "worksheet" %}Answer each question by circling the best choice, then check with your teacher.
{% else %}Read the short {{ kind }} below with your class, then answer together.
{% endif %}
### Part 3: Draw and Label
Draw a simple picture that shows {{ topic }} and label each part.

### Part 4: True or False
1. We can observe {{ topic }} in everyday life. ____
2. Asking questions helps us learn about {{ topic }}. ____

---
**Answer Key:** Part 4: 1. True  2. True
*Estimated completion time: {{ completion_time }}.*
"#;

const SCIENCE_MIDDLE_TEMPLATE: &str = r#"# Grade {{ grade }} - {{ topic }}

**Name: _________________ Date: _________________**

## Learning Objectives
{% for objective in objectives %}- {{ objective }}
{% endfor %}
---

### Part 1: Multiple Choice
Answer {{ question_count }} questions covering: {{ concepts | join(sep=", ") }}.

1. Which statement best describes {{ topic }}?
   a) It never changes    b) It can be observed and measured    c) It only exists in books

### Part 2: Short Answer
{% for concept in concepts %}{{ loop.index + 1 }}. Explain how {{ concept }} relates to {{ topic }}.
{% endfor %}
### Part 3: Analysis
Compare two aspects of {{ topic }} in a table: inputs, outputs, and purpose.
{% if region != "India (General)" %}Use an example from {{ region }} in your answer.
{% endif %}
---
**Answer Key:** Part 1: 1. b. Parts 2-3: responses should show comprehension of the key concepts.
*Estimated completion time: {{ completion_time }}. {{ instruction_style }}.*
"#;

const SCIENCE_HIGH_TEMPLATE: &str = r#"# Grade {{ grade }} - Advanced {{ topic }}

**Name: _________________ Date: _________________**

## Learning Objectives
{% for objective in objectives %}- {{ objective }}
{% endfor %}
---

### Part 1: Conceptual Analysis
1. Compare and contrast the main processes involved in {{ topic }}, including inputs,
   outputs, and energy sources.

### Part 2: Data Analysis
2. Given experimental measurements related to {{ topic }}, graph the data, identify the
   limiting factor, and predict the effect of changing one variable.

### Part 3: Critical Thinking
{% for concept in concepts %}{{ loop.index + 2 }}. Evaluate the role of {{ concept }} in {{ topic }} and its real-world trade-offs.
{% endfor %}
### Part 4: Research Application
Design an experiment to investigate one factor affecting {{ topic }}: hypothesis,
variables, methodology, and expected results.

---
**Rubric:** Scientific accuracy (30%), analysis (25%), terminology (20%), application (15%), reasoning (10%)
*Estimated completion time: {{ completion_time }}.*
"#;

const ENGLISH_TEMPLATE: &str = r#"# Grade {{ grade }} - English: {{ topic }}

**Name: _________________ Date: _________________**

## Learning Objectives
{% for objective in objectives %}- {{ objective }}
{% endfor %}
---
{% if level == "elementary" %}
### Part 1: Vocabulary
Circle the correct spelling: freind / friend, becuase / because, thier / their.

### Part 2: Reading Comprehension
Read the short story and answer who, what, and why questions.

### Part 3: Writing
Write 3 sentences about {{ topic }}.

**Answer Key:** friend, because, their
{% elif level == "middle" %}
### Part 1: Literary Analysis
Identify the literary device in a given sentence and describe the mood it creates.

### Part 2: Grammar
Identify the parts of speech in a sample sentence.

### Part 3: Writing
Write a paragraph (5-7 sentences) about {{ topic }} using at least two metaphors.
{% else %}
### Part 1: Literary Analysis
Analyze a passage for tone, figurative language, theme development, and purpose.

### Part 2: Rhetorical Analysis
Identify and explain three rhetorical strategies in a famous speech.

### Part 3: Creative Writing
Write a persuasive essay (300 words) on {{ topic }} using three rhetorical appeals.

**Rubric:** Content (30%), Organization (25%), Language Use (25%), Conventions (20%)
{% endif %}
*Estimated completion time: {{ completion_time }}.*
"#;

const GENERAL_TEMPLATE: &str = r#"# Grade {{ grade }} - {{ subject | title }} {{ kind | title }}: {{ topic }}
{% if kind == "worksheet" %}
**Name: _________________ Date: _________________**
{% endif %}
## Learning Objectives
{% for objective in objectives %}- {{ objective }}
{% endfor %}
---
{% if kind == "story" or kind == "lesson" or kind == "dialogue" %}
### Setting
A familiar place in {{ region }} where students encounter {{ topic }} in daily life.
{% if cultural_references %}
### Cultural Elements
{% for reference in cultural_references %}- {{ reference }}
{% endfor %}{% endif %}
### Narrative
An elder explains {{ topic }} to a curious student, introducing each idea through
local examples{% if concepts %}: {{ concepts | join(sep=", ") }}{% endif %}.

### Key Learning Moment
The student applies what they learned to a real situation at home.

### Moral
Observing the world around us is the first step of learning.
{% else %}
### Part 1: Vocabulary ({{ level }} level)
Define the following terms:
{% for concept in concepts %}{{ loop.index }}. {{ concept }}
{% endfor %}
### Part 2: Comprehension
{% for concept in concepts %}{{ loop.index }}. What is the importance of {{ concept }} in {{ subject }}?
{% endfor %}
### Part 3: Application
How do you see {{ subject }} in your daily life? Give one example from {{ region }}.

---
**Assessment:** vocabulary 25%, comprehension 25%, application 25%, communication 25%
{% endif %}
*Estimated completion time: {{ completion_time }}.*
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn context(kind: &str) -> TemplateContext {
        TemplateContext {
            grade: 7,
            level: "middle".to_string(),
            subject: "science".to_string(),
            topic: "photosynthesis".to_string(),
            kind: kind.to_string(),
            concepts: vec!["chlorophyll".to_string(), "sunlight".to_string()],
            objectives: vec!["Explain the process of photosynthesis".to_string()],
            region: "Maharashtra".to_string(),
            cultural_references: vec!["traditional farming practices".to_string()],
            question_count: 10,
            instruction_style: "Detailed instructions with guided steps".to_string(),
            completion_time: "30-40 minutes".to_string(),
        }
    }

    #[test]
    fn renders_exact_subject_level_template() {
        let library = TemplateLibrary::new().unwrap();
        let text = library
            .render("science", EducationalLevel::Middle, &context("worksheet"))
            .unwrap();
        assert!(text.contains("Grade 7"));
        assert!(text.contains("photosynthesis"));
        assert!(!text.trim().is_empty());
    }

    #[test]
    fn falls_back_to_subject_template_without_level() {
        let library = TemplateLibrary::new().unwrap();
        // mathematics has no per-level entry; the subject template branches
        // on the level argument, not the fixture's context value.
        let text = library
            .render("mathematics", EducationalLevel::High, &context("worksheet"))
            .unwrap();
        assert!(text.contains("Functions and Analysis"));

        let text = library
            .render("mathematics", EducationalLevel::Elementary, &context("worksheet"))
            .unwrap();
        assert!(text.contains("Word Problems"));
    }

    #[test]
    fn unmapped_supported_subject_uses_generic() {
        let library = TemplateLibrary::new().unwrap();
        let text = library
            .render("history", EducationalLevel::Middle, &context("worksheet"))
            .unwrap();
        assert!(text.contains("Vocabulary"));
    }

    #[test]
    fn story_kind_renders_narrative_structure() {
        let library = TemplateLibrary::new().unwrap();
        let text = library
            .render("geography", EducationalLevel::Middle, &context("story"))
            .unwrap();
        assert!(text.contains("Narrative"));
        assert!(text.contains("Maharashtra"));
    }

    #[test]
    fn unknown_subject_is_rejected() {
        let library = TemplateLibrary::new().unwrap();
        let err = library
            .render("astrology", EducationalLevel::Middle, &context("worksheet"))
            .unwrap_err();
        assert!(matches!(err, TemplateError::UnknownCategory(_)));
    }

    #[test]
    fn all_subjects_and_levels_render_non_empty() {
        let library = TemplateLibrary::new().unwrap();
        for subject in crate::content::SUPPORTED_SUBJECTS {
            for level in [
                EducationalLevel::Elementary,
                EducationalLevel::Middle,
                EducationalLevel::High,
            ] {
                let text = library.render(subject, level, &context("worksheet")).unwrap();
                assert!(!text.trim().is_empty(), "{subject}/{level} rendered empty");
            }
        }
    }
}
