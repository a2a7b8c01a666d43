//! Structured Assessment Generator
//!
//! Asks the model for a test as JSON, then repairs or rejects what comes
//! back. Repairs are limited to cosmetic problems (type spelling, extra
//! options, extra questions, missing rubric); anything that would change
//! what a question means rejects the whole generation.

use super::GenerationError;
use crate::config::AssessmentConfig;
use crate::llm::json::parse_with_policy;
use crate::llm::router::ModelRouter;
use crate::llm::InferenceRequest;
use sdk::{
    AssessmentSpec, MultipleChoiceQuestion, Question, QuestionType, ShortAnswerQuestion, Test,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Options every multiple-choice question carries
pub const OPTION_COUNT: usize = 4;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTest {
    Wrapped { questions: Vec<RawQuestion> },
    Bare(Vec<RawQuestion>),
}

impl RawTest {
    fn into_questions(self) -> Vec<RawQuestion> {
        match self {
            RawTest::Wrapped { questions } | RawTest::Bare(questions) => questions,
        }
    }
}

/// Question as the model wrote it; every field may be missing
#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(alias = "prompt")]
    question: Option<String>,
    #[serde(default)]
    options: Vec<Value>,
    #[serde(rename = "correctAnswer", alias = "correct_answer", alias = "answer")]
    correct_answer: Option<Value>,
    rubric: Option<String>,
}

pub struct AssessmentGenerator {
    router: Arc<ModelRouter>,
    config: AssessmentConfig,
}

impl AssessmentGenerator {
    pub fn new(router: Arc<ModelRouter>, config: AssessmentConfig) -> Self {
        Self { router, config }
    }

    /// Generate a test matching `spec`.
    ///
    /// The request is validated before the model is called.
    pub async fn generate(&self, spec: &AssessmentSpec) -> Result<Test, GenerationError> {
        spec.validate(self.config.max_questions)
            .map_err(GenerationError::InvalidSpec)?;

        let request = InferenceRequest::text(build_prompt(spec))
            .with_system_instruction(
                "You write school tests. You reply with a single JSON object and nothing else.",
            )
            .json();

        let response = self.router.call(&request).await?;
        tracing::debug!("Test generated by {}", response.model);

        let questions = parse_questions(&response.text, spec, &self.config)?;

        let test = Test {
            id: uuid::Uuid::new_v4().to_string(),
            subject: spec.subject.trim().to_string(),
            grade_level: spec.grade_level.trim().to_string(),
            questions,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        tracing::info!(
            "Generated test {} with {} questions ({} / {})",
            test.id,
            test.questions.len(),
            test.subject,
            test.grade_level
        );
        Ok(test)
    }
}

/// Prompt stating the JSON shape, a worked example and the constraints
pub fn build_prompt(spec: &AssessmentSpec) -> String {
    let types: Vec<&str> = spec.question_types.iter().map(|t| t.as_str()).collect();

    format!(
        "Create a {subject} test for a {grade} student with exactly {count} questions.\n\
         Allowed question types: {types}.\n\n\
         Reply with JSON in exactly this shape:\n\
         {{\"questions\":[\
         {{\"type\":\"multiple-choice\",\"question\":\"What is 3 x 4?\",\
         \"options\":[\"7\",\"12\",\"14\",\"34\"],\"correctAnswer\":\"12\"}},\
         {{\"type\":\"short-answer\",\"question\":\"Explain why 3 x 4 equals 4 x 3.\",\
         \"correctAnswer\":\"Multiplication is commutative: swapping the factors gives the same product.\",\
         \"rubric\":\"Full credit for naming the commutative property or showing both arrays of 12; \
         partial credit for a correct example without explanation.\"}}\
         ]}}\n\n\
         Rules:\n\
         - Use only the allowed question types.\n\
         - Every question needs \"type\", \"question\" and \"correctAnswer\".\n\
         - Multiple-choice questions have exactly 4 options and \"correctAnswer\" is copied \
         word for word from one of them.\n\
         - Short-answer questions include a \"rubric\" describing how to award credit.\n\
         - Match the difficulty and vocabulary to {grade}.\n\
         - Output only the JSON object, no markdown and no explanation.",
        subject = spec.subject.trim(),
        grade = spec.grade_level.trim(),
        count = spec.count,
        types = types.join(", "),
    )
}

/// Parse model output into validated questions with ids `q1..qN`
pub fn parse_questions(
    text: &str,
    spec: &AssessmentSpec,
    config: &AssessmentConfig,
) -> Result<Vec<Question>, GenerationError> {
    let raw: RawTest = parse_with_policy(text, config.parse_policy)?;
    let mut raw_questions = raw.into_questions();

    let expected = spec.count as usize;
    if raw_questions.len() < expected {
        return Err(GenerationError::TooFewQuestions {
            expected: spec.count,
            actual: raw_questions.len(),
        });
    }
    if raw_questions.len() > expected {
        tracing::warn!(
            "Model produced {} questions, keeping the first {}",
            raw_questions.len(),
            expected
        );
        raw_questions.truncate(expected);
    }

    raw_questions
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            convert_question(raw, i + 1, spec, &config.default_rubric).map_err(|reason| {
                GenerationError::InvalidQuestion {
                    index: i + 1,
                    reason,
                }
            })
        })
        .collect()
}

fn convert_question(
    raw: RawQuestion,
    position: usize,
    spec: &AssessmentSpec,
    default_rubric: &str,
) -> Result<Question, String> {
    let kind = raw
        .kind
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| "missing type".to_string())?;
    let question_type: QuestionType = kind.parse()?;
    if !spec.question_types.contains(&question_type) {
        return Err(format!("type {} was not requested", question_type));
    }

    let prompt = non_blank(raw.question).ok_or_else(|| "missing question text".to_string())?;
    let correct_answer = non_blank(raw.correct_answer.and_then(scalar_text))
        .ok_or_else(|| "missing correct answer".to_string())?;
    let id = format!("q{}", position);

    match question_type {
        QuestionType::MultipleChoice => {
            let options = raw.options.into_iter().filter_map(scalar_text).collect();
            let (options, correct_answer) = normalize_options(options, &correct_answer)?;
            Ok(Question::MultipleChoice(MultipleChoiceQuestion {
                id,
                prompt,
                options,
                correct_answer,
            }))
        }
        QuestionType::ShortAnswer => Ok(Question::ShortAnswer(ShortAnswerQuestion {
            id,
            prompt,
            correct_answer,
            rubric: non_blank(raw.rubric).unwrap_or_else(|| default_rubric.to_string()),
        })),
    }
}

/// Reduce options to exactly [`OPTION_COUNT`], keeping the correct one.
///
/// The correct answer is matched against the options exactly, then
/// case-insensitively, then as an option letter (`A`..`D`). If it sits
/// beyond the fourth option it replaces the fourth. Returns the options and
/// the correct answer spelled as its option.
pub fn normalize_options(
    options: Vec<String>,
    correct_answer: &str,
) -> Result<(Vec<String>, String), String> {
    let mut options: Vec<String> = options
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if options.len() < OPTION_COUNT {
        return Err(format!(
            "needs {} options, got {}",
            OPTION_COUNT,
            options.len()
        ));
    }

    let answer = correct_answer.trim();
    let position = options
        .iter()
        .position(|o| o == answer)
        .or_else(|| options.iter().position(|o| o.eq_ignore_ascii_case(answer)))
        .or_else(|| option_letter_index(answer))
        .ok_or_else(|| format!("correct answer '{}' is not one of the options", answer))?;

    let correct = options[position].clone();
    if options.len() > OPTION_COUNT {
        tracing::debug!("Truncating {} options to {}", options.len(), OPTION_COUNT);
        options.truncate(OPTION_COUNT);
        if position >= OPTION_COUNT {
            options[OPTION_COUNT - 1] = correct.clone();
        }
    }

    Ok((options, correct))
}

/// `"B"`, `"b)"` or `"(c)"` style answers
fn option_letter_index(answer: &str) -> Option<usize> {
    let letter: String = answer
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '.' | ' '))
        .collect();
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let index = (c.to_ascii_uppercase() as usize).checked_sub('A' as usize)?;
            (index < OPTION_COUNT).then_some(index)
        }
        _ => None,
    }
}

/// Models sometimes write numeric options as JSON numbers
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
