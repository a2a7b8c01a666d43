//! Summary Builder
//!
//! One extra inference call turns the graded results into overall feedback.
//! If that call or its parsing fails, a deterministic summary is computed
//! from the results instead; a summary fault never fails the grading.

use crate::llm::json::{parse_with_policy, ParseError, ParsePolicy};
use crate::llm::router::ModelRouter;
use crate::llm::{InferenceRequest, LLMError};
use sdk::{GradingResult, Test, TestSummary};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
enum SummaryError {
    #[error("inference failed: {0}")]
    Inference(#[from] LLMError),

    #[error("unreadable summary: {0}")]
    Malformed(#[from] ParseError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummary {
    overall_score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    feedback: String,
}

pub struct SummaryBuilder {
    router: Arc<ModelRouter>,
    pass_score: u8,
    parse_policy: ParsePolicy,
}

impl SummaryBuilder {
    pub fn new(router: Arc<ModelRouter>, pass_score: u8, parse_policy: ParsePolicy) -> Self {
        Self {
            router,
            pass_score,
            parse_policy,
        }
    }

    /// Summary for a graded test, plus whether the fallback was used
    pub async fn build(&self, test: &Test, results: &[GradingResult]) -> (TestSummary, bool) {
        match self.generate(test, results).await {
            Ok(summary) => (summary, false),
            Err(e) => {
                tracing::warn!("Summary generation failed, using fallback: {}", e);
                (fallback_summary(results, self.pass_score), true)
            }
        }
    }

    async fn generate(
        &self,
        test: &Test,
        results: &[GradingResult],
    ) -> Result<TestSummary, SummaryError> {
        let results_json =
            serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string());

        let prompt = format!(
            "A {grade} student finished a {subject} test with {total} questions. \
             These are the graded results, one per question:\n{results}\n\n\
             Write an overall summary as JSON in exactly this shape:\n\
             {{\"overallScore\": 0-100, \"strengths\": [\"...\"], \"improvements\": [\"...\"], \
             \"recommendations\": [\"...\"], \"feedback\": \"...\"}}\n\
             Results of type \"error\" were not answered or could not be graded; leave them out \
             of the score and mention them as things to work on. Speak to the student \
             directly and keep it encouraging.",
            grade = test.grade_level,
            subject = test.subject,
            total = test.questions.len(),
            results = results_json,
        );

        let request = InferenceRequest::text(prompt).json();
        let response = self.router.call(&request).await?;
        let raw: RawSummary = parse_with_policy(&response.text, self.parse_policy)?;

        Ok(TestSummary {
            overall_score: clamp_score(raw.overall_score),
            strengths: raw.strengths,
            improvements: raw.improvements,
            recommendations: raw.recommendations,
            feedback: raw.feedback,
        })
    }
}

/// Round and clamp a model-reported score into 0..=100
pub(crate) fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

/// Deterministic summary computed from the results alone.
///
/// `overallScore = round(correct / graded * 100)`, where a result is correct
/// when a multiple-choice answer is marked correct or a short-answer score
/// reaches `pass_score`. Error results are left out of the denominator and
/// only show up in the improvements text. No graded results yields 0.
pub fn fallback_summary(results: &[GradingResult], pass_score: u8) -> TestSummary {
    let ungraded = results.iter().filter(|r| r.is_error()).count();
    let total = results.len() - ungraded;
    let correct = results
        .iter()
        .filter(|r| r.counts_as_correct(pass_score))
        .count();

    let overall_score = if total == 0 {
        0
    } else {
        clamp_score(correct as f64 / total as f64 * 100.0)
    };

    let mut strengths = Vec::new();
    let mut improvements = Vec::new();
    let mut recommendations = Vec::new();

    if correct > 0 {
        strengths.push(format!(
            "Answered {} of {} questions correctly",
            correct, total
        ));
    }
    if correct < total {
        improvements.push(format!(
            "Review the {} you missed",
            questions(total - correct)
        ));
    }
    if ungraded > 0 {
        improvements.push(format!(
            "{} left unanswered or could not be graded",
            questions(ungraded)
        ));
        recommendations.push("Try to answer every question, even with a best guess".to_string());
    }
    if overall_score < pass_score {
        recommendations.push("Go over this topic again and retake the test".to_string());
    } else {
        recommendations.push("Move on to a more challenging test on this topic".to_string());
    }

    let feedback = match overall_score {
        90..=100 => "Excellent work! You clearly understand this topic.",
        70..=89 => "Good job! You have a solid grasp of most of this topic.",
        40..=69 => "Nice effort. Some parts of this topic need more practice.",
        _ => "Keep going. Practicing this topic a bit more will help a lot.",
    };

    TestSummary {
        overall_score,
        strengths,
        improvements,
        recommendations,
        feedback: format!("You scored {}%. {}", overall_score, feedback),
    }
}

fn questions(n: usize) -> String {
    if n == 1 {
        "1 question".to_string()
    } else {
        format!("{} questions", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::{ChoiceGrade, WrittenGrade};

    fn choice(id: &str, is_correct: bool) -> GradingResult {
        GradingResult::MultipleChoice(ChoiceGrade {
            question_id: id.to_string(),
            is_correct,
            feedback: String::new(),
        })
    }

    fn written(id: &str, score: u8) -> GradingResult {
        GradingResult::ShortAnswer(WrittenGrade {
            question_id: id.to_string(),
            score,
            feedback: String::new(),
            strengths: vec![],
            improvements: vec![],
        })
    }

    #[test]
    fn test_fallback_score_formula() {
        let results = vec![
            choice("q1", true),
            written("q2", 75),
            GradingResult::error("q3", sdk::NO_ANSWER_REASON),
        ];

        let summary = fallback_summary(&results, 70);
        assert_eq!(summary.overall_score, 100);
        assert!(summary.feedback.starts_with("You scored 100%"));
        assert_eq!(summary.strengths, vec!["Answered 2 of 2 questions correctly"]);
        assert_eq!(
            summary.improvements,
            vec!["1 question left unanswered or could not be graded"]
        );
    }

    #[test]
    fn test_fallback_ignores_ungraded_in_denominator() {
        let results = vec![
            choice("q1", true),
            choice("q2", false),
            GradingResult::error("q3", sdk::NO_ANSWER_REASON),
            GradingResult::error("q4", "grading failed"),
        ];

        let summary = fallback_summary(&results, 70);
        assert_eq!(summary.overall_score, 50);
        assert_eq!(
            summary.improvements,
            vec![
                "Review the 1 question you missed",
                "2 questions left unanswered or could not be graded",
            ]
        );

        let only_errors = vec![GradingResult::error("q1", sdk::NO_ANSWER_REASON)];
        let summary = fallback_summary(&only_errors, 70);
        assert_eq!(summary.overall_score, 0);
        assert!(summary.strengths.is_empty());
    }

    #[test]
    fn test_fallback_pass_threshold() {
        let results = vec![written("q1", 69), written("q2", 70)];
        assert_eq!(fallback_summary(&results, 70).overall_score, 50);
        assert_eq!(fallback_summary(&results, 60).overall_score, 100);
    }

    #[test]
    fn test_fallback_all_wrong_and_empty() {
        let results = vec![choice("q1", false), choice("q2", false)];
        let summary = fallback_summary(&results, 70);
        assert_eq!(summary.overall_score, 0);
        assert!(summary.strengths.is_empty());

        assert_eq!(fallback_summary(&[], 70).overall_score, 0);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(120.0), 100);
        assert_eq!(clamp_score(-5.0), 0);
        assert_eq!(clamp_score(66.6), 67);
        assert_eq!(clamp_score(f64::NAN), 0);
    }
}
