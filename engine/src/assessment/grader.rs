//! Response Grader
//!
//! Grades each answer with its own inference call. Calls run with bounded
//! concurrency and each result is written into the slot of its question, so
//! completion order never affects alignment. A failure on one question
//! becomes an error result at that index and the rest of the batch goes on.

use super::summary::{clamp_score, SummaryBuilder};
use crate::config::AssessmentConfig;
use crate::llm::json::{parse_with_policy, ParsePolicy};
use crate::llm::router::ModelRouter;
use crate::llm::InferenceRequest;
use futures::stream::{self, StreamExt};
use sdk::{
    ChoiceGrade, GradingReport, GradingResult, MultipleChoiceQuestion, Question,
    ShortAnswerQuestion, Test, WrittenGrade, NO_ANSWER_REASON,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

const GRADER_INSTRUCTION: &str =
    "You grade school test answers fairly and kindly. You reply with a single JSON object and nothing else.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChoiceGrade {
    is_correct: bool,
    #[serde(default)]
    feedback: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWrittenGrade {
    score: f64,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
}

pub struct ResponseGrader {
    router: Arc<ModelRouter>,
    summary: SummaryBuilder,
    concurrency: usize,
    parse_policy: ParsePolicy,
}

impl ResponseGrader {
    pub fn new(router: Arc<ModelRouter>, config: &AssessmentConfig) -> Self {
        Self {
            summary: SummaryBuilder::new(Arc::clone(&router), config.pass_score, config.parse_policy),
            router,
            concurrency: config.grading_concurrency.max(1),
            parse_policy: config.parse_policy,
        }
    }

    /// Grade every answer and summarize.
    ///
    /// `answers[i]` answers `test.questions[i]`. Missing trailing answers count
    /// as blank and extra answers are ignored. Never fails: whatever could be
    /// graded is returned.
    pub async fn grade(&self, test: &Test, answers: &[String]) -> GradingReport {
        let results = self.grade_answers(test, answers).await;
        let (summary, used_fallback_summary) = self.summary.build(test, &results).await;

        GradingReport {
            results,
            summary,
            used_fallback_summary,
        }
    }

    /// Per-question results, aligned with `test.questions`
    pub async fn grade_answers(&self, test: &Test, answers: &[String]) -> Vec<GradingResult> {
        let mut slots: Vec<Option<GradingResult>> = vec![None; test.questions.len()];

        let mut graded = stream::iter(test.questions.iter().enumerate().map(|(index, question)| {
            let answer = answers.get(index).map(String::as_str).unwrap_or("");
            async move { (index, self.grade_one(test, question, answer).await) }
        }))
        .buffer_unordered(self.concurrency);

        while let Some((index, result)) = graded.next().await {
            slots[index] = Some(result);
        }

        let results: Vec<GradingResult> = slots
            .into_iter()
            .zip(&test.questions)
            .map(|(slot, question)| {
                slot.unwrap_or_else(|| GradingResult::error(question.id(), "Not graded"))
            })
            .collect();

        tracing::info!(
            "Graded test {}: {} results, {} errors",
            test.id,
            results.len(),
            results.iter().filter(|r| r.is_error()).count()
        );
        results
    }

    /// Grade a single answer. Blank answers are never sent to the model.
    pub async fn grade_one(&self, test: &Test, question: &Question, answer: &str) -> GradingResult {
        let answer = answer.trim();
        if answer.is_empty() {
            return GradingResult::error(question.id(), NO_ANSWER_REASON);
        }

        match question {
            Question::MultipleChoice(q) => self.grade_choice(test, q, answer).await,
            Question::ShortAnswer(q) => self.grade_written(test, q, answer).await,
        }
    }

    async fn grade_choice(
        &self,
        test: &Test,
        question: &MultipleChoiceQuestion,
        answer: &str,
    ) -> GradingResult {
        let options: Vec<String> = question
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}) {}", (b'A' + i as u8) as char, o))
            .collect();

        let prompt = format!(
            "Subject: {subject} ({grade})\n\
             Question: {question}\n\
             Options:\n{options}\n\
             Correct answer: {correct}\n\
             Student answer: {answer}\n\n\
             Decide whether the student chose the correct answer and explain briefly.\n\
             Reply with JSON in exactly this shape:\n\
             {{\"isCorrect\": true, \"feedback\": \"...\"}}",
            subject = test.subject,
            grade = test.grade_level,
            question = question.prompt,
            options = options.join("\n"),
            correct = question.correct_answer,
            answer = answer,
        );

        match self.ask::<RawChoiceGrade>(&question.id, prompt).await {
            Ok(raw) => GradingResult::MultipleChoice(ChoiceGrade {
                question_id: question.id.clone(),
                is_correct: raw.is_correct,
                feedback: raw.feedback,
            }),
            Err(result) => result,
        }
    }

    async fn grade_written(
        &self,
        test: &Test,
        question: &ShortAnswerQuestion,
        answer: &str,
    ) -> GradingResult {
        let prompt = format!(
            "Subject: {subject} ({grade})\n\
             Question: {question}\n\
             Model answer: {correct}\n\
             Rubric: {rubric}\n\
             Student answer: {answer}\n\n\
             Score the student answer from 0 to 100 using the rubric.\n\
             Reply with JSON in exactly this shape:\n\
             {{\"score\": 85, \"feedback\": \"...\", \"strengths\": [\"...\"], \"improvements\": [\"...\"]}}",
            subject = test.subject,
            grade = test.grade_level,
            question = question.prompt,
            correct = question.correct_answer,
            rubric = question.rubric,
            answer = answer,
        );

        match self.ask::<RawWrittenGrade>(&question.id, prompt).await {
            Ok(raw) => GradingResult::ShortAnswer(WrittenGrade {
                question_id: question.id.clone(),
                score: clamp_score(raw.score),
                feedback: raw.feedback,
                strengths: raw.strengths,
                improvements: raw.improvements,
            }),
            Err(result) => result,
        }
    }

    /// One grading call. On failure the error result for `question_id` is
    /// returned instead.
    async fn ask<T: DeserializeOwned>(
        &self,
        question_id: &str,
        prompt: String,
    ) -> Result<T, GradingResult> {
        let request = InferenceRequest::text(prompt)
            .with_system_instruction(GRADER_INSTRUCTION)
            .json();

        let response = self.router.call(&request).await.map_err(|e| {
            tracing::warn!("Grading {} failed: {}", question_id, e);
            GradingResult::error(question_id, format!("Grading failed: {}", e))
        })?;

        parse_with_policy(&response.text, self.parse_policy).map_err(|e| {
            tracing::warn!("Grading {} returned unreadable output: {}", question_id, e);
            GradingResult::error(question_id, format!("Could not read grading output: {}", e))
        })
    }
}
