//! Tolerant JSON parsing for model output
//!
//! Models asked for JSON often wrap it in markdown fences, append prose or
//! comments, or precede it with an explanation. Parsing happens in two
//! explicit stages:
//!
//! 1. [`parse_strict`]: the trimmed text must be the JSON value.
//! 2. [`parse_lenient`]: strip fences and trailing comment lines, try a direct
//!    parse, then fall back to balanced `{...}` or `[...]` spans in order.
//!
//! [`ParsePolicy`] lets callers pick fail-fast or repair-tolerant behavior.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Errors produced while parsing model output
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("No JSON object found in model output")]
    NoJson,

    #[error("Invalid JSON: {0}")]
    Invalid(String),
}

/// Parsing strategy for model output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Only accept output that is exactly one JSON value
    Strict,

    /// Strip fences and prose, then extract the first balanced span that parses
    #[default]
    Repair,
}

/// Parse `content` according to `policy`
pub fn parse_with_policy<T: DeserializeOwned>(
    content: &str,
    policy: ParsePolicy,
) -> Result<T, ParseError> {
    match policy {
        ParsePolicy::Strict => parse_strict(content),
        ParsePolicy::Repair => parse_lenient(content),
    }
}

/// Parse the trimmed text as JSON, nothing more
pub fn parse_strict<T: DeserializeOwned>(content: &str) -> Result<T, ParseError> {
    serde_json::from_str(content.trim()).map_err(|e| ParseError::Invalid(e.to_string()))
}

/// Parse model output, repairing common wrapping.
pub fn parse_lenient<T: DeserializeOwned>(content: &str) -> Result<T, ParseError> {
    let cleaned = strip_fences(content);

    let direct_error = match serde_json::from_str::<T>(&cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    // Spans nested inside one that failed are not tried on their own
    let mut last_error = None;
    let mut resume = 0;
    for (start, _) in cleaned.match_indices(['{', '[']) {
        if start < resume {
            continue;
        }
        let Some(span) = extract_balanced_json(&cleaned[start..]) else {
            continue;
        };
        match serde_json::from_str::<T>(span) {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_error = Some(e.to_string());
                resume = start + span.len();
            }
        }
    }

    match last_error {
        Some(e) => Err(ParseError::Invalid(e)),
        None => {
            tracing::debug!("Direct parse failed ({}) and no JSON span found", direct_error);
            Err(ParseError::NoJson)
        }
    }
}

/// Remove markdown code fences and comment-like trailing lines.
///
/// If the text contains a fenced block, only the body of the first block is
/// kept (anything after the closing fence is dropped). Lines starting with
/// `//` are removed; JSON strings cannot span lines, so this never touches
/// string content.
pub fn strip_fences(content: &str) -> String {
    let trimmed = content.trim();
    let body = extract_fenced_body(trimmed).unwrap_or(trimmed);

    body.lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```. An
/// unterminated fence yields everything after the opening line.
fn extract_fenced_body(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let body_end = match content[body_start..].find("```") {
        Some(closing) => body_start + closing,
        None => content.len(),
    };

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object or array starting at position 0 of `s`.
///
/// Counts bracket depth, respecting string literals and escapes, to find
/// the matching close.
pub fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with(['{', '[']) {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_strict_accepts_bare_json() {
        let value: Value = parse_strict(r#"  {"a": 1}  "#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_strict_rejects_fenced_json() {
        let result: Result<Value, _> = parse_strict("```json\n{\"a\": 1}\n```");
        assert!(matches!(result, Err(ParseError::Invalid(_))));
    }

    #[test]
    fn test_lenient_strips_fence_and_trailing_prose() {
        let content = "```json\n{\"score\": 80, \"feedback\": \"Good\"}\n```\nLet me know if you need more!";
        let value: Value = parse_lenient(content).unwrap();
        assert_eq!(value, json!({"score": 80, "feedback": "Good"}));
    }

    #[test]
    fn test_lenient_handles_unlabelled_fence() {
        let value: Value = parse_lenient("```\n{\"ok\": true}\n```").unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn test_lenient_drops_comment_lines() {
        let content = "{\n  \"isCorrect\": true,\n  // the student chose B\n  \"feedback\": \"Right\"\n}\n// end";
        let value: Value = parse_lenient(content).unwrap();
        assert_eq!(value, json!({"isCorrect": true, "feedback": "Right"}));
    }

    #[test]
    fn test_lenient_keeps_urls_inside_strings() {
        let content = r#"{"link": "https://example.com/a"}"#;
        let value: Value = parse_lenient(content).unwrap();
        assert_eq!(value["link"], "https://example.com/a");
    }

    #[test]
    fn test_lenient_extracts_object_from_prose() {
        let content = r#"Sure! Here is the grade: {"score": 55, "feedback": "Use {units}"} Hope it helps."#;
        let value: Value = parse_lenient(content).unwrap();
        assert_eq!(value["score"], 55);
        assert_eq!(value["feedback"], "Use {units}");
    }

    #[test]
    fn test_lenient_extracts_array_from_prose() {
        let content = r#"Here are your questions: [{"question": "2 + 2?"}, {"question": "3 + 3?"}] Good luck!"#;
        let value: Value = parse_lenient(content).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[1]["question"], "3 + 3?");
    }

    #[test]
    fn test_lenient_skips_spans_of_the_wrong_shape() {
        #[derive(Debug, serde::Deserialize)]
        struct Grade {
            score: u8,
        }

        let content = r#"Question [2] graded: {"score": 90}"#;
        let grade: Grade = parse_lenient(content).unwrap();
        assert_eq!(grade.score, 90);

        let result: Result<Grade, _> = parse_lenient("Only [1, 2] here");
        assert!(matches!(result, Err(ParseError::Invalid(_))));
    }

    #[test]
    fn test_lenient_reports_missing_json() {
        let result: Result<Value, _> = parse_lenient("I cannot grade this answer.");
        assert_eq!(result.unwrap_err(), ParseError::NoJson);
    }

    #[test]
    fn test_lenient_reports_unbalanced_object() {
        let result: Result<Value, _> = parse_lenient("Result: {\"score\": 10,");
        assert_eq!(result.unwrap_err(), ParseError::NoJson);
    }

    #[test]
    fn test_extract_balanced_json_respects_escapes() {
        let s = r#"{"a": "quote \" and } brace"} trailing"#;
        assert_eq!(
            extract_balanced_json(s),
            Some(r#"{"a": "quote \" and } brace"}"#)
        );
    }

    #[test]
    fn test_parse_with_policy_dispatch() {
        let fenced = "```json\n{\"a\": 2}\n```";
        let repaired: Value = parse_with_policy(fenced, ParsePolicy::Repair).unwrap();
        assert_eq!(repaired, json!({"a": 2}));
        assert!(parse_with_policy::<Value>(fenced, ParsePolicy::Strict).is_err());
    }
}
