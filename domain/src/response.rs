//! Parser for participant answer payloads
//!
//! A participant replies to a question with a small XML document whose
//! root `<answer>` element states whether the question was answered:
//!
//! ```xml
//! <answer answered="yes" time="50">
//!   <content>The answer text</content>
//!   <resources>http://a.example, http://b.example</resources>
//!   <title-foci>...</title-foci>
//!   <body-foci>...</body-foci>
//!   <summary>...</summary>
//! </answer>
//! ```
//!
//! or, when declining:
//!
//! ```xml
//! <answer answered="no"><discard-reason>busy</discard-reason></answer>
//! ```
//!
//! Every parse failure is the participant's error, not the coordinator's:
//! it surfaces as [`MalformedResponse`] and is recorded as that
//! participant's outcome, never as a round failure.

use thiserror::Error;
use tracing::info;

use crate::limits::AnswerLimits;
use crate::outcome::{Answer, DeclineReason};
use crate::util::truncate_chars;

pub const ANSWER_ELEMENT: &str = "answer";
pub const ANSWERED_ATTRIBUTE: &str = "answered";
pub const REPORTED_TIME_ATTRIBUTE: &str = "time";
pub const CONTENT_ELEMENT: &str = "content";
pub const RESOURCES_ELEMENT: &str = "resources";
pub const TITLE_FOCI_ELEMENT: &str = "title-foci";
pub const BODY_FOCI_ELEMENT: &str = "body-foci";
pub const SUMMARY_ELEMENT: &str = "summary";
pub const DISCARD_REASON_ELEMENT: &str = "discard-reason";
pub const RESOURCES_SEPARATOR: char = ',';

/// Why a participant's payload could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedResponse {
    #[error("response is not well-formed XML: {0}")]
    InvalidMarkup(String),

    #[error("response has no <{0}> element")]
    MissingElement(String),

    #[error("answered attribute value \"{0}\" is not one of true/false/yes/no")]
    BadAnsweredFlag(String),

    #[error("time attribute value \"{0}\" is not an integer")]
    BadReportedTime(String),
}

/// A successfully parsed payload: either an answer or an explicit decline.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Answered(Answer),
    Declined(DeclineReason),
}

/// Parse a participant's raw response body.
///
/// Pure function: parsing the same body twice yields identical results.
/// Answer text and summary longer than the configured maxima are silently
/// truncated (logged, not erroring).
pub fn parse_answer_payload(
    body: &str,
    limits: &AnswerLimits,
) -> Result<ParsedResponse, MalformedResponse> {
    let document = roxmltree::Document::parse(body)
        .map_err(|e| MalformedResponse::InvalidMarkup(e.to_string()))?;

    let answer_element = find_answer_element(&document)
        .ok_or_else(|| MalformedResponse::MissingElement(ANSWER_ELEMENT.to_string()))?;

    let answered_flag = answer_element.attribute(ANSWERED_ATTRIBUTE).unwrap_or("");
    if interpret_yes_no(answered_flag)? {
        parse_answered(&answer_element, limits).map(ParsedResponse::Answered)
    } else {
        Ok(ParsedResponse::Declined(parse_declined(&answer_element)))
    }
}

/// The `<answer>` element is normally the document root, but a payload
/// that wraps it in one enclosing element is accepted as well.
fn find_answer_element<'a>(
    document: &'a roxmltree::Document<'a>,
) -> Option<roxmltree::Node<'a, 'a>> {
    let root = document.root_element();
    if root.has_tag_name(ANSWER_ELEMENT) {
        return Some(root);
    }
    root.children()
        .find(|n| n.is_element() && n.has_tag_name(ANSWER_ELEMENT))
}

fn interpret_yes_no(value: &str) -> Result<bool, MalformedResponse> {
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("no") {
        Ok(false)
    } else {
        Err(MalformedResponse::BadAnsweredFlag(value.to_string()))
    }
}

fn parse_answered(
    answer_element: &roxmltree::Node<'_, '_>,
    limits: &AnswerLimits,
) -> Result<Answer, MalformedResponse> {
    let reported_time_ms = parse_reported_time(answer_element)?;

    let content = child_element(answer_element, CONTENT_ELEMENT)
        .ok_or_else(|| MalformedResponse::MissingElement(CONTENT_ELEMENT.to_string()))?;
    let mut text = content.text().unwrap_or("").to_string();
    if text.chars().count() > limits.max_answer_len {
        info!(
            original_len = text.chars().count(),
            max_len = limits.max_answer_len,
            "truncating a too-long answer"
        );
        text = truncate_chars(&text, limits.max_answer_len).to_string();
    }

    let resources = child_element(answer_element, RESOURCES_ELEMENT)
        .and_then(|n| n.text())
        .map(parse_resources)
        .unwrap_or_default();

    let title_foci = optional_text(answer_element, TITLE_FOCI_ELEMENT);
    let body_foci = optional_text(answer_element, BODY_FOCI_ELEMENT);

    let mut summary = optional_text(answer_element, SUMMARY_ELEMENT);
    if summary.chars().count() > limits.max_summary_len {
        info!(
            original_len = summary.chars().count(),
            max_len = limits.max_summary_len,
            "truncating a too-long summary"
        );
        summary = truncate_chars(&summary, limits.max_summary_len).to_string();
    }

    Ok(Answer { text, reported_time_ms, resources, title_foci, body_foci, summary })
}

/// The `time` attribute defaults to 0 when absent or empty; a present but
/// non-numeric value is the participant's error.
fn parse_reported_time(
    answer_element: &roxmltree::Node<'_, '_>,
) -> Result<i64, MalformedResponse> {
    match answer_element.attribute(REPORTED_TIME_ATTRIBUTE) {
        None => Ok(0),
        Some("") => Ok(0),
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| MalformedResponse::BadReportedTime(value.to_string())),
    }
}

fn parse_declined(answer_element: &roxmltree::Node<'_, '_>) -> DeclineReason {
    DeclineReason::new(optional_text(answer_element, DISCARD_REASON_ELEMENT))
}

fn parse_resources(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split(RESOURCES_SEPARATOR)
        .map(|entry| entry.trim().to_string())
        .collect()
}

fn child_element<'a>(
    node: &roxmltree::Node<'a, 'a>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| n.is_element() && n.has_tag_name(name))
}

fn optional_text(node: &roxmltree::Node<'_, '_>, name: &str) -> String {
    child_element(node, name)
        .and_then(|n| n.text())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> AnswerLimits {
        AnswerLimits { max_answer_len: 1000, max_summary_len: 250 }
    }

    fn parse(body: &str) -> Result<ParsedResponse, MalformedResponse> {
        parse_answer_payload(body, &limits())
    }

    #[test]
    fn test_answered_with_time_and_content() {
        let parsed =
            parse(r#"<answer answered="yes" time="50"><content>hello</content></answer>"#)
                .unwrap();
        match parsed {
            ParsedResponse::Answered(answer) => {
                assert_eq!(answer.text, "hello");
                assert_eq!(answer.reported_time_ms, 50);
                assert!(answer.resources.is_empty());
            }
            other => panic!("expected an answer, got {:?}", other),
        }
    }

    #[test]
    fn test_declined_with_reason() {
        let parsed =
            parse(r#"<answer answered="no"><discard-reason>busy</discard-reason></answer>"#)
                .unwrap();
        assert_eq!(parsed, ParsedResponse::Declined(DeclineReason::new("busy")));
    }

    #[test]
    fn test_declined_without_reason_defaults_to_empty() {
        let parsed = parse(r#"<answer answered="no"></answer>"#).unwrap();
        assert_eq!(parsed, ParsedResponse::Declined(DeclineReason::new("")));
    }

    #[test]
    fn test_unknown_answered_token_is_malformed() {
        let err = parse(r#"<answer answered="maybe"></answer>"#).unwrap_err();
        assert_eq!(err, MalformedResponse::BadAnsweredFlag("maybe".to_string()));
    }

    #[test]
    fn test_missing_answered_attribute_is_malformed() {
        let err = parse(r#"<answer><content>hello</content></answer>"#).unwrap_err();
        assert_eq!(err, MalformedResponse::BadAnsweredFlag(String::new()));
    }

    #[test]
    fn test_answered_tokens_are_case_insensitive() {
        for token in ["TRUE", "Yes", "yes", "true"] {
            let body = format!(r#"<answer answered="{token}"><content>x</content></answer>"#);
            assert!(matches!(parse(&body).unwrap(), ParsedResponse::Answered(_)));
        }
        for token in ["FALSE", "No", "no", "false"] {
            let body = format!(r#"<answer answered="{token}"></answer>"#);
            assert!(matches!(parse(&body).unwrap(), ParsedResponse::Declined(_)));
        }
    }

    #[test]
    fn test_missing_content_is_malformed() {
        let err = parse(r#"<answer answered="yes"></answer>"#).unwrap_err();
        assert_eq!(err, MalformedResponse::MissingElement("content".to_string()));
    }

    #[test]
    fn test_time_attribute_defaults_to_zero() {
        let parsed = parse(r#"<answer answered="yes"><content>x</content></answer>"#).unwrap();
        match parsed {
            ParsedResponse::Answered(answer) => assert_eq!(answer.reported_time_ms, 0),
            other => panic!("expected an answer, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_time_is_malformed() {
        let err =
            parse(r#"<answer answered="yes" time="fast"><content>x</content></answer>"#)
                .unwrap_err();
        assert_eq!(err, MalformedResponse::BadReportedTime("fast".to_string()));
    }

    #[test]
    fn test_resources_are_split_and_trimmed() {
        let parsed = parse(
            r#"<answer answered="yes"><content>x</content><resources> a.example , b.example </resources></answer>"#,
        )
        .unwrap();
        match parsed {
            ParsedResponse::Answered(answer) => {
                assert_eq!(answer.resources, vec!["a.example", "b.example"]);
            }
            other => panic!("expected an answer, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_elements_default_to_empty() {
        let parsed = parse(r#"<answer answered="yes"><content>x</content></answer>"#).unwrap();
        match parsed {
            ParsedResponse::Answered(answer) => {
                assert_eq!(answer.title_foci, "");
                assert_eq!(answer.body_foci, "");
                assert_eq!(answer.summary, "");
            }
            other => panic!("expected an answer, got {:?}", other),
        }
    }

    #[test]
    fn test_answer_text_truncated_to_limit() {
        let narrow = AnswerLimits { max_answer_len: 5, max_summary_len: 3 };
        let parsed = parse_answer_payload(
            r#"<answer answered="yes"><content>abcdefghij</content><summary>wxyz</summary></answer>"#,
            &narrow,
        )
        .unwrap();
        match parsed {
            ParsedResponse::Answered(answer) => {
                assert_eq!(answer.text, "abcde");
                assert_eq!(answer.summary, "wxy");
            }
            other => panic!("expected an answer, got {:?}", other),
        }
    }

    #[test]
    fn test_wrapped_answer_element_accepted() {
        let parsed = parse(
            r#"<xml><answer answered="yes"><content>hello</content></answer></xml>"#,
        )
        .unwrap();
        assert!(matches!(parsed, ParsedResponse::Answered(_)));
    }

    #[test]
    fn test_unparsable_markup_is_malformed() {
        let err = parse("this is not xml <").unwrap_err();
        assert!(matches!(err, MalformedResponse::InvalidMarkup(_)));
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let body = r#"<answer answered="yes" time="7"><content>hello</content></answer>"#;
        assert_eq!(parse(body).unwrap(), parse(body).unwrap());
    }
}
