//! Parsing and validation of classification replies.
//!
//! Models are told to answer with bare JSON, but in practice replies
//! arrive fenced, prefixed with prose, or both. The parser strips that
//! decoration before deserialising, then coerces each field onto the
//! domain: unknown categories become `personal`, undated or malformed
//! reminder dates become none. Only a reply with no JSON object at all is
//! an error.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::models::Category;

/// A validated classification, ready to merge into an analysis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub title: String,
    pub summary: String,
    pub category: Category,
    pub reminder_date: Option<NaiveDate>,
}

#[derive(Debug, Error)]
pub enum ReplyParseError {
    #[error("no JSON object in model reply")]
    NoJson,

    #[error("malformed JSON in model reply: {0}")]
    Json(#[from] serde_json::Error),
}

/// A reply wrapped entirely in a code fence, with or without a language tag.
static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").unwrap());

/// Loose wire shape; every field optional so coercion happens in one place.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReply {
    title: Option<String>,
    summary: Option<String>,
    category: Option<String>,
    reminder_date: Option<String>,
}

/// Parse a model reply into a [`Classification`].
pub fn parse_reply(reply: &str) -> Result<Classification, ReplyParseError> {
    let trimmed = reply.trim();
    let unfenced = RE_CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let raw: RawReply = match serde_json::from_str(unfenced) {
        Ok(raw) => raw,
        // models sometimes wrap the object in prose; retry on the
        // outermost brace span before giving up
        Err(_) => match (unfenced.find('{'), unfenced.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str(&unfenced[start..=end])?
            }
            _ => return Err(ReplyParseError::NoJson),
        },
    };

    Ok(Classification {
        title: non_empty(raw.title).unwrap_or_else(|| "Scanned Document".to_string()),
        summary: non_empty(raw.summary).unwrap_or_else(|| "No summary available.".to_string()),
        category: raw
            .category
            .as_deref()
            .and_then(Category::parse)
            .unwrap_or(Category::Personal),
        reminder_date: raw
            .reminder_date
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()),
    })
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{"title":"British Gas Bill","summary":"£84.20 due by 12 March 2026.","category":"bill","reminderDate":"2026-03-12"}"#;

    #[test]
    fn parses_bare_json() {
        let c = parse_reply(WELL_FORMED).unwrap();
        assert_eq!(c.title, "British Gas Bill");
        assert_eq!(c.category, Category::Bill);
        assert_eq!(c.reminder_date, NaiveDate::from_ymd_opt(2026, 3, 12));
    }

    #[test]
    fn strips_json_code_fences() {
        let fenced = format!("```json\n{WELL_FORMED}\n```");
        assert_eq!(parse_reply(&fenced).unwrap().category, Category::Bill);
    }

    #[test]
    fn strips_untagged_code_fences() {
        let fenced = format!("```\n{WELL_FORMED}\n```");
        assert_eq!(parse_reply(&fenced).unwrap().category, Category::Bill);
    }

    #[test]
    fn recovers_json_wrapped_in_prose() {
        let chatty = format!("Sure! Here is the analysis:\n{WELL_FORMED}\nLet me know if you need more.");
        let c = parse_reply(&chatty).unwrap();
        assert_eq!(c.title, "British Gas Bill");
    }

    #[test]
    fn unknown_category_coerces_to_personal() {
        let c = parse_reply(r#"{"title":"T","summary":"S","category":"junk-mail"}"#).unwrap();
        assert_eq!(c.category, Category::Personal);
    }

    #[test]
    fn missing_category_defaults_to_personal() {
        let c = parse_reply(r#"{"title":"T","summary":"S"}"#).unwrap();
        assert_eq!(c.category, Category::Personal);
    }

    #[test]
    fn malformed_dates_become_none() {
        for date in ["12/03/2026", "March 12th", "null", "2026-3-1x", ""] {
            let reply = format!(
                r#"{{"title":"T","summary":"S","category":"bill","reminderDate":"{date}"}}"#
            );
            assert_eq!(parse_reply(&reply).unwrap().reminder_date, None, "date: {date}");
        }
    }

    #[test]
    fn null_reminder_date_is_none() {
        let c = parse_reply(r#"{"title":"T","summary":"S","category":"nhs","reminderDate":null}"#)
            .unwrap();
        assert_eq!(c.reminder_date, None);
    }

    #[test]
    fn blank_title_and_summary_get_defaults() {
        let c = parse_reply(r#"{"title":"  ","summary":"","category":"personal"}"#).unwrap();
        assert_eq!(c.title, "Scanned Document");
        assert_eq!(c.summary, "No summary available.");
    }

    #[test]
    fn replies_without_json_are_errors() {
        assert!(matches!(
            parse_reply("I could not read this document."),
            Err(ReplyParseError::NoJson)
        ));
        assert!(parse_reply("").is_err());
    }

    #[test]
    fn broken_json_inside_braces_is_an_error() {
        assert!(matches!(
            parse_reply(r#"here: {"title": "unterminated"#),
            Err(ReplyParseError::NoJson)
        ));
        assert!(parse_reply(r#"{"title": }"#).is_err());
    }
}
