//! Front-matter parsing

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::DocumentError;

/// Marker line opening and closing the metadata block
const MARKER: &str = "---";

/// The metadata block as written, before required fields are checked
#[derive(Debug, Deserialize)]
struct RawMetadata {
    title: Option<String>,
    date: Option<String>,
    draft: Option<bool>,
    author: Option<String>,
    summary: Option<String>,
    image: Option<String>,

    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

/// Decoded metadata of a document
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub date: DateTime<FixedOffset>,
    /// Drafts stay out of published builds
    pub draft: bool,
    pub author: Option<String>,
    /// Index excerpt and page description
    pub summary: Option<String>,
    /// Hero image, relative to the document
    pub image: Option<String>,
    /// Keys this crate does not interpret
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Metadata {
    /// Parse the leading metadata block of `content`.
    /// Returns (metadata, remaining body)
    pub fn parse(content: &str) -> Result<(Self, &str), DocumentError> {
        let (block, body) = split_block(content)?;

        if block.trim().is_empty() {
            return Err(DocumentError::MissingRequiredField("title"));
        }

        let raw: RawMetadata = serde_yaml::from_str(block)
            .map_err(|e| DocumentError::MalformedMetadata(e.to_string()))?;

        let title = raw
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or(DocumentError::MissingRequiredField("title"))?;

        let date = raw
            .date
            .filter(|d| !d.trim().is_empty())
            .ok_or(DocumentError::MissingRequiredField("date"))?;
        let date = parse_date_string(&date).ok_or_else(|| {
            DocumentError::MalformedMetadata(format!("unrecognized date `{}`", date))
        })?;

        let metadata = Metadata {
            title: title.trim().to_string(),
            date,
            draft: raw.draft.unwrap_or(false),
            author: raw.author,
            summary: raw.summary,
            image: raw.image.filter(|i| !i.trim().is_empty()),
            extra: raw.extra,
        };

        Ok((metadata, body.trim_start_matches(['\n', '\r'])))
    }
}

/// Split `content` into the metadata block and the text after its closing marker
fn split_block(content: &str) -> Result<(&str, &str), DocumentError> {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    let mut lines = content.split_inclusive('\n');
    let opening = lines
        .next()
        .filter(|line| line.trim_end() == MARKER)
        .ok_or_else(|| DocumentError::MalformedMetadata("missing metadata block".to_string()))?;

    let start = opening.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == MARKER {
            return Ok((&content[start..offset], &content[offset + line.len()..]));
        }
        offset += line.len();
    }

    Err(DocumentError::MalformedMetadata(
        "unterminated metadata block".to_string(),
    ))
}

/// Parse a date string in various formats. Values without an offset are UTC.
fn parse_date_string(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    // Try RFC 3339 / ISO 8601 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    let with_offset = ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%dT%H:%M:%S%z"];
    for fmt in with_offset {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    let utc = FixedOffset::east_opt(0)?;

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return dt.and_local_timezone(utc).single();
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0)?.and_local_timezone(utc).single();
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata() {
        let content = r#"---
title: "How to easily upgrade, downgrade, and migrate Go modules"
date: 2020-03-05
draft: false
author: Jane Doe
summary: Moving between major versions without editing every import by hand.
image: cover.png
---

This is the content.
"#;

        let (meta, body) = Metadata::parse(content).unwrap();
        assert_eq!(
            meta.title,
            "How to easily upgrade, downgrade, and migrate Go modules"
        );
        assert_eq!(meta.date.format("%Y-%m-%d").to_string(), "2020-03-05");
        assert!(!meta.draft);
        assert_eq!(meta.author.as_deref(), Some("Jane Doe"));
        assert_eq!(meta.image.as_deref(), Some("cover.png"));
        assert_eq!(body, "This is the content.\n");
    }

    #[test]
    fn test_draft_defaults_to_false() {
        let (meta, _) = Metadata::parse("---\ntitle: A\ndate: 2024-01-15\n---\nbody").unwrap();
        assert!(!meta.draft);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let content = "---\ntitle: Twice\ndate: 2024-01-15 10:30:00\nseries: go\n---\n# Body\n";
        let first = Metadata::parse(content).unwrap();
        let second = Metadata::parse(content).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_block_is_malformed() {
        let err = Metadata::parse("# Just markdown\n").unwrap_err();
        assert!(matches!(err, DocumentError::MalformedMetadata(_)));
    }

    #[test]
    fn test_unterminated_block_is_malformed() {
        let err = Metadata::parse("---\ntitle: Open\ndate: 2024-01-15\n\nbody").unwrap_err();
        assert!(matches!(err, DocumentError::MalformedMetadata(_)));
    }

    #[test]
    fn test_four_dashes_do_not_close_block() {
        let err = Metadata::parse("---\ntitle: A\ndate: 2024-01-15\n----\nbody").unwrap_err();
        assert!(matches!(err, DocumentError::MalformedMetadata(_)));
    }

    #[test]
    fn test_wrong_scalar_type_is_malformed() {
        let err =
            Metadata::parse("---\ntitle: A\ndate: 2024-01-15\ndraft: maybe\n---\n").unwrap_err();
        assert!(matches!(err, DocumentError::MalformedMetadata(_)));
    }

    #[test]
    fn test_bad_date_is_malformed() {
        let err = Metadata::parse("---\ntitle: A\ndate: last tuesday\n---\n").unwrap_err();
        assert!(matches!(err, DocumentError::MalformedMetadata(_)));
    }

    #[test]
    fn test_missing_date() {
        let err = Metadata::parse("---\ntitle: No date\n---\nbody").unwrap_err();
        assert!(matches!(err, DocumentError::MissingRequiredField("date")));
    }

    #[test]
    fn test_blank_title() {
        let err = Metadata::parse("---\ntitle: \"  \"\ndate: 2024-01-15\n---\n").unwrap_err();
        assert!(matches!(err, DocumentError::MissingRequiredField("title")));
    }

    #[test]
    fn test_empty_block() {
        let err = Metadata::parse("---\n---\nbody").unwrap_err();
        assert!(matches!(err, DocumentError::MissingRequiredField("title")));
    }

    #[test]
    fn test_body_keeps_horizontal_rules() {
        let content = "---\ntitle: Rules\ndate: 2024-01-15\n---\nabove\n\n---\n\nbelow\n";
        let (_, body) = Metadata::parse(content).unwrap();
        assert_eq!(body, "above\n\n---\n\nbelow\n");
    }

    #[test]
    fn test_extra_keys_preserved() {
        let content = "---\ntitle: A\ndate: 2024-01-15\ntags:\n  - go\n---\n";
        let (meta, _) = Metadata::parse(content).unwrap();
        assert!(meta.extra.contains_key("tags"));
    }

    #[test]
    fn test_date_formats() {
        let utc = |s: &str| parse_date_string(s).map(|d| d.to_rfc3339());
        assert_eq!(
            utc("2024-01-15 10:30:00").as_deref(),
            Some("2024-01-15T10:30:00+00:00")
        );
        assert_eq!(
            utc("2024/01/15").as_deref(),
            Some("2024-01-15T00:00:00+00:00")
        );
        assert_eq!(
            utc("2020-03-05T09:00:00+08:00").as_deref(),
            Some("2020-03-05T09:00:00+08:00")
        );
        assert!(utc("05.03.2020").is_none());
    }
}
