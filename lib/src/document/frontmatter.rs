use std::collections::BTreeMap;

use serde_yaml_ng::{Mapping, Value};

use crate::error::{Chainable, Result};

const FENCE: &str = "---";

/// The metadata block at the top of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub title: String,
    pub subtitle: Option<String>,
    pub layout: String,
    /// The date as written; [`crate::schedule`] interprets it.
    pub date: String,
    pub timezone: Option<String>,
    pub background: Option<String>,
    /// Every key this crate doesn't interpret, kept as written.
    pub extra: BTreeMap<String, Value>,
}

/// Splits `input` into its front matter block and the remaining body.
///
/// The block is everything between a leading `---` line and the next `---`
/// line. A leading byte-order mark and `\r\n` line endings are tolerated.
///
/// ```rust
/// use quire::document::split;
///
/// let (front, body) = split("---\ntitle: Hi\n---\n<p>Hello</p>\n").unwrap();
/// assert_eq!(front, "title: Hi\n");
/// assert_eq!(body, "<p>Hello</p>\n");
///
/// assert!(split("---\ntitle: Hi\n<p>Hello</p>\n").is_err());
/// ```
pub fn split(input: &str) -> Result<(&str, &str)> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lines = input.split_inclusive('\n');
    let opening = lines.next().unwrap_or_default();
    if opening.trim_end() != FENCE {
        return Err(fault!(MalformedFrontMatter,
            "document must begin with a `---` front matter delimiter"));
    }

    let start = opening.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == FENCE {
            return Ok((&input[start..offset], &input[offset + line.len()..]));
        }

        offset += line.len();
    }

    Err(fault!(MalformedFrontMatter, "front matter is missing its closing `---` delimiter"))
}

impl FrontMatter {
    pub const TITLE: &'static str = "title";
    pub const SUBTITLE: &'static str = "subtitle";
    pub const LAYOUT: &'static str = "layout";
    pub const DATE: &'static str = "date";
    pub const TIMEZONE: &'static str = "timezone";
    pub const BACKGROUND: &'static str = "background";

    /// Parses a front matter block (without its delimiters).
    ///
    /// Fails with `MalformedFrontMatter` if the block isn't a mapping, if a
    /// recognized key holds a list or mapping, or if `title`, `layout`, or
    /// `date` is missing or blank.
    pub fn parse(block: &str) -> Result<FrontMatter> {
        let value: Value = if block.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml_ng::from_str(block)
                .chain(fault!(MalformedFrontMatter, "front matter is not a valid `key: value` block"))?
        };

        let map = match value {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            other => return Err(fault! {
                MalformedFrontMatter, "front matter must be a list of `key: value` pairs",
                "found" => kind(&other),
            }),
        };

        let mut title = None;
        let mut subtitle = None;
        let mut layout = None;
        let mut date = None;
        let mut timezone = None;
        let mut background = None;
        let mut extra = BTreeMap::new();
        for (key, value) in map {
            let key = match key {
                Value::String(key) => key,
                other => return Err(fault! {
                    MalformedFrontMatter, "front matter keys must be strings",
                    "found" => kind(&other),
                }),
            };

            let slot = match key.as_str() {
                Self::TITLE => &mut title,
                Self::SUBTITLE => &mut subtitle,
                Self::LAYOUT => &mut layout,
                Self::DATE => &mut date,
                Self::TIMEZONE => &mut timezone,
                Self::BACKGROUND => &mut background,
                _ => {
                    extra.insert(key, value);
                    continue;
                }
            };

            *slot = scalar(&key, value)?;
        }

        let missing: Vec<&str> = [(Self::TITLE, &title), (Self::LAYOUT, &layout), (Self::DATE, &date)]
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| key)
            .collect();

        match (title, layout, date) {
            (Some(title), Some(layout), Some(date)) => Ok(FrontMatter {
                title,
                subtitle,
                layout,
                date,
                timezone,
                background,
                extra,
            }),
            _ => Err(fault! {
                MalformedFrontMatter, "front matter is missing required keys",
                "missing" => missing.join(", "),
            }),
        }
    }

    /// The value of an unrecognized key, if it holds a single value.
    ///
    /// ```rust
    /// use quire::document::FrontMatter;
    ///
    /// let front = FrontMatter::parse("title: A\nlayout: post\ndate: 2024-01-01\nauthor: Ada\n").unwrap();
    /// assert_eq!(front.extra_scalar("author").as_deref(), Some("Ada"));
    /// assert_eq!(front.extra_scalar("title"), None);
    /// ```
    pub fn extra_scalar(&self, key: &str) -> Option<String> {
        match self.extra.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Converts a recognized key's value into a string. Blank values and `null`
/// count as absent.
fn scalar(key: &str, value: Value) -> Result<Option<String>> {
    let string = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => return Err(fault! {
            MalformedFrontMatter, "front matter key must hold a single value",
            "key" => key,
            "found" => kind(&other),
        }),
    };

    let trimmed = string.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else if trimmed.len() == string.len() {
        Ok(Some(string))
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const COMPLETE: &str = "\
layout: post
title: \"Tell don't ask\"
subtitle: Objects, not questions
date: 2024-03-30
timezone: Europe/Madrid
background: /img/tell.jpg
comments: true
tags: [design, oop]
";

    #[test]
    fn parses_every_recognized_key() {
        let front = FrontMatter::parse(COMPLETE).unwrap();
        assert_eq!(front.layout, "post");
        assert_eq!(front.title, "Tell don't ask");
        assert_eq!(front.subtitle.as_deref(), Some("Objects, not questions"));
        assert_eq!(front.date, "2024-03-30");
        assert_eq!(front.timezone.as_deref(), Some("Europe/Madrid"));
        assert_eq!(front.background.as_deref(), Some("/img/tell.jpg"));
    }

    #[test]
    fn keeps_unrecognized_keys() {
        let front = FrontMatter::parse(COMPLETE).unwrap();
        assert_eq!(front.extra.len(), 2);
        assert_eq!(front.extra_scalar("comments").as_deref(), Some("true"));
        assert!(matches!(front.extra.get("tags"), Some(Value::Sequence(tags)) if tags.len() == 2));
        assert_eq!(front.extra_scalar("tags"), None);
    }

    #[test]
    fn missing_required_keys() {
        for key in ["title", "layout", "date"] {
            let block: String = COMPLETE.lines()
                .filter(|line| !line.starts_with(key))
                .map(|line| format!("{line}\n"))
                .collect();

            let error = FrontMatter::parse(&block).unwrap_err();
            assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter), "{key}");
            assert!(error.to_string().contains(key));
        }

        let error = FrontMatter::parse("").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter));
    }

    #[test]
    fn blank_required_key_is_missing() {
        let error = FrontMatter::parse("title: \"  \"\nlayout: post\ndate: 2024-01-01\n").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter));
        assert!(error.to_string().contains("title"));
    }

    #[test]
    fn non_scalar_recognized_key() {
        let error = FrontMatter::parse("title: [a, b]\nlayout: post\ndate: 2024-01-01\n").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter));
    }

    #[test]
    fn not_a_mapping() {
        let error = FrontMatter::parse("- title\n- layout\n").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter));

        let error = FrontMatter::parse("title: [unclosed\n").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter));
    }

    #[test]
    fn numeric_title() {
        let front = FrontMatter::parse("title: 1984\nlayout: post\ndate: 2024-01-01\n").unwrap();
        assert_eq!(front.title, "1984");
    }

    #[test]
    fn split_tolerates_bom_and_crlf() {
        let input = "\u{feff}---\r\ntitle: Hi\r\n---\r\nbody\r\n";
        let (front, body) = split(input).unwrap();
        assert_eq!(front, "title: Hi\r\n");
        assert_eq!(body, "body\r\n");
    }

    #[test]
    fn split_uses_first_closing_fence() {
        let (front, body) = split("---\na: 1\n---\nbody\n---\nmore\n").unwrap();
        assert_eq!(front, "a: 1\n");
        assert_eq!(body, "body\n---\nmore\n");
    }

    #[test]
    fn split_failures() {
        let error = split("<p>no front matter</p>").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter));

        let error = split("---\ntitle: Hi\n").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter));

        let error = split("---").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter));
    }
}
