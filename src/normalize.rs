//! Catalog number cleaning and description field extraction.

use crate::error::{MetadataError, Result};
use crate::table::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

/// One-off BWV corrections for known catalog irregularities.
const BWV_OVERRIDES: &[(&str, &str)] = &[("145a", "145-a")];

static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<link>(?P<title>.*?)</link>(?:, <small>(?:BWV )?(?P<bwv1>\d+)[./]?(?P<bwv2>\d+)?.*?</small>)? *(?:\((?P<mode>\S+?)\))?",
    )
    .expect("description pattern compiles")
});

static INTEGER_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.=]").expect("integer split pattern compiles"));

/// Sub-fields of a humdrum index description cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionFields {
    pub title: Option<String>,
    pub bwv1: Option<String>,
    pub bwv2: Option<String>,
    pub mode: Option<String>,
}

impl DescriptionFields {
    /// `bwv1` alone, or `bwv1.bwv2` when the second part exists.
    pub fn bwv(&self) -> Option<String> {
        let first = self.bwv1.as_ref()?;
        Some(match &self.bwv2 {
            Some(second) => format!("{}.{}", first, second),
            None => first.clone(),
        })
    }
}

/// Decode HTML character references while leaving literal tags in place.
pub fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let guarded = text.replace('<', "&lt;").replace('>', "&gt;");
    let fragment = Html::parse_fragment(&guarded);
    fragment.root_element().text().collect()
}

/// Extract title, BWV parts and mode from a description cell.
///
/// Groups that do not match are `None`; a cell that does not match at all
/// yields all-`None` fields.
pub fn parse_description(cell: &str) -> DescriptionFields {
    let decoded = unescape_html(cell);
    let Some(caps) = DESCRIPTION_RE.captures(&decoded) else {
        return DescriptionFields::default();
    };
    let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
    DescriptionFields {
        title: group("title"),
        bwv1: group("bwv1"),
        bwv2: group("bwv2"),
        mode: group("mode"),
    }
}

fn strip_wrapping(text: &str) -> &str {
    text.trim_matches(|c| c == '(' || c == ')' || c == ' ')
}

/// Normalize a BWV identifier.
///
/// Strips wrapping parentheses and spaces, drops leading zeros from the
/// last dot-separated component and applies the fixed override table.
pub fn clean_bwv(bwv: &str) -> Result<String> {
    let stripped = strip_wrapping(bwv);
    let mut parts: Vec<String> = stripped.split('.').map(str::to_string).collect();
    if parts.len() > 1 {
        let last = parts.len() - 1;
        let number: i64 = parts[last]
            .trim()
            .parse()
            .map_err(|_| MetadataError::parse("BWV", bwv))?;
        parts[last] = number.to_string();
    }
    let cleaned = parts.join(".");
    Ok(BWV_OVERRIDES
        .iter()
        .find(|(from, _)| *from == cleaned)
        .map(|(_, to)| to.to_string())
        .unwrap_or(cleaned))
}

/// Reduce `a=b` alternates to the first non-empty one and clean it.
/// An empty cell yields [`Value::Missing`].
pub fn make_bwv_column(values: &[Value]) -> Result<Vec<Value>> {
    values
        .iter()
        .map(|value| {
            let raw = value.to_field();
            let first = strip_wrapping(&raw)
                .split('=')
                .map(str::trim)
                .find(|part| !part.is_empty())
                .map(str::to_string);
            match first {
                Some(part) => Ok(Value::Text(clean_bwv(&part)?)),
                None => Ok(Value::Missing),
            }
        })
        .collect()
}

/// Take the integer before the first `.` or `=` of every cell.
///
/// Integer cells pass through and missing cells stay missing. Anything
/// else that does not start with an integer is a parse error.
pub fn make_integer_column(column: &str, values: &[Value]) -> Result<Vec<Option<i64>>> {
    values
        .iter()
        .map(|value| match value {
            Value::Missing => Ok(None),
            Value::Int(i) => Ok(Some(*i)),
            other => {
                let raw = other.to_field();
                INTEGER_SPLIT_RE
                    .split(&raw)
                    .next()
                    .and_then(|head| head.trim().parse::<i64>().ok())
                    .map(Some)
                    .ok_or_else(|| MetadataError::parse(column, raw.clone()))
            }
        })
        .collect()
}
