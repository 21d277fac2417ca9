//! Typed extraction of JSON objects from free-form model output

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*```[A-Za-z]*\s*$").expect("fence regex should compile"));

/// Result of parsing model text into a typed shape
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Parsed(T),
    /// The provider returned nothing but whitespace
    Empty,
    /// No balanced `{...}` object anywhere in the text
    NoJson,
    /// An object was found but did not match the expected shape
    Invalid(String),
}

impl<T> ParseOutcome<T> {
    /// Short label for logs
    pub fn describe(&self) -> String {
        match self {
            ParseOutcome::Parsed(_) => "parsed".to_string(),
            ParseOutcome::Empty => "empty response".to_string(),
            ParseOutcome::NoJson => "no JSON object in response".to_string(),
            ParseOutcome::Invalid(e) => format!("schema mismatch: {}", e),
        }
    }
}

/// Parse the first JSON object in `text` into `T`.
///
/// The whole (fence-stripped) text is tried first so providers with native
/// JSON mode take the fast path; otherwise the first balanced object wins.
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> ParseOutcome<T> {
    if text.trim().is_empty() {
        return ParseOutcome::Empty;
    }
    let cleaned = strip_code_fences(text);
    if let Ok(v) = serde_json::from_str::<T>(cleaned.trim()) {
        return ParseOutcome::Parsed(v);
    }
    match extract_json_object(&cleaned) {
        Some(obj) => match serde_json::from_str::<T>(obj) {
            Ok(v) => ParseOutcome::Parsed(v),
            Err(e) => ParseOutcome::Invalid(e.to_string()),
        },
        None => ParseOutcome::NoJson,
    }
}

pub fn strip_code_fences(text: &str) -> String {
    FENCE_RE.replace_all(text, "").to_string()
}

/// First balanced top-level `{...}` substring, string- and escape-aware
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut depth: u32 = 0;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0
                        && let Some(s) = start.take()
                    {
                        return Some(&text[s..idx + 1]);
                    }
                }
            }
            _ => {}
        }
    }

    None
}
