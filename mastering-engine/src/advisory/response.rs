//! Oracle response text → Decision

use mastering_common::{Decision, RawDecision};
use serde_json::Value;

use super::AdvisoryError;
use crate::decision::normalize;

/// First JSON object embedded anywhere in `text`
///
/// Surrounding prose and code fences are skipped. Braces inside JSON strings
/// do not count toward nesting.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = matching_brace(bytes, start) {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Some(value);
            }
        }
        search_from = start + 1;
    }
    None
}

/// Index of the brace closing the one at `start`
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract and repair a decision from oracle text
///
/// Any JSON object counts as partial data and is repaired field by field.
/// Text with no object at all is [`AdvisoryError::NoDecision`].
pub fn parse_decision(text: &str) -> Result<Decision, AdvisoryError> {
    let value = extract_json_object(text).ok_or_else(|| {
        let preview: String = text.chars().take(120).collect();
        AdvisoryError::NoDecision(preview)
    })?;

    Ok(normalize(&RawDecision::from_value(value)))
}
