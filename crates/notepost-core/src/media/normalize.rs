//! Loosely structured media input.

use serde::Deserialize;
use serde_json::Value;

/// Media input as a caller supplies it.
///
/// Deserializes from any JSON value: `null`, a string, or an array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub enum MediaInput {
    #[default]
    Absent,
    /// Single path, comma-separated list, JSON array, or bracketed list.
    Text(String),
    List(Vec<String>),
}

impl From<&str> for MediaInput {
    fn from(s: &str) -> Self {
        MediaInput::Text(s.to_string())
    }
}

impl From<String> for MediaInput {
    fn from(s: String) -> Self {
        MediaInput::Text(s)
    }
}

impl From<Vec<String>> for MediaInput {
    fn from(v: Vec<String>) -> Self {
        MediaInput::List(v)
    }
}

impl From<Vec<&str>> for MediaInput {
    fn from(v: Vec<&str>) -> Self {
        MediaInput::List(v.into_iter().map(str::to_string).collect())
    }
}

impl<T: Into<MediaInput>> From<Option<T>> for MediaInput {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(MediaInput::Absent)
    }
}

impl From<Value> for MediaInput {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => MediaInput::Absent,
            Value::String(s) => MediaInput::Text(s),
            Value::Array(items) => MediaInput::List(coerce_items(items)),
            other => MediaInput::Text(other.to_string()),
        }
    }
}

/// Stringify array elements; nulls are skipped.
fn coerce_items(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .collect()
}

fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

fn split_commas(s: &str) -> Vec<String> {
    s.split(',')
        .map(strip_quotes)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl MediaInput {
    /// Ordered, non-empty tokens.
    ///
    /// A bracketed string is parsed as JSON first and, if that fails, has its
    /// brackets stripped and is split on commas. Other strings are split on
    /// commas if they contain one and otherwise form a single token.
    pub fn normalize(&self) -> Vec<String> {
        match self {
            MediaInput::Absent => Vec::new(),
            MediaInput::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            MediaInput::Text(text) => normalize_text(text),
        }
    }
}

fn normalize_text(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if text.starts_with('[') && text.ends_with(']') {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => {
                return MediaInput::List(coerce_items(items)).normalize();
            }
            _ => {
                let inner = text[1..text.len() - 1].trim();
                if !inner.is_empty() {
                    return split_commas(inner);
                }
            }
        }
    }

    if text.contains(',') {
        return split_commas(text);
    }

    let token = strip_quotes(text);
    if token.is_empty() {
        Vec::new()
    } else {
        vec![token.to_string()]
    }
}
