//! Field coercion and CSV escaping.
//!
//! Clients sometimes post DOM-ish objects instead of strings; everything is
//! reduced to one line of text before it reaches the log.

use serde_json::Value;

/// Members consulted, in order, when an object is posted instead of text.
const TEXT_MEMBERS: [&str; 4] = ["textContent", "innerText", "text", "title"];

pub const ELLIPSIS: &str = "...";

/// Reduce a posted JSON value to text.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.is_empty() => String::new(),
        Value::Object(map) => {
            let preferred = TEXT_MEMBERS.iter().find_map(|key| match map.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
                _ => None,
            });
            match preferred {
                Some(text) => text,
                None if map.is_empty() => String::new(),
                None => value.to_string(),
            }
        }
        Value::Array(_) => value.to_string(),
    }
}

/// Keep at most `max` characters, marking a cut with [`ELLIPSIS`].
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
    }
}

/// Collapse line breaks to spaces and double embedded quotes.
pub fn csv_escape(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace('\n', " ")
        .replace('"', "\"\"")
}

/// One log line, already coerced and capped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageViewRow {
    pub click_time: String,
    pub page_url: String,
    pub h1_text: String,
    pub page_title: String,
}

impl PageViewRow {
    pub fn from_values(
        click_time: &Value,
        page_url: &Value,
        h1_text: Option<&Value>,
        page_title: Option<&Value>,
        field_limit: usize,
    ) -> Self {
        let field = |v: Option<&Value>| truncate(&v.map(value_to_text).unwrap_or_default(), field_limit);
        Self {
            click_time: field(Some(click_time)),
            page_url: field(Some(page_url)),
            h1_text: field(h1_text),
            page_title: field(page_title),
        }
    }

    /// `"clickTime","pageUrl","h1Text","pageTitle"` plus newline.
    pub fn to_csv_line(&self) -> String {
        format!(
            "\"{}\",\"{}\",\"{}\",\"{}\"\n",
            csv_escape(&self.click_time),
            csv_escape(&self.page_url),
            csv_escape(&self.h1_text),
            csv_escape(&self.page_title),
        )
    }
}
