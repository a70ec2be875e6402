//! Prompt Renderer — fills a static prompt template with validated fields.
//!
//! Placeholders are `{identifier}`. Any other brace is literal text, so templates may
//! quote JSON fragments without escaping. Rendering fails fast on a placeholder that has
//! no matching field instead of leaving a blank in the prompt.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("template references field '{0}' which is absent from the input")]
    MissingField(String),
}

/// Renders `template` against `fields`. Pure: the same inputs always give the same text.
pub fn render(template: &str, fields: &Map<String, Value>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match placeholder_name(after) {
            Some(name) => {
                let value = fields
                    .get(name)
                    .ok_or_else(|| TemplateError::MissingField(name.to_string()))?;
                push_value(&mut out, value);
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    Ok(out)
}

/// Returns the identifier if `text` starts with `identifier}`.
fn placeholder_name(text: &str) -> Option<&str> {
    let end = text.find('}')?;
    let name = &text[..end];
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(name)
    } else {
        None
    }
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}
