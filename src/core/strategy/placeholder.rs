//! `<+matrix.*>`, `<+strategy.*>` and `<+repeat.*>` substitution for expanded documents.

use planweave_types::{IterationMetadata, StrategyMetadata};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Placeholder appended to identifiers of nodes wrapped by a strategy.
pub const IDENTIFIER_POSTFIX_PLACEHOLDER: &str = "<+strategy.identifierPostFix>";

fn placeholder_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<\+(matrix|strategy|repeat)\.([A-Za-z0-9_]+)>").expect("valid placeholder regex")
    })
}

/// Text form used when a value is spliced into a larger string or compared.
pub fn canonical_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn lookup(namespace: &str, key: &str, metadata: &StrategyMetadata) -> Option<Value> {
    match (namespace, key) {
        ("strategy", "iteration") => Some(Value::from(metadata.current_iteration)),
        ("strategy", "iterations") => Some(Value::from(metadata.total_iterations)),
        ("strategy", "identifierPostFix") => {
            Some(Value::String(metadata.identifier_postfix.clone()))
        }
        ("matrix", axis) => metadata.axis_values().and_then(|axes| axes.get(axis).cloned()),
        ("repeat", "item") => match &metadata.iteration {
            IterationMetadata::Repeat { item } => Some(item.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Render one string. A string that is exactly one known placeholder keeps the raw value type.
pub fn render_text(text: &str, metadata: &StrategyMetadata) -> Value {
    let regex = placeholder_regex();
    if let Some(captures) = regex.captures(text) {
        let whole = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
        if whole.len() == text.len() {
            if let Some(value) = lookup(&captures[1], &captures[2], metadata) {
                return value;
            }
        }
    } else {
        return Value::String(text.to_string());
    }

    let rendered = regex.replace_all(text, |captures: &regex::Captures<'_>| {
        match lookup(&captures[1], &captures[2], metadata) {
            Some(value) => canonical_text(&value),
            None => captures[0].to_string(),
        }
    });
    Value::String(rendered.into_owned())
}

/// Substitute placeholders in every string inside `value`. Unknown placeholders stay intact.
pub fn render_value(value: &mut Value, metadata: &StrategyMetadata) {
    match value {
        Value::String(text) => {
            *value = render_text(text, metadata);
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                render_value(item, metadata);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                render_value(item, metadata);
            }
        }
        _ => {}
    }
}

/// Every `(namespace, key)` placeholder referenced anywhere in `value`.
pub fn collect_placeholders(value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::String(text) => {
            for captures in placeholder_regex().captures_iter(text) {
                out.push((captures[1].to_string(), captures[2].to_string()));
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_placeholders(item, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_placeholders(item, out);
            }
        }
        _ => {}
    }
}
