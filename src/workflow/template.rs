use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

/// Regex pattern for context variables
/// Format: `{{key}}`, `{{nodeId.key}}` or `{{node_label.items.0.name}}`
const TEMPLATE_PATTERN: &str = r"\{\{\s*([^{}]+?)\s*\}\}";

static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(TEMPLATE_PATTERN).expect("template pattern is valid"));

/// Walk a dotted path through `context`. Object segments are keys, numeric
/// segments index into arrays.
pub fn lookup<'a>(
    context: &'a Value,
    path: &str,
) -> Option<&'a Value> {
    path.split('.').try_fold(context, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Text form of a resolved value: strings as-is, numbers in display form,
/// everything else as JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Replace every `{{path}}` in `text` with the value found in `context`.
///
/// Tokens whose path does not resolve are left verbatim.
pub fn resolve(
    text: &str,
    context: &Value,
) -> String {
    resolve_with(text, context, value_to_string)
}

/// Like [`resolve`], but braces inside substituted values are doubled so the
/// result still parses as a `{name}` prompt template.
pub fn resolve_escaped(
    text: &str,
    context: &Value,
) -> String {
    resolve_with(text, context, |value| value_to_string(value).replace('{', "{{").replace('}', "}}"))
}

fn resolve_with(
    text: &str,
    context: &Value,
    render: impl Fn(&Value) -> String,
) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }

    TEMPLATE_RE
        .replace_all(text, |caps: &Captures| match lookup(context, &caps[1]) {
            Some(value) => render(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Resolve template variables in a JSON Value recursively. Strings are
/// resolved, arrays and objects recursed, other primitives returned unchanged.
pub fn resolve_in_value(
    value: &Value,
    context: &Value,
) -> Value {
    match value {
        Value::String(s) => Value::String(resolve(s, context)),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| resolve_in_value(v, context)).collect()),
        Value::Object(obj) => Value::Object(obj.iter().map(|(k, v)| (k.clone(), resolve_in_value(v, context))).collect()),
        _ => value.clone(),
    }
}
