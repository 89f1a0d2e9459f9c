//! Path lookups into JSON values and their text form.
//!
//! Context keys and template expressions address nested data with paths such
//! as `request.url.pathname`, `cart.items[0].sku` or `cart.items.0.sku`.

use serde_json::Value;

#[derive(Debug, PartialEq)]
enum Step<'a> {
    Field(&'a str),
    Index(usize),
}

/// Split a path into field and index steps.
///
/// Returns `None` for malformed brackets (`a[`, `a[x]`, `a[0]b`).
fn parse_steps(path: &str) -> Option<Vec<Step<'_>>> {
    let mut steps = Vec::new();
    for part in path.split('.').filter(|part| !part.is_empty()) {
        let (field, mut brackets) = part.split_at(part.find('[').unwrap_or(part.len()));
        if !field.is_empty() {
            steps.push(Step::Field(field));
        }
        while !brackets.is_empty() {
            let close = brackets.find(']')?;
            let index = brackets.strip_prefix('[')?[..close - 1].parse().ok()?;
            steps.push(Step::Index(index));
            brackets = &brackets[close + 1..];
        }
    }
    Some(steps)
}

/// Walk `path` into `value`.
///
/// A field step on an array is read as an index, so `items.0` and `items[0]`
/// address the same element. An empty path selects `value` itself.
pub fn select_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    parse_steps(path.trim())?.into_iter().try_fold(value, |current, step| match (step, current) {
        (Step::Field(field), Value::Array(items)) => items.get(field.parse::<usize>().ok()?),
        (Step::Field(field), Value::Object(map)) => map.get(field),
        (Step::Index(index), Value::Array(items)) => items.get(index),
        _ => None,
    })
}

/// The text a value contributes to a template, header or pattern match.
///
/// Strings are used verbatim, `null` is empty, everything else is compact JSON.
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
