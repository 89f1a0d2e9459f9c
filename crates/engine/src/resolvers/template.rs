//! String templates over the context.
//!
//! Templates use the `${{ ... }}` syntax. Each expression is a context key,
//! optionally a dotted path into a value (`${{ user.addresses[0].city }}`).
//! Keys found in the definition's `provide` mapping shadow context keys.

use futures_util::future::try_join_all;
use serde_json::{Map as JsonMap, Value};
use tracing::debug;

use super::expect_string;
use crate::{
    context::Context,
    definition::{Mapping, Resolved, mapping_to_json},
    error::ResolveError,
    values::{select_path, value_as_text},
    visitor::Visitor,
};

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Text(&'a str),
    Expression(&'a str),
}

pub(super) async fn resolve(definition: &Mapping, visitor: &Visitor) -> Result<Resolved, ResolveError> {
    let template = async { expect_string("template", visitor.upward(definition, "template").await?) };
    let provided = async {
        if !definition.contains_key("provide") {
            return Ok(JsonMap::new());
        }
        match visitor.upward(definition, "provide").await? {
            Resolved::Value(Value::Object(provided)) => Ok(provided),
            _ => Err(ResolveError::validation(
                "template",
                &Value::Object(mapping_to_json(definition)),
                "'provide' must resolve to an object of names to values.",
            )),
        }
    };

    let (template, provided) = tokio::try_join!(template, provided)?;
    let rendered = render_template(&template, &provided, visitor.context()).await?;
    Ok(Resolved::Value(Value::String(rendered)))
}

/// Replace every `${{ key }}` in `template` with its value.
///
/// Keys are looked up in `provided` first, then in `context`; all lookups run
/// concurrently. An unclosed `${{` leaves the rest of the template untouched.
///
/// # Errors
/// [`ResolveError::KeyNotFound`] for a key found in neither place.
pub async fn render_template(template: &str, provided: &JsonMap<String, Value>, context: &Context) -> Result<String, ResolveError> {
    let segments = parse_segments(template);
    let lookups = segments.iter().map(|segment| async move {
        match segment {
            Segment::Text(text) => Ok((*text).to_string()),
            Segment::Expression(key) => lookup(key, provided, context).await.map(|value| value_as_text(&value)),
        }
    });
    let parts = try_join_all(lookups).await?;
    debug!(segment_count = parts.len(), "template rendered");
    Ok(parts.concat())
}

async fn lookup(key: &str, provided: &JsonMap<String, Value>, context: &Context) -> Result<Value, ResolveError> {
    let root = key.split(['.', '[']).next().unwrap_or(key);
    if let Some(value) = provided.get(root) {
        let remainder = &key[root.len()..];
        return select_path(value, remainder.strip_prefix('.').unwrap_or(remainder))
            .cloned()
            .ok_or_else(|| ResolveError::key_not_found(key));
    }
    context.get(key).await
}

fn parse_segments(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut remaining = input;

    while let Some(template_start) = remaining.find("${{") {
        let (before, after) = remaining.split_at(template_start);
        if !before.is_empty() {
            segments.push(Segment::Text(before));
        }

        let Some(template_end) = after.find("}}") else {
            // No closing marker: keep the rest verbatim.
            segments.push(Segment::Text(after));
            return segments;
        };
        segments.push(Segment::Expression(after[3..template_end].trim()));
        remaining = &after[template_end + 2..];
    }

    if !remaining.is_empty() {
        segments.push(Segment::Text(remaining));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_segments() {
        assert_eq!(
            parse_segments("Deploy ${{ inputs.app }} to ${{env}}!"),
            vec![
                Segment::Text("Deploy "),
                Segment::Expression("inputs.app"),
                Segment::Text(" to "),
                Segment::Expression("env"),
                Segment::Text("!"),
            ]
        );
        assert_eq!(parse_segments("plain"), vec![Segment::Text("plain")]);
        assert!(parse_segments("").is_empty());
    }

    #[test]
    fn test_parse_segments_malformed() {
        assert_eq!(
            parse_segments("Value: ${{ inputs.name"),
            vec![Segment::Text("Value: "), Segment::Text("${{ inputs.name")]
        );
    }

    #[tokio::test]
    async fn test_render_from_context_and_provided() {
        let context = Context::from_values([
            ("user".to_string(), json!({"name": "Ada", "orders": [{"id": 7}]})),
            ("store".to_string(), json!("context-store")),
        ]);
        let provided = JsonMap::from_iter([("store".to_string(), json!("Venia"))]);

        let rendered = render_template("${{ user.name }} ordered #${{ user.orders[0].id }} at ${{ store }}", &provided, &context)
            .await
            .unwrap();
        assert_eq!(rendered, "Ada ordered #7 at Venia");
    }

    #[tokio::test]
    async fn test_render_unknown_key_fails() {
        let error = render_template("Hi ${{ nobody }}", &JsonMap::new(), &Context::new()).await.unwrap_err();
        assert_eq!(error, ResolveError::key_not_found("nobody"));
    }

    #[tokio::test]
    async fn test_render_malformed_template_is_preserved() {
        let rendered = render_template("Value: ${{ inputs.name", &JsonMap::new(), &Context::new()).await.unwrap();
        assert_eq!(rendered, "Value: ${{ inputs.name");
    }
}
