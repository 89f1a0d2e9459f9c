use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::{
    definition::{Definition, Mapping, Resolved, mapping_to_json, present_field},
    error::ResolveError,
    values::value_as_text,
    visitor::Visitor,
};

struct Branch<'a> {
    matches: &'a str,
    pattern: Regex,
    definition: &'a Mapping,
}

/// Evaluate `when` branches in order against context values.
///
/// ```yaml
/// when:
///   - matches: request.url.pathname
///     pattern: '^/checkout'
///     use: { inline: checkout }
/// default: { inline: home }
/// ```
pub(super) async fn resolve(definition: &Mapping, visitor: &Visitor) -> Result<Resolved, ResolveError> {
    let branches = validate(definition)?;

    for (index, branch) in branches.iter().enumerate() {
        let subject = value_as_text(&visitor.context().get(branch.matches).await?);
        if branch.pattern.is_match(&subject) {
            debug!(branch = index, matches = branch.matches, "conditional branch selected");
            return visitor.upward(branch.definition, "use").await;
        }
    }

    debug!(branch_count = branches.len(), "no conditional branch matched, using default");
    visitor.upward(definition, "default").await
}

fn validate(definition: &Mapping) -> Result<Vec<Branch<'_>>, ResolveError> {
    let die = |message: String| ResolveError::validation("conditional", &Value::Object(mapping_to_json(definition)), message);

    if !definition.contains_key("default") {
        return Err(die("No default specified.".into()));
    }
    let Some(Definition::List(entries)) = present_field(definition, "when") else {
        return Err(die("'when' must be a list of conditions.".into()));
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let Some(mapping) = entry.as_mapping() else {
                return Err(die(format!("Condition {} must be an object.", index)));
            };
            let Some(matches) = mapping.get("matches").and_then(Definition::as_str) else {
                return Err(die(format!("Condition {} needs a 'matches' context key.", index)));
            };
            let Some(pattern) = mapping.get("pattern").and_then(Definition::as_str) else {
                return Err(die(format!("Condition {} needs a 'pattern' string.", index)));
            };
            if !mapping.contains_key("use") {
                return Err(die(format!("Condition {} needs a 'use' definition.", index)));
            }
            let pattern = Regex::new(pattern).map_err(|error| die(format!("Condition {} has an invalid pattern: {}", index, error)))?;
            Ok(Branch {
                matches,
                pattern,
                definition: mapping,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::Context, io::IoCapabilities, io::MockFetch, registry::ResolverRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn visitor() -> Visitor {
        let context = Context::from_values([("request".to_string(), json!({"url": {"pathname": "/checkout/shipping"}, "port": 443}))]);
        let io = IoCapabilities::new(Arc::new(MockFetch::new()));
        Visitor::new(Arc::new(ResolverRegistry::standard()), Arc::new(context), Arc::new(io))
    }

    async fn run(value: Value) -> Result<Resolved, ResolveError> {
        let definition = Definition::from(value);
        resolve(definition.as_mapping().unwrap(), &visitor()).await
    }

    #[tokio::test]
    async fn test_first_matching_branch_wins() {
        let resolved = run(json!({
            "when": [
                {"matches": "request.url.pathname", "pattern": "^/cart", "use": "cart"},
                {"matches": "request.url.pathname", "pattern": "^/checkout", "use": {"inline": "checkout"}},
                {"matches": "request.url.pathname", "pattern": "shipping", "use": "shipping"}
            ],
            "default": "home"
        }))
        .await
        .unwrap();
        assert_eq!(resolved, Resolved::Value(json!("checkout")));
    }

    #[tokio::test]
    async fn test_default_when_nothing_matches() {
        let resolved = run(json!({
            "when": [{"matches": "request.port", "pattern": "^80$", "use": "plain"}],
            "default": "secure"
        }))
        .await
        .unwrap();
        assert_eq!(resolved, Resolved::Value(json!("secure")));
    }

    #[tokio::test]
    async fn test_missing_default_is_validation_error() {
        let error = run(json!({"when": []})).await.unwrap_err();
        assert!(error.to_string().ends_with("No default specified."));
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_validation_error() {
        let error = run(json!({
            "when": [{"matches": "request.port", "pattern": "(", "use": "x"}],
            "default": "y"
        }))
        .await
        .unwrap_err();
        assert!(error.is_validation());
        assert!(error.to_string().contains("Condition 0 has an invalid pattern"));
    }

    #[tokio::test]
    async fn test_unknown_context_key_propagates() {
        let error = run(json!({
            "when": [{"matches": "session.user", "pattern": ".", "use": "x"}],
            "default": "y"
        }))
        .await
        .unwrap_err();
        assert_eq!(error, ResolveError::key_not_found("session.user"));
    }
}
