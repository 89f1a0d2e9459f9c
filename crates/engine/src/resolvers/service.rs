//! GraphQL service calls.
//!
//! ```yaml
//! url: https://shop.example/graphql      # required
//! query: 'query Cart($id: String!) { cart(cart_id: $id) { total } }'  # required
//! method: GET                            # optional, default POST
//! headers: { store: default }            # optional
//! variables: { id: session.cartId }      # optional, values are context keys
//! ```
//!
//! The definition is validated before anything is resolved. `url`, `query`,
//! `method` and `headers` then resolve through the visitor while `variables`
//! are read straight from the context, all concurrently. Exactly one request
//! is sent; a response carrying GraphQL errors fails with the first message.

use std::sync::Arc;

use futures_util::future::try_join_all;
use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value, json};
use tracing::debug;
use upward_util::redact_header_value;

use super::expect_string;
use crate::{
    context::Context,
    definition::{Definition, Mapping, Resolved, mapping_to_json, present_field},
    document::QueryDocument,
    error::ResolveError,
    transport::{HttpLink, HttpLinkOptions},
    values::value_as_text,
    visitor::Visitor,
};

const DEFAULT_METHOD: &str = "POST";

pub(super) async fn resolve(definition: &Mapping, visitor: &Visitor) -> Result<Resolved, ResolveError> {
    let variable_keys = validate(definition)?;
    debug!(variable_count = variable_keys.len(), "validated service definition");

    let url = async { expect_string("url", visitor.upward(definition, "url").await?) };
    let query = visitor.upward(definition, "query");
    let method = async {
        if present_field(definition, "method").is_none() {
            return Ok(DEFAULT_METHOD.to_string());
        }
        expect_string("method", visitor.upward(definition, "method").await?)
    };
    let headers = async {
        if present_field(definition, "headers").is_none() {
            return Ok(IndexMap::new());
        }
        into_headers(visitor.upward(definition, "headers").await?)
    };
    let variables = resolve_variables(&variable_keys, visitor.context());

    let (url, query, method, headers, variables) = tokio::try_join!(url, query, method, headers, variables)?;
    let logged_headers: Vec<String> = headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, redact_header_value(name, value)))
        .collect();
    debug!(url = %url, method = %method, headers = ?logged_headers, "service fields resolved, creating link");

    let link = HttpLink::new(HttpLinkOptions {
        uri: url,
        fetch: Arc::clone(visitor.io().network_fetch()),
        headers,
        use_get_for_queries: method == "GET",
    });

    let document = match query {
        Resolved::Value(Value::String(source)) => Arc::new(visitor.io().query_compiler().compile(&source)?),
        Resolved::Document(document) => document,
        other => {
            return Err(ResolveError::UnknownType {
                field: "query".into(),
                expected: "string or compiled document",
                found: other.type_name(),
            });
        }
    };

    execute(&link, &document, &variables).await
}

/// Check the definition's shape and return the variable bindings as
/// `(variable name, context key)` pairs.
fn validate(definition: &Mapping) -> Result<Vec<(String, String)>, ResolveError> {
    let die = |message: &str| ResolveError::validation("service", &Value::Object(mapping_to_json(definition)), message);

    if present_field(definition, "url").is_none() {
        return Err(die("No URL specified."));
    }
    if present_field(definition, "query").is_none() {
        return Err(die("No GraphQL query document specified."));
    }

    let Some(variables) = present_field(definition, "variables") else {
        return Ok(Vec::new());
    };
    let Definition::Mapping(variables) = variables else {
        return Err(die("Variables must be a simple object of keys to context lookups."));
    };
    variables
        .iter()
        .map(|(name, lookup)| match lookup.as_str() {
            Some(key) => Ok((name.clone(), key.to_string())),
            None => Err(die("Variables must be a simple object of keys to context lookups.")),
        })
        .collect()
}

async fn resolve_variables(bindings: &[(String, String)], context: &Context) -> Result<JsonMap<String, Value>, ResolveError> {
    let lookups = bindings.iter().map(|(name, key)| async move {
        let value = context.get(key).await?;
        Ok::<_, ResolveError>((name.clone(), value))
    });
    Ok(try_join_all(lookups).await?.into_iter().collect())
}

fn into_headers(resolved: Resolved) -> Result<IndexMap<String, String>, ResolveError> {
    match resolved {
        Resolved::Value(Value::Object(headers)) => Ok(headers.iter().map(|(name, value)| (name.clone(), value_as_text(value))).collect()),
        other => Err(ResolveError::UnknownType {
            field: "headers".into(),
            expected: "object",
            found: other.type_name(),
        }),
    }
}

async fn execute(link: &HttpLink, document: &QueryDocument, variables: &JsonMap<String, Value>) -> Result<Resolved, ResolveError> {
    debug!(uri = link.uri(), variable_count = variables.len(), "running query");
    let response = link.execute(&document.render(), variables).await?;

    if let Some(first) = response.errors.first() {
        let discarded = response.errors.len() - 1;
        debug!(discarded, errors = ?response.errors, "service responded with GraphQL errors");
        return Err(ResolveError::Protocol {
            message: first.message.clone(),
            discarded,
        });
    }

    Ok(Resolved::Value(json!({ "data": response.data })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(value: Value) -> Mapping {
        Definition::from(value).as_mapping().cloned().unwrap()
    }

    #[test]
    fn test_validate_collects_variable_bindings() {
        let bindings = validate(&mapping(json!({
            "url": "https://a",
            "query": "{ ping }",
            "variables": {"id": "ctx.userId", "store": "env.store"}
        })))
        .unwrap();
        assert_eq!(
            bindings,
            vec![("id".to_string(), "ctx.userId".to_string()), ("store".to_string(), "env.store".to_string())]
        );
    }

    #[test]
    fn test_validate_treats_empty_url_as_missing() {
        let error = validate(&mapping(json!({"url": "", "query": "{ ping }"}))).unwrap_err();
        assert!(error.to_string().ends_with("No URL specified."));
    }

    #[test]
    fn test_validate_rejects_list_variables() {
        let error = validate(&mapping(json!({"url": "https://a", "query": "{ ping }", "variables": ["id"]}))).unwrap_err();
        assert!(error.to_string().ends_with("Variables must be a simple object of keys to context lookups."));
    }

    #[test]
    fn test_into_headers_stringifies_values() {
        let headers = into_headers(Resolved::Value(json!({"x-count": 2, "store": "default"}))).unwrap();
        assert_eq!(headers["x-count"], "2");
        assert_eq!(headers["store"], "default");
        assert!(into_headers(Resolved::Value(json!("nope"))).is_err());
    }
}
