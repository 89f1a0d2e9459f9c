//! GraphQL-over-HTTP transport binding.
//!
//! An [`HttpLink`] binds an endpoint, the injected fetch capability, a header
//! set and the GET/POST choice. `execute` performs exactly one network call and
//! decodes the `{data, errors}` envelope; turning protocol errors into failures
//! is left to the caller.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map as JsonMap, Value};
use tracing::debug;
use upward_util::{redact_header_value, truncate_for_summary};

use crate::{
    document::{ExecutableQuery, OperationKind},
    error::TransportError,
    io::{FetchRequest, HttpMethod, NetworkFetch},
};

const MAX_ERROR_BODY_LEN: usize = 200;

/// A GraphQL error as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Decoded response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<GraphQLError>,
}

/// Services may send `"errors": null` alongside successful data.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<GraphQLError>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<GraphQLError>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Construction options for [`HttpLink`].
pub struct HttpLinkOptions {
    pub uri: String,
    pub fetch: Arc<dyn NetworkFetch>,
    pub headers: IndexMap<String, String>,
    pub use_get_for_queries: bool,
}

/// Transport binding for a single GraphQL endpoint.
pub struct HttpLink {
    uri: String,
    fetch: Arc<dyn NetworkFetch>,
    headers: IndexMap<String, String>,
    use_get_for_queries: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
    query: &'a str,
    variables: &'a JsonMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation_name: Option<&'a str>,
}

impl HttpLink {
    pub fn new(options: HttpLinkOptions) -> Self {
        Self {
            uri: options.uri,
            fetch: options.fetch,
            headers: options.headers,
            use_get_for_queries: options.use_get_for_queries,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn uses_get_for_queries(&self) -> bool {
        self.use_get_for_queries
    }

    /// Send `query` with `variables` and decode the response envelope.
    ///
    /// A non-2xx status is still returned as a response when its body carries
    /// GraphQL errors, so those messages reach the caller.
    pub async fn execute(&self, query: &ExecutableQuery, variables: &JsonMap<String, Value>) -> Result<GraphQLResponse, TransportError> {
        let request = self.build_request(query, variables)?;
        debug!(
            method = request.method.as_str(),
            url = %request.url,
            operation = query.operation_name.as_deref().unwrap_or("<anonymous>"),
            headers = ?redacted_headers(&request.headers),
            "executing GraphQL operation"
        );

        let response = self.fetch.fetch(request).await?;
        let decoded = serde_json::from_str::<GraphQLResponse>(&response.body);

        if !response.is_success() {
            return match decoded {
                Ok(envelope) if !envelope.errors.is_empty() => Ok(envelope),
                _ => Err(TransportError::Status {
                    status: response.status,
                    body: truncate_for_summary(&response.body, MAX_ERROR_BODY_LEN),
                }),
            };
        }

        decoded.map_err(|error| TransportError::InvalidResponse {
            url: self.uri.clone(),
            message: error.to_string(),
        })
    }

    fn build_request(&self, query: &ExecutableQuery, variables: &JsonMap<String, Value>) -> Result<FetchRequest, TransportError> {
        let mut headers = IndexMap::new();
        headers.insert("accept".to_string(), "application/json".to_string());

        let use_get = self.use_get_for_queries && query.kind == OperationKind::Query;
        let (method, url, body) = if use_get {
            (HttpMethod::Get, self.get_url(query, variables)?, None)
        } else {
            headers.insert("content-type".to_string(), "application/json".to_string());
            let body = RequestBody {
                query: &query.query,
                variables,
                operation_name: query.operation_name.as_deref(),
            };
            let body = serde_json::to_string(&body).map_err(|error| TransportError::network(error.to_string()))?;
            (HttpMethod::Post, self.uri.clone(), Some(body))
        };

        for (name, value) in &self.headers {
            // Definition headers win over the defaults above, whatever their case.
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }

        Ok(FetchRequest {
            method,
            url,
            headers,
            body,
        })
    }

    fn get_url(&self, query: &ExecutableQuery, variables: &JsonMap<String, Value>) -> Result<String, TransportError> {
        let mut url = url::Url::parse(&self.uri).map_err(|error| TransportError::InvalidUrl {
            url: self.uri.clone(),
            message: error.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &query.query);
            if !variables.is_empty() {
                pairs.append_pair("variables", &Value::Object(variables.clone()).to_string());
            }
            if let Some(operation_name) = &query.operation_name {
                pairs.append_pair("operationName", operation_name);
            }
        }
        Ok(url.into())
    }
}

fn redacted_headers(headers: &IndexMap<String, String>) -> Vec<String> {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, redact_header_value(name, value)))
        .collect()
}
