//! IO capabilities injected into resolvers.
//!
//! Modules:
//! - `fetch`: `reqwest`-backed network fetch capability
//! - `environment`: environment variable readers
//! - `mock`: Recording fetch double for tests and offline runs
//!
//! Resolvers never reach for global state; every external effect goes through
//! the [`IoCapabilities`] bundle handed to the session.

mod environment;
mod fetch;
mod mock;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use environment::{EnvironmentReader, ProcessEnvironment};
pub use fetch::ReqwestFetch;
pub use mock::MockFetch;

use crate::{
    config::HttpConfig,
    document::{GraphQLCompiler, QueryCompiler},
    error::TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A single outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub body: Option<String>,
}

/// Raw HTTP response: status and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    /// Response whose body is the serialized `value`.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The network fetch capability.
#[async_trait]
pub trait NetworkFetch: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// Bundle of environment-provided capabilities shared by one session.
#[derive(Clone)]
pub struct IoCapabilities {
    network_fetch: Arc<dyn NetworkFetch>,
    query_compiler: Arc<dyn QueryCompiler>,
    environment: Arc<dyn EnvironmentReader>,
}

impl fmt::Debug for IoCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoCapabilities").finish_non_exhaustive()
    }
}

impl IoCapabilities {
    /// Capabilities using `network_fetch`, the default GraphQL compiler, and
    /// the process environment.
    pub fn new(network_fetch: Arc<dyn NetworkFetch>) -> Self {
        Self {
            network_fetch,
            query_compiler: Arc::new(GraphQLCompiler),
            environment: Arc::new(ProcessEnvironment),
        }
    }

    /// Capabilities backed by a real HTTP client.
    pub fn from_config(config: &HttpConfig) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(ReqwestFetch::from_config(config)?)))
    }

    pub fn with_query_compiler(mut self, query_compiler: Arc<dyn QueryCompiler>) -> Self {
        self.query_compiler = query_compiler;
        self
    }

    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentReader>) -> Self {
        self.environment = environment;
        self
    }

    pub fn network_fetch(&self) -> &Arc<dyn NetworkFetch> {
        &self.network_fetch
    }

    pub fn query_compiler(&self) -> &dyn QueryCompiler {
        self.query_compiler.as_ref()
    }

    pub fn environment(&self) -> &dyn EnvironmentReader {
        self.environment.as_ref()
    }
}
