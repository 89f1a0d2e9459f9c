//! # Upward Engine
//!
//! The Upward Engine resolves declarative definition trees into concrete values.
//! Each node of a definition is either a scalar, a plain container, or a
//! mapping recognized by a *telltale* field as belonging to a resolver kind:
//! an inline literal, an environment lookup, a string template, a conditional,
//! or a GraphQL service call.
//!
//! ## Key Features
//!
//! - **Telltale Dispatch**: The first registered resolver kind whose telltale is present handles a node
//! - **Concurrent Resolution**: Sibling fields resolve concurrently with fail-fast semantics
//! - **Session Context**: Append-only store of seeded and pending values, addressable by dotted keys
//! - **GraphQL Services**: Query compilation, variable binding from the context, and HTTP execution
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use upward_engine::{Context, Definition, Engine, IoCapabilities, MockFetch};
//! use serde_json::json;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let fetch = Arc::new(MockFetch::new().with_json(json!({"data": {"ping": "pong"}})));
//! let engine = Engine::new(IoCapabilities::new(fetch));
//!
//! let definition: Definition = serde_yaml::from_str(r#"
//! status:
//!   url: https://shop.example/graphql
//!   query: "{ ping }"
//! "#)?;
//!
//! let resolved = engine.resolve(&definition, Context::new()).await?;
//! assert_eq!(resolved, json!({"status": {"data": {"ping": "pong"}}}));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```
//!
//! ## Architecture
//!
//! - **`definition`**: Definition trees and resolved values
//! - **`context`**: Session-scoped value store
//! - **`io`**: Injected capabilities (network fetch, environment, query compiler)
//! - **`registry`** / **`visitor`**: Telltale matching and recursive resolution
//! - **`resolvers`**: The resolver kinds
//! - **`document`** / **`transport`**: GraphQL compilation and HTTP execution
//! - **`config`**: Engine configuration loading and validation

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context as _, Result};

pub mod config;
pub mod context;
pub mod definition;
pub mod document;
pub mod error;
pub mod io;
pub mod registry;
pub mod resolvers;
pub mod transport;
pub mod values;
pub mod visitor;

// Re-export commonly used types for convenience
pub use config::{AmbiguityPolicy, EngineConfig, load_config, load_config_from_path};
pub use context::Context;
pub use definition::{Definition, Mapping, Resolved};
pub use document::{ExecutableQuery, GraphQLCompiler, OperationKind, QueryCompiler, QueryDocument};
pub use error::{ResolveError, TransportError};
pub use io::{EnvironmentReader, FetchRequest, FetchResponse, HttpMethod, IoCapabilities, MockFetch, NetworkFetch, ReqwestFetch};
pub use registry::ResolverRegistry;
pub use resolvers::{ResolverDescriptor, ResolverKind};
pub use transport::{GraphQLError, GraphQLResponse, HttpLink, HttpLinkOptions};
pub use visitor::Visitor;

/// Entry point tying a resolver registry to a set of IO capabilities.
///
/// An engine is cheap to clone and can start any number of independent
/// sessions; each session gets its own [`Context`].
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<ResolverRegistry>,
    io: Arc<IoCapabilities>,
}

impl Engine {
    /// Engine with every resolver kind registered in default order.
    pub fn new(io: IoCapabilities) -> Self {
        Self {
            registry: Arc::new(ResolverRegistry::standard()),
            io: Arc::new(io),
        }
    }

    /// Engine with a real HTTP client and the configured ambiguity policy.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let io = IoCapabilities::from_config(&config.http)?;
        let registry = ResolverRegistry::standard().with_policy(config.resolution.ambiguous_telltales);
        Ok(Self::new(io).with_registry(registry))
    }

    pub fn with_registry(mut self, registry: ResolverRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Start a session over `context`.
    pub fn visitor(&self, context: Context) -> Visitor {
        Visitor::new(Arc::clone(&self.registry), Arc::new(context), Arc::clone(&self.io))
    }

    /// Resolve a whole definition document in a fresh session.
    pub async fn resolve(&self, definition: &Definition, context: Context) -> Result<serde_json::Value, ResolveError> {
        self.visitor(context).resolve_document(definition).await
    }

    /// Resolve a single top-level field of a definition document.
    pub async fn resolve_field(&self, definition: &Definition, field: &str, context: Context) -> Result<serde_json::Value, ResolveError> {
        self.visitor(context).resolve_field(definition, field).await
    }
}

/// Loads a definition file from the filesystem.
///
/// JSON is a subset of YAML, so both formats are read with the YAML parser.
///
/// # Errors
///
/// This function will return an error if:
/// - The file cannot be read from the filesystem
/// - The file content is not valid YAML or JSON
pub fn parse_definition_file(file_path: impl AsRef<Path>) -> Result<Definition> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).with_context(|| format!("Failed to read definition file: {}", file_path.display()))?;
    let definition = serde_yaml::from_str::<Definition>(&content).with_context(|| format!("Invalid definition file: {}", file_path.display()))?;
    Ok(definition)
}
