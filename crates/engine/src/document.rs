//! # GraphQL Query Documents
//!
//! A [`QueryDocument`] is the compiled, immutable form of a GraphQL query string.
//! Compilation is delegated to a [`QueryCompiler`] so that callers (and tests)
//! can observe or replace it; the default [`GraphQLCompiler`] parses with
//! `apollo-parser` and records the operations found in the document.
//!
//! Compiled documents are shared behind `Arc` and never mutated, so the same
//! document can back any number of concurrent resolutions.

use std::fmt;

use apollo_parser::{
    Parser,
    cst::{self, CstNode},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ResolveError;

/// Kind of a GraphQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// Operation discovered while compiling a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo {
    /// Operation name, `None` for anonymous and shorthand operations.
    pub name: Option<String>,
    pub kind: OperationKind,
}

/// A compiled GraphQL document.
#[derive(Clone, PartialEq, Eq)]
pub struct QueryDocument {
    source: String,
    operations: Vec<OperationInfo>,
}

impl fmt::Debug for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDocument")
            .field("operations", &self.operations)
            .field("source_len", &self.source.len())
            .finish()
    }
}

/// Query text and operation metadata ready to be sent over a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableQuery {
    pub query: String,
    pub operation_name: Option<String>,
    pub kind: OperationKind,
}

impl QueryDocument {
    /// Compile `source` with the default [`GraphQLCompiler`].
    pub fn compile(source: &str) -> Result<Self, ResolveError> {
        GraphQLCompiler.compile(source)
    }

    /// Original query text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn operations(&self) -> &[OperationInfo] {
        &self.operations
    }

    /// Produce the executable form of the first operation in the document.
    pub fn render(&self) -> ExecutableQuery {
        let first = self.operations.first();
        ExecutableQuery {
            query: self.source.clone(),
            operation_name: first.and_then(|operation| operation.name.clone()),
            kind: first.map(|operation| operation.kind).unwrap_or(OperationKind::Query),
        }
    }
}

/// Turns raw query strings into [`QueryDocument`]s.
///
/// Implementations must be side-effect free: compiling the same string twice
/// yields equal documents.
pub trait QueryCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<QueryDocument, ResolveError>;
}

/// Default compiler backed by `apollo-parser`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphQLCompiler;

impl QueryCompiler for GraphQLCompiler {
    fn compile(&self, source: &str) -> Result<QueryDocument, ResolveError> {
        let tree = Parser::new(source).parse();

        let errors: Vec<String> = tree.errors().map(|error| error.message().to_string()).collect();
        if !errors.is_empty() {
            return Err(ResolveError::compile(errors.join(", ")));
        }

        let operations: Vec<OperationInfo> = tree
            .document()
            .definitions()
            .filter_map(|definition| match definition {
                cst::Definition::OperationDefinition(operation) => Some(operation_info(&operation)),
                _ => None,
            })
            .collect();

        if operations.is_empty() {
            return Err(ResolveError::compile("document contains no operations"));
        }

        debug!(operation_count = operations.len(), "compiled GraphQL document");
        Ok(QueryDocument {
            source: source.to_string(),
            operations,
        })
    }
}

fn operation_info(operation: &cst::OperationDefinition) -> OperationInfo {
    let name = operation
        .name()
        .map(|name| name.syntax().text().to_string().trim().to_string())
        .filter(|name| !name.is_empty());

    let kind = match operation.operation_type() {
        Some(operation_type) if operation_type.mutation_token().is_some() => OperationKind::Mutation,
        Some(operation_type) if operation_type.subscription_token().is_some() => OperationKind::Subscription,
        _ => OperationKind::Query,
    };

    OperationInfo { name, kind }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_shorthand_query() {
        let document = QueryDocument::compile("{ ping }").expect("compile shorthand");
        assert_eq!(document.operations().len(), 1);
        let executable = document.render();
        assert_eq!(executable.query, "{ ping }");
        assert_eq!(executable.operation_name, None);
        assert_eq!(executable.kind, OperationKind::Query);
    }

    #[test]
    fn test_compile_named_mutation() {
        let document = QueryDocument::compile("mutation AddItem($sku: String!) { addItem(sku: $sku) { id } }").expect("compile mutation");
        let executable = document.render();
        assert_eq!(executable.operation_name.as_deref(), Some("AddItem"));
        assert_eq!(executable.kind, OperationKind::Mutation);
    }

    #[test]
    fn test_compile_rejects_syntax_errors() {
        let error = QueryDocument::compile("query { unclosed").unwrap_err();
        assert!(matches!(error, ResolveError::Compile { .. }));
    }

    #[test]
    fn test_compile_rejects_fragment_only_document() {
        let error = QueryDocument::compile("fragment F on User { id }").unwrap_err();
        assert_eq!(error, ResolveError::compile("document contains no operations"));
    }

    #[test]
    fn test_compile_is_idempotent() {
        let first = GraphQLCompiler.compile("query Q { a }").unwrap();
        let second = GraphQLCompiler.compile("query Q { a }").unwrap();
        assert_eq!(first, second);
    }
}
