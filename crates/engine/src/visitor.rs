//! # Definition Visitor
//!
//! The [`Visitor`] walks a definition tree for one resolution session. It owns
//! the session's [`Context`], its [`IoCapabilities`] and the active
//! [`ResolverRegistry`], and is handed explicitly to every resolver.
//!
//! ## Resolution rules
//!
//! - Scalars and compiled documents resolve to themselves.
//! - Lists resolve every element concurrently.
//! - A mapping carrying a registered telltale is handed to that resolver kind.
//! - Any other mapping is a plain container: every field resolves concurrently
//!   and the results are assembled under the same field names.
//!
//! Concurrent batches are fail-fast: the first error aborts the batch and is
//! returned as-is.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, try_join_all};
use serde_json::{Map as JsonMap, Value};
use tracing::{debug, trace};

use crate::{
    context::Context,
    definition::{Definition, Mapping, Resolved},
    error::ResolveError,
    io::IoCapabilities,
    registry::ResolverRegistry,
};

/// Traversal state for a single resolution session.
#[derive(Debug, Clone)]
pub struct Visitor {
    registry: Arc<ResolverRegistry>,
    context: Arc<Context>,
    io: Arc<IoCapabilities>,
}

impl Visitor {
    pub fn new(registry: Arc<ResolverRegistry>, context: Arc<Context>, io: Arc<IoCapabilities>) -> Self {
        Self { registry, context, io }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn io(&self) -> &IoCapabilities {
        &self.io
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Resolve the sub-field `field` of `definition`.
    ///
    /// This is the single entry point resolvers use for their own fields.
    ///
    /// # Errors
    /// [`ResolveError::MissingField`] when the field is absent, otherwise any
    /// error raised while resolving it.
    pub async fn upward(&self, definition: &Mapping, field: &str) -> Result<Resolved, ResolveError> {
        let Some(sub_definition) = definition.get(field) else {
            return Err(ResolveError::missing_field(field));
        };
        trace!(field, "resolving upward");
        self.resolve_node(sub_definition).await
    }

    /// Resolve a single definition node.
    pub fn resolve_node<'a>(&'a self, definition: &'a Definition) -> BoxFuture<'a, Result<Resolved, ResolveError>> {
        async move {
            match definition {
                Definition::Scalar(value) => Ok(Resolved::Value(value.clone())),
                Definition::Document(document) => Ok(Resolved::Document(Arc::clone(document))),
                Definition::List(items) => self.resolve_list(items).await,
                Definition::Mapping(mapping) => match self.registry.match_kind(mapping)? {
                    Some(kind) => {
                        debug!(kind = kind.name(), "dispatching to resolver");
                        kind.resolve(mapping, self).await
                    }
                    None => self.resolve_fields(mapping).await,
                },
            }
        }
        .boxed()
    }

    /// Resolve a whole definition document.
    ///
    /// For a plain root mapping, every top-level field is first registered in
    /// the context as a pending entry under its own name, so fields can look
    /// each other up (for instance as service `variables`). Each field
    /// resolves once no matter how many lookups await it.
    ///
    /// Fields that look each other up in a cycle never complete; callers that
    /// need a bound wrap this call in a deadline.
    pub async fn resolve_document(&self, root: &Definition) -> Result<Value, ResolveError> {
        let Some(mapping) = self.document_fields(root)? else {
            return self.resolve_node(root).await.map(Resolved::into_value);
        };
        self.register_fields(mapping).await?;

        let lookups = mapping.keys().map(|field| async move {
            let value = self.context.get(field).await?;
            Ok::<_, ResolveError>((field.clone(), value))
        });
        match try_join_all(lookups).await {
            Ok(fields) => Ok(Value::Object(fields.into_iter().collect())),
            Err(error) => {
                self.context.discard_pending().await;
                Err(error)
            }
        }
    }

    /// Resolve one top-level field of a document.
    ///
    /// Sibling fields are registered as well but only resolve if `field`
    /// looks them up; afterwards only completed fields stay in the context.
    ///
    /// # Errors
    /// [`ResolveError::MissingField`] when the document has no such field.
    pub async fn resolve_field(&self, root: &Definition, field: &str) -> Result<Value, ResolveError> {
        let Some(mapping) = self.document_fields(root)?.filter(|mapping| mapping.contains_key(field)) else {
            return Err(ResolveError::missing_field(field));
        };
        self.register_fields(mapping).await?;
        let value = self.context.get(field).await;
        // Siblings that were never awaited stay pending forever otherwise.
        self.context.discard_pending().await;
        value
    }

    /// The root mapping when it is a plain container of document fields.
    fn document_fields<'a>(&self, root: &'a Definition) -> Result<Option<&'a Mapping>, ResolveError> {
        match root.as_mapping() {
            Some(mapping) if self.registry.match_kind(mapping)?.is_none() => Ok(Some(mapping)),
            _ => Ok(None),
        }
    }

    async fn register_fields(&self, mapping: &Mapping) -> Result<(), ResolveError> {
        for (field, definition) in mapping {
            let visitor = self.clone();
            let definition = definition.clone();
            let resolution = async move { visitor.resolve_node(&definition).await.map(Resolved::into_value) }.boxed();
            if let Err(error) = self.context.set_pending(field.clone(), resolution).await {
                self.context.discard_pending().await;
                return Err(error);
            }
        }
        debug!(field_count = mapping.len(), "document fields registered");
        Ok(())
    }

    async fn resolve_list(&self, items: &[Definition]) -> Result<Resolved, ResolveError> {
        let resolved = try_join_all(items.iter().map(|item| self.resolve_node(item))).await?;
        Ok(Resolved::Value(Value::Array(resolved.into_iter().map(Resolved::into_value).collect())))
    }

    async fn resolve_fields(&self, mapping: &Mapping) -> Result<Resolved, ResolveError> {
        let fields = mapping.iter().map(|(field, definition)| async move {
            let resolved = self.resolve_node(definition).await?;
            Ok::<_, ResolveError>((field.clone(), resolved.into_value()))
        });
        let resolved: JsonMap<String, Value> = try_join_all(fields).await?.into_iter().collect();
        Ok(Resolved::Value(Value::Object(resolved)))
    }
}
