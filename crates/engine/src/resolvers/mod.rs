//! Resolver kinds and dispatch.
//!
//! Modules:
//! - `inline`: literal values, no nested resolution
//! - `environment`: environment variable lookups
//! - `template`: `${{ key }}` string templates over the context
//! - `conditional`: regex-matched branches over context values
//! - `service`: GraphQL service calls over HTTP
//!
//! The set of kinds is closed; a [`ResolverRegistry`](crate::ResolverRegistry)
//! decides which of them are active and in what order their telltales are tested.

mod conditional;
mod environment;
mod inline;
mod service;
mod template;

use serde::{Deserialize, Serialize};

use crate::{
    definition::{Mapping, Resolved},
    error::ResolveError,
    visitor::Visitor,
};

pub use template::render_template;

/// A resolver strategy, recognized by the presence of its telltale field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolverKind {
    #[serde(rename = "inline")]
    Inline,
    #[serde(rename = "env")]
    Environment,
    #[serde(rename = "template")]
    Template,
    #[serde(rename = "conditional")]
    Conditional,
    #[serde(rename = "service")]
    Service,
}

/// Static metadata describing a resolver kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolverDescriptor {
    pub kind: &'static str,
    pub telltale: &'static str,
}

impl ResolverKind {
    /// Every kind, in default registration order.
    pub const ALL: [ResolverKind; 5] = [
        ResolverKind::Inline,
        ResolverKind::Environment,
        ResolverKind::Template,
        ResolverKind::Conditional,
        ResolverKind::Service,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResolverKind::Inline => "inline",
            ResolverKind::Environment => "env",
            ResolverKind::Template => "template",
            ResolverKind::Conditional => "conditional",
            ResolverKind::Service => "service",
        }
    }

    /// Field whose presence marks a definition as this kind.
    pub fn telltale(self) -> &'static str {
        match self {
            ResolverKind::Inline => "inline",
            ResolverKind::Environment => "env",
            ResolverKind::Template => "template",
            ResolverKind::Conditional => "when",
            ResolverKind::Service => "url",
        }
    }

    pub fn descriptor(self) -> ResolverDescriptor {
        ResolverDescriptor {
            kind: self.name(),
            telltale: self.telltale(),
        }
    }

    /// Resolve `definition`, which carries this kind's telltale.
    ///
    /// Sub-fields are resolved through [`Visitor::upward`]; external effects go
    /// through the visitor's IO capabilities.
    pub async fn resolve(self, definition: &Mapping, visitor: &Visitor) -> Result<Resolved, ResolveError> {
        match self {
            ResolverKind::Inline => inline::resolve(definition),
            ResolverKind::Environment => environment::resolve(definition, visitor).await,
            ResolverKind::Template => template::resolve(definition, visitor).await,
            ResolverKind::Conditional => conditional::resolve(definition, visitor).await,
            ResolverKind::Service => service::resolve(definition, visitor).await,
        }
    }
}

/// Extract a string from a resolved sub-field or report what was found instead.
pub(crate) fn expect_string(field: &str, resolved: Resolved) -> Result<String, ResolveError> {
    match resolved {
        Resolved::Value(serde_json::Value::String(text)) => Ok(text),
        other => Err(ResolveError::UnknownType {
            field: field.to_string(),
            expected: "string",
            found: other.type_name(),
        }),
    }
}
