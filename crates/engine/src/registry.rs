//! Resolver registration table.

use tracing::warn;

use crate::{
    config::AmbiguityPolicy,
    definition::{Mapping, mapping_to_json},
    error::ResolveError,
    resolvers::{ResolverDescriptor, ResolverKind},
};

/// Ordered set of active resolver kinds.
///
/// Telltales are tested in registration order and the first match wins. When a
/// mapping carries several telltales, the [`AmbiguityPolicy`] decides whether
/// that is logged or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverRegistry {
    kinds: Vec<ResolverKind>,
    policy: AmbiguityPolicy,
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ResolverRegistry {
    /// All resolver kinds in their default order.
    pub fn standard() -> Self {
        Self::new(ResolverKind::ALL)
    }

    /// Registry with `kinds` in the given order; repeated kinds are ignored.
    pub fn new(kinds: impl IntoIterator<Item = ResolverKind>) -> Self {
        let mut registered: Vec<ResolverKind> = Vec::new();
        for kind in kinds {
            if !registered.contains(&kind) {
                registered.push(kind);
            }
        }
        Self {
            kinds: registered,
            policy: AmbiguityPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn kinds(&self) -> &[ResolverKind] {
        &self.kinds
    }

    pub fn descriptors(&self) -> Vec<ResolverDescriptor> {
        self.kinds.iter().map(|kind| kind.descriptor()).collect()
    }

    /// Find the resolver kind whose telltale appears in `mapping`.
    ///
    /// Returns `Ok(None)` for plain containers.
    ///
    /// # Errors
    /// [`ResolveError::AmbiguousDefinition`] when several telltales match and the
    /// policy is [`AmbiguityPolicy::Error`].
    pub fn match_kind(&self, mapping: &Mapping) -> Result<Option<ResolverKind>, ResolveError> {
        let matching: Vec<ResolverKind> = self
            .kinds
            .iter()
            .copied()
            .filter(|kind| mapping.contains_key(kind.telltale()))
            .collect();

        let Some(first) = matching.first().copied() else {
            return Ok(None);
        };

        if matching.len() > 1 {
            let kinds = matching.iter().map(|kind| kind.name()).collect::<Vec<_>>().join(", ");
            match self.policy {
                AmbiguityPolicy::FirstMatch => {
                    warn!(kinds = %kinds, selected = first.name(), "definition matches several resolver telltales");
                }
                AmbiguityPolicy::Error => {
                    return Err(ResolveError::AmbiguousDefinition {
                        kinds,
                        definition: serde_json::Value::Object(mapping_to_json(mapping)).to_string(),
                    });
                }
            }
        }

        Ok(Some(first))
    }
}
