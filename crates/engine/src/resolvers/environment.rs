use serde_json::Value;
use tracing::debug;

use super::expect_string;
use crate::{
    definition::{Mapping, Resolved},
    error::ResolveError,
    visitor::Visitor,
};

/// Read the variable named by `env`, falling back to `default` when unset.
pub(super) async fn resolve(definition: &Mapping, visitor: &Visitor) -> Result<Resolved, ResolveError> {
    let name = expect_string("env", visitor.upward(definition, "env").await?)?;

    if let Some(value) = visitor.io().environment().var(&name) {
        // The value itself is never logged.
        debug!(name = %name, "environment variable resolved");
        return Ok(Resolved::Value(Value::String(value)));
    }

    if definition.contains_key("default") {
        debug!(name = %name, "environment variable unset, using default");
        return visitor.upward(definition, "default").await;
    }

    Err(ResolveError::MissingEnvironmentVariable { name })
}
