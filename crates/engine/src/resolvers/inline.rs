use std::sync::Arc;

use crate::{
    definition::{Definition, Mapping, Resolved},
    error::ResolveError,
};

/// Return the `inline` field verbatim; nested telltales are not interpreted.
pub(super) fn resolve(definition: &Mapping) -> Result<Resolved, ResolveError> {
    match definition.get("inline") {
        Some(Definition::Document(document)) => Ok(Resolved::Document(Arc::clone(document))),
        Some(literal) => Ok(Resolved::Value(literal.to_value())),
        None => Err(ResolveError::missing_field("inline")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::QueryDocument;
    use serde_json::json;

    #[test]
    fn test_inline_returns_literal_without_resolving() {
        let definition = Definition::from(json!({"inline": {"env": "HOME", "url": "https://a"}}));
        let resolved = resolve(definition.as_mapping().unwrap()).unwrap();
        assert_eq!(resolved, Resolved::Value(json!({"env": "HOME", "url": "https://a"})));
    }

    #[test]
    fn test_inline_keeps_compiled_documents() {
        let document = Arc::new(QueryDocument::compile("{ ping }").unwrap());
        let mut mapping = Mapping::new();
        mapping.insert("inline".into(), Definition::Document(Arc::clone(&document)));
        assert_eq!(resolve(&mapping).unwrap(), Resolved::Document(document));
    }
}
