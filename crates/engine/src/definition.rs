//! Definition trees and resolved values.
//!
//! A [`Definition`] is the author-supplied, untyped tree read from YAML or JSON.
//! Mappings keep their field order so that resolution results and error echoes
//! match what the author wrote.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::{Map as JsonMap, Value};

use crate::document::QueryDocument;

/// Field-name to sub-definition mapping.
pub type Mapping = IndexMap<String, Definition>;

/// A node in the definition tree awaiting resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    /// String, number, bool or null. Resolves to itself.
    Scalar(Value),
    /// Elements are resolved independently.
    List(Vec<Definition>),
    /// Either a resolver-kind node (recognized by telltale) or a plain container.
    Mapping(Mapping),
    /// A query document compiled ahead of time.
    Document(Arc<QueryDocument>),
}

impl Definition {
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Definition::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Definition::Scalar(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    /// Mirrors the loose "is this field set" check configuration authors expect:
    /// null, false, zero and the empty string all count as unset.
    pub fn is_falsy(&self) -> bool {
        match self {
            Definition::Scalar(Value::Null) | Definition::Scalar(Value::Bool(false)) => true,
            Definition::Scalar(Value::String(text)) => text.is_empty(),
            Definition::Scalar(Value::Number(number)) => number.as_f64() == Some(0.0),
            _ => false,
        }
    }

    /// JSON rendition used for error echoes and inline literals.
    pub fn to_value(&self) -> Value {
        match self {
            Definition::Scalar(value) => value.clone(),
            Definition::List(items) => Value::Array(items.iter().map(Definition::to_value).collect()),
            Definition::Mapping(mapping) => Value::Object(mapping_to_json(mapping)),
            Definition::Document(document) => Value::String(document.source().to_string()),
        }
    }
}

/// Serialize a mapping for diagnostics.
pub fn mapping_to_json(mapping: &Mapping) -> JsonMap<String, Value> {
    mapping.iter().map(|(key, value)| (key.clone(), value.to_value())).collect()
}

/// Returns the field when it is present and not falsy.
pub fn present_field<'a>(mapping: &'a Mapping, field: &str) -> Option<&'a Definition> {
    mapping.get(field).filter(|definition| !definition.is_falsy())
}

impl From<Value> for Definition {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Definition::List(items.into_iter().map(Definition::from).collect()),
            Value::Object(map) => Definition::Mapping(map.into_iter().map(|(key, value)| (key, Definition::from(value))).collect()),
            scalar => Definition::Scalar(scalar),
        }
    }
}

impl From<QueryDocument> for Definition {
    fn from(document: QueryDocument) -> Self {
        Definition::Document(Arc::new(document))
    }
}

impl From<Arc<QueryDocument>> for Definition {
    fn from(document: Arc<QueryDocument>) -> Self {
        Definition::Document(document)
    }
}

impl From<&str> for Definition {
    fn from(text: &str) -> Self {
        Definition::Scalar(Value::String(text.to_string()))
    }
}

impl From<Mapping> for Definition {
    fn from(mapping: Mapping) -> Self {
        Definition::Mapping(mapping)
    }
}

impl<'de> Deserialize<'de> for Definition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Definition::from)
    }
}

/// The outcome of resolving a definition node.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    Document(Arc<QueryDocument>),
}

impl Resolved {
    /// Convert into plain JSON; documents become their query source.
    pub fn into_value(self) -> Value {
        match self {
            Resolved::Value(value) => value,
            Resolved::Document(document) => Value::String(document.source().to_string()),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Resolved::Value(value) => Some(value),
            Resolved::Document(_) => None,
        }
    }

    /// Short type label used in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Resolved::Document(_) => "document",
            Resolved::Value(Value::Null) => "null",
            Resolved::Value(Value::Bool(_)) => "boolean",
            Resolved::Value(Value::Number(_)) => "number",
            Resolved::Value(Value::String(_)) => "string",
            Resolved::Value(Value::Array(_)) => "array",
            Resolved::Value(Value::Object(_)) => "object",
        }
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Resolved::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_preserves_field_order() {
        let definition = Definition::from(json!({"zeta": 1, "alpha": {"inline": true}, "mid": [1, "two"]}));
        let mapping = definition.as_mapping().expect("mapping");
        let keys: Vec<&str> = mapping.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert!(matches!(mapping["mid"], Definition::List(ref items) if items.len() == 2));
    }

    #[test]
    fn test_falsy_values() {
        for value in [json!(null), json!(false), json!(""), json!(0)] {
            assert!(Definition::from(value.clone()).is_falsy(), "{value} should be falsy");
        }
        for value in [json!("x"), json!(1), json!(true), json!({}), json!([])] {
            assert!(!Definition::from(value.clone()).is_falsy(), "{value} should not be falsy");
        }
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let definition: Definition = serde_yaml::from_str("url: https://a\nquery: '{ ping }'\n").expect("yaml");
        let mapping = definition.as_mapping().expect("mapping");
        assert_eq!(mapping["url"].as_str(), Some("https://a"));
        assert_eq!(definition.to_value(), json!({"url": "https://a", "query": "{ ping }"}));
    }

    #[test]
    fn test_document_renders_as_source() {
        let document = QueryDocument::compile("{ ping }").unwrap();
        let resolved = Resolved::Document(Arc::new(document));
        assert_eq!(resolved.type_name(), "document");
        assert_eq!(resolved.into_value(), json!("{ ping }"));
    }
}
