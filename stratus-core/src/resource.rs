//! Resource - Representing resources and their state

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// Resource type (e.g., "codestarnotifications.notification_rule")
    pub resource_type: String,
    /// Resource name (the local binding name from configuration)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    /// Convert to JSON
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Convert from JSON. Nulls have no counterpart and yield `None`.
    ///
    /// Fractional numbers are truncated, which suits remote responses. Use
    /// [`Value::from_json_strict`] for user input.
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(|f| Value::Int(f as i64))
                }
            }
            serde_json::Value::Array(arr) => {
                Some(Value::List(arr.iter().filter_map(Value::from_json).collect()))
            }
            serde_json::Value::Object(obj) => Some(Value::Map(
                obj.iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    /// Convert user-supplied JSON, rejecting numbers that are not integers
    pub fn from_json_strict(value: &serde_json::Value) -> Result<Option<Value>, String> {
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(|i| Some(Value::Int(i)))
                .ok_or_else(|| format!("expected an integer, got {}", n)),
            serde_json::Value::Array(arr) => {
                let mut items = Vec::with_capacity(arr.len());
                for item in arr {
                    if let Some(v) = Value::from_json_strict(item)? {
                        items.push(v);
                    }
                }
                Ok(Some(Value::List(items)))
            }
            serde_json::Value::Object(obj) => {
                let mut map = HashMap::new();
                for (k, v) in obj {
                    if let Some(v) =
                        Value::from_json_strict(v).map_err(|e| format!("{}: {}", k, e))?
                    {
                        map.insert(k.clone(), v);
                    }
                }
                Ok(Some(Value::Map(map)))
            }
            other => Ok(Value::from_json(other)),
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Int(_) => "Int",
            Value::Bool(_) => "Bool",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
        }
    }
}

/// Attribute map keyed by schema field name
pub type Attributes = HashMap<String, Value>;

/// Convert an attribute map to a JSON object
pub fn attributes_to_json(attributes: &Attributes) -> serde_json::Value {
    serde_json::Value::Object(
        attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Convert a JSON object to an attribute map. Non-object values yield an empty map.
pub fn attributes_from_json(value: &serde_json::Value) -> Attributes {
    match value {
        serde_json::Value::Object(obj) => obj
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect(),
        _ => HashMap::new(),
    }
}

/// Encode a typed state structure as attributes
pub fn encode<T: Serialize>(typed: &T) -> serde_json::Result<Attributes> {
    Ok(attributes_from_json(&serde_json::to_value(typed)?))
}

/// Decode attributes into a typed state structure
pub fn decode<T: DeserializeOwned>(attributes: &Attributes) -> serde_json::Result<T> {
    serde_json::from_value(attributes_to_json(attributes))
}

/// Desired state declared in configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: Attributes,
    /// If true, this is a data source (read-only) that won't be modified
    pub read_only: bool,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
            read_only: false,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Returns true if this resource is a data source (read-only)
    pub fn is_data_source(&self) -> bool {
        self.read_only
    }
}

/// Current state fetched from the remote system
///
/// `identifier` is set if and only if `exists` is true.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Remote identifier (e.g., a notification rule ARN)
    pub identifier: Option<String>,
    pub attributes: Attributes,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, identifier: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id,
            identifier: Some(identifier.into()),
            attributes,
            exists: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeSet;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        ids: BTreeSet<String>,
        #[serde(default)]
        tags: HashMap<String, String>,
    }

    #[test]
    fn not_found_state_has_no_identifier() {
        let state = State::not_found(ResourceId::new("rule", "a"));
        assert!(!state.exists);
        assert!(state.identifier.is_none());
    }

    #[test]
    fn existing_state_carries_identifier() {
        let state = State::existing(ResourceId::new("rule", "a"), "arn:x", HashMap::new());
        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("arn:x"));
    }

    #[test]
    fn typed_state_through_attributes() {
        let sample = Sample {
            name: "x".to_string(),
            ids: ["b".to_string(), "a".to_string()].into_iter().collect(),
            tags: HashMap::from([("env".to_string(), "prod".to_string())]),
        };

        let attrs = encode(&sample).unwrap();
        assert_eq!(
            attrs.get("ids"),
            Some(&Value::List(vec![
                Value::String("a".to_string()),
                Value::String("b".to_string())
            ]))
        );

        let back: Sample = decode(&attrs).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn strict_conversion_rejects_fractions() {
        assert_eq!(
            Value::from_json_strict(&serde_json::json!(3)),
            Ok(Some(Value::Int(3)))
        );
        assert_eq!(
            Value::from_json_strict(&serde_json::json!({"limit": 1.9})),
            Err("limit: expected an integer, got 1.9".to_string())
        );
        assert!(Value::from_json_strict(&serde_json::json!([1, 2.5])).is_err());
        assert_eq!(Value::from_json(&serde_json::json!(1.9)), Some(Value::Int(1)));
    }

    #[test]
    fn json_nulls_are_dropped() {
        let attrs = attributes_from_json(&serde_json::json!({"a": null, "b": 1}));
        assert!(!attrs.contains_key("a"));
        assert_eq!(attrs.get("b"), Some(&Value::Int(1)));
    }
}
