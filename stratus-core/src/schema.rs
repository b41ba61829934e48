//! Schema - Define type schemas for resources
//!
//! Providers declare a schema for each resource type. Desired state is
//! checked against it before any remote call is made, so malformed input
//! never costs a network round-trip.

use std::collections::{HashMap, HashSet};
use std::fmt;

use regex::Regex;

use crate::resource::{Attributes, Value};

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// Ordered list
    List(Box<AttributeType>),
    /// Unordered collection without duplicates
    Set(Box<AttributeType>),
    /// Map with string keys
    Map(Box<AttributeType>),
    /// Nested block with its own attributes
    Block(Vec<AttributeSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => validate_items(inner, items),

            (AttributeType::Set(inner), Value::List(items)) => {
                validate_items(inner, items)?;
                for (i, item) in items.iter().enumerate() {
                    if items[..i].contains(item) {
                        return Err(TypeError::DuplicateItem { index: i });
                    }
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(fields), Value::Map(map)) => {
                let errors = validate_fields(fields, map);
                if errors.is_empty() {
                    Ok(())
                } else {
                    Err(TypeError::BlockErrors(errors))
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name().to_string(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }

    fn apply_defaults(&self, value: &mut Value) {
        match (self, value) {
            (AttributeType::Block(fields), Value::Map(map)) => apply_field_defaults(fields, map),
            (AttributeType::List(inner) | AttributeType::Set(inner), Value::List(items)) => {
                for item in items {
                    inner.apply_defaults(item);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

fn validate_items(inner: &AttributeType, items: &[Value]) -> Result<(), TypeError> {
    for (i, item) in items.iter().enumerate() {
        inner.validate(item).map_err(|e| TypeError::ListItemError {
            index: i,
            inner: Box::new(e),
        })?;
    }
    Ok(())
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Length {len} out of range {min}..={max}")]
    LengthOutOfRange { len: usize, min: usize, max: usize },

    #[error("Value '{value}' {message}")]
    PatternMismatch { value: String, message: String },

    #[error("Expected between {min} and {max} items, got {count}")]
    ItemCountOutOfRange {
        count: usize,
        min: usize,
        max: usize,
    },

    #[error("Duplicate item at index {index}")]
    DuplicateItem { index: usize },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    BlockErrors(Vec<TypeError>),
}

/// Regular expression constraint with a human readable explanation
///
/// Compiled once when the schema is built. An invalid expression is kept as
/// its compile error and reported on every validation.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub source: String,
    compiled: Result<Regex, String>,
    pub message: String,
}

impl Pattern {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Regex::new(&source).map_err(|e| e.to_string());
        Self {
            source,
            compiled,
            message: message.into(),
        }
    }

    pub fn is_match(&self, value: &str) -> Result<bool, TypeError> {
        match &self.compiled {
            Ok(regex) => Ok(regex.is_match(value)),
            Err(e) => Err(TypeError::ValidationFailed {
                message: format!("invalid pattern '{}': {}", self.source, e),
            }),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the remote system, never by configuration
    pub computed: bool,
    /// Any change requires destroy-and-recreate instead of in-place update
    pub force_new: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Inclusive string length bounds
    pub length: Option<(usize, usize)>,
    pub pattern: Option<Pattern>,
    /// Inclusive cardinality bounds for lists and sets
    pub items: Option<(usize, usize)>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            default: None,
            description: None,
            length: None,
            pattern: None,
            items: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_length(mut self, min: usize, max: usize) -> Self {
        self.length = Some((min, max));
        self
    }

    pub fn with_pattern(mut self, regex: impl Into<String>, message: impl Into<String>) -> Self {
        self.pattern = Some(Pattern::new(regex, message));
        self
    }

    pub fn with_items(mut self, min: usize, max: usize) -> Self {
        self.items = Some((min, max));
        self
    }

    /// Check a value against the type and every constraint of this attribute
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        self.attr_type.validate(value)?;

        if let (Some((min, max)), Value::String(s)) = (self.length, value) {
            let len = s.chars().count();
            if len < min || len > max {
                return Err(TypeError::LengthOutOfRange { len, min, max });
            }
        }

        if let (Some(pattern), Value::String(s)) = (&self.pattern, value) {
            if !pattern.is_match(s)? {
                return Err(TypeError::PatternMismatch {
                    value: s.clone(),
                    message: pattern.message.clone(),
                });
            }
        }

        if let (Some((min, max)), Value::List(items)) = (self.items, value) {
            let count = items.len();
            if count < min || count > max {
                return Err(TypeError::ItemCountOutOfRange { count, min, max });
            }
        }

        Ok(())
    }
}

fn validate_fields(fields: &[AttributeSchema], attributes: &Attributes) -> Vec<TypeError> {
    let mut errors = Vec::new();

    for field in fields {
        let present = attributes.contains_key(&field.name);
        if field.required && !present && field.default.is_none() {
            errors.push(TypeError::MissingRequired {
                name: field.name.clone(),
            });
        }
        if field.computed && present {
            errors.push(TypeError::ComputedAttribute {
                name: field.name.clone(),
            });
        }
    }

    let mut names: Vec<&String> = attributes.keys().collect();
    names.sort();
    for name in names {
        let value = &attributes[name];
        match fields.iter().find(|f| &f.name == name) {
            Some(field) => {
                if field.computed {
                    continue;
                }
                if let Err(e) = field.validate(value) {
                    errors.push(TypeError::AttributeError {
                        name: name.clone(),
                        inner: Box::new(e),
                    });
                }
            }
            None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
        }
    }

    errors
}

fn apply_field_defaults(fields: &[AttributeSchema], attributes: &mut Attributes) {
    for field in fields {
        match attributes.get_mut(&field.name) {
            Some(value) => field.attr_type.apply_defaults(value),
            None => {
                if let Some(default) = &field.default {
                    attributes.insert(field.name.clone(), default.clone());
                }
            }
        }
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    fn fields(&self) -> Vec<AttributeSchema> {
        let mut fields: Vec<AttributeSchema> = self.attributes.values().cloned().collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        fields
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let errors = validate_fields(&self.fields(), attributes);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fill in defaults for absent attributes, including inside nested blocks
    pub fn apply_defaults(&self, attributes: &Attributes) -> Attributes {
        let mut resolved = attributes.clone();
        apply_field_defaults(&self.fields(), &mut resolved);
        resolved
    }

    /// Names of the attributes whose change forces replacement, out of `changed`
    pub fn replacement_attributes(&self, changed: &[String]) -> Vec<String> {
        let force_new: HashSet<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        changed
            .iter()
            .filter(|name| force_new.contains(name.as_str()))
            .cloned()
            .collect()
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// ARN type (e.g., "arn:aws:sns:us-east-1:123456789012:topic")
    pub fn arn() -> AttributeType {
        AttributeType::Custom {
            name: "Arn".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_arn(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// Enum over string variants
    pub fn string_enum(variants: &[&str]) -> AttributeType {
        AttributeType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }
}

/// Validate ARN format: `arn:partition:service:region:account:resource`
pub fn validate_arn(arn: &str) -> Result<(), String> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    if parts.len() != 6 || parts[0] != "arn" {
        return Err(format!(
            "Invalid ARN '{}': expected arn:partition:service:region:account:resource",
            arn
        ));
    }

    let partition = parts[1];
    let valid_partition = partition == "aws"
        || partition
            .strip_prefix("aws-")
            .is_some_and(|rest| !rest.is_empty() && rest.split('-').all(is_lower_alpha));
    if !valid_partition {
        return Err(format!("Invalid ARN '{}': bad partition '{}'", arn, partition));
    }

    if parts[2].is_empty() {
        return Err(format!("Invalid ARN '{}': missing service", arn));
    }

    let account = parts[4];
    if !account.is_empty()
        && account != "aws"
        && !(account.len() == 12 && account.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(format!(
            "Invalid ARN '{}': account ID must be 12 digits",
            arn
        ));
    }

    if parts[5].is_empty() {
        return Err(format!("Invalid ARN '{}': missing resource", arn));
    }

    Ok(())
}

fn is_lower_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase())
}
