//! Error - Provider error taxonomy
//!
//! Every remote failure is classified once, where the remote error type is
//! known, into an [`ErrorKind`]. Callers branch on the kind instead of
//! inspecting messages.

use std::fmt;

use crate::resource::ResourceId;
use crate::schema::TypeError;

/// Classification of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote object does not exist
    NotFound,
    /// Desired state is malformed; never reaches the remote system
    Validation,
    /// Network or service fault that may succeed on retry
    Transient,
    /// The remote object is still referenced by another owner
    StillReferenced,
    /// Anything not recognized
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Validation => "validation",
            ErrorKind::Transient => "transient",
            ErrorKind::StillReferenced => "still referenced",
            ErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Lifecycle operation an error happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    Cleanup,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "creating",
            Operation::Read => "reading",
            Operation::Update => "updating",
            Operation::Delete => "deleting",
            Operation::Import => "importing",
            Operation::Cleanup => "cleaning up",
        };
        f.write_str(s)
    }
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub operation: Option<Operation>,
    pub resource_id: Option<ResourceId>,
    /// Remote identifier the operation targeted
    pub identifier: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}] ", id)?;
        }
        if let Some(op) = self.operation {
            write!(f, "{}", op)?;
            if let Some(ref identifier) = self.identifier {
                write!(f, " ({})", identifier)?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Other, message)
    }

    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
            resource_id: None,
            identifier: None,
            cause: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Validation, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Transient, message)
    }

    pub fn still_referenced(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::StillReferenced, message)
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    /// Attach the operation and identifier, keeping any already set
    pub fn during(mut self, operation: Operation, identifier: Option<&str>) -> Self {
        if self.operation.is_none() {
            self.operation = Some(operation);
        }
        if self.identifier.is_none() {
            self.identifier = identifier.map(str::to_string);
        }
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_still_referenced(&self) -> bool {
        self.kind == ErrorKind::StillReferenced
    }

    /// Build a validation error listing every schema violation
    pub fn from_type_errors(id: &ResourceId, errors: &[TypeError]) -> Self {
        let message = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::validation(message).for_resource(id.clone())
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_includes_operation_and_identifier() {
        let err = ProviderError::transient("connection reset")
            .during(Operation::Delete, Some("arn:aws:x:::y"))
            .for_resource(ResourceId::new("rule", "main"));
        assert_eq!(
            err.to_string(),
            "[rule.main] deleting (arn:aws:x:::y): connection reset"
        );
    }

    #[test]
    fn during_keeps_innermost_operation() {
        let err = ProviderError::new("boom")
            .during(Operation::Cleanup, Some("target"))
            .during(Operation::Delete, Some("rule"));
        assert_eq!(err.operation, Some(Operation::Cleanup));
        assert_eq!(err.identifier.as_deref(), Some("target"));
    }

    #[test]
    fn cause_is_exposed_as_source() {
        let io = std::io::Error::other("socket closed");
        let err = ProviderError::transient("request failed").with_cause(io);
        assert_eq!(err.source().unwrap().to_string(), "socket closed");
    }

    #[test]
    fn type_errors_become_validation() {
        let id = ResourceId::new("rule", "main");
        let err = ProviderError::from_type_errors(
            &id,
            &[
                TypeError::MissingRequired {
                    name: "name".to_string(),
                },
                TypeError::UnknownAttribute {
                    name: "colour".to_string(),
                },
            ],
        );
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("'name' is missing"));
        assert!(err.message.contains("Unknown attribute 'colour'"));
    }
}
