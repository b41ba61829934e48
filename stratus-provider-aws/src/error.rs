//! AWS error classification
//!
//! SDK errors are mapped to an [`ErrorKind`] here, once, from the service
//! error code and message. Nothing above this module looks at AWS codes.

use aws_sdk_codestarnotifications::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use stratus_core::error::{ErrorKind, ProviderError};
use stratus_core::finder;

/// Message CodeStar Notifications returns when deleting a target that is
/// still subscribed to some rule
pub const TARGET_SUBSCRIBED_MESSAGE: &str =
    "The target cannot be deleted because it is subscribed to one or more notification rules.";

const TRANSIENT_CODES: &[&str] = &[
    "ThrottlingException",
    "TooManyRequestsException",
    "ConcurrentModificationException",
    "InternalServerException",
    "ServiceUnavailableException",
    "RequestTimeout",
];

/// Classify a service error code and message
pub fn classify(code: Option<&str>, message: &str) -> ErrorKind {
    match code {
        Some(code) if finder::is_not_found_code(code) => ErrorKind::NotFound,
        Some("ValidationException") if message.contains(TARGET_SUBSCRIBED_MESSAGE) => {
            ErrorKind::StillReferenced
        }
        Some("ValidationException") => ErrorKind::Validation,
        Some(code) if TRANSIENT_CODES.contains(&code) => ErrorKind::Transient,
        _ => ErrorKind::Other,
    }
}

/// Build a [`ProviderError`] from a service error code and message
pub fn service_error(code: &str, message: &str) -> ProviderError {
    ProviderError::with_kind(classify(Some(code), message), format!("{}: {}", code, message))
}

/// Convert an SDK error into a classified [`ProviderError`]
pub(crate) fn from_sdk<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            ProviderError::transient(format!("{}", DisplayErrorContext(&err)))
        }
        _ => match err.code() {
            Some(code) => service_error(code, err.message().unwrap_or_default()),
            None => ProviderError::new(format!("{}", DisplayErrorContext(&err))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes() {
        assert_eq!(
            classify(Some("ResourceNotFoundException"), "Rule not found"),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn subscribed_target_is_still_referenced() {
        assert_eq!(
            classify(Some("ValidationException"), TARGET_SUBSCRIBED_MESSAGE),
            ErrorKind::StillReferenced
        );
        assert_eq!(
            classify(Some("ValidationException"), "Name is too long"),
            ErrorKind::Validation
        );
    }

    #[test]
    fn throttling_is_transient() {
        assert_eq!(classify(Some("ThrottlingException"), "Rate exceeded"), ErrorKind::Transient);
        assert_eq!(classify(Some("AccessDeniedException"), "denied"), ErrorKind::Other);
        assert_eq!(classify(None, ""), ErrorKind::Other);
    }

    #[test]
    fn service_error_keeps_code_in_message() {
        let err = service_error("ValidationException", TARGET_SUBSCRIBED_MESSAGE);
        assert!(err.is_still_referenced());
        assert!(err.message.starts_with("ValidationException: "));
    }
}
