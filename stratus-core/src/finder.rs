//! Finder - Classify a single remote read as found or not found
//!
//! A finder performs exactly one read. Remote APIs signal absence either
//! with an error code or with an empty payload, so both collapse to `None`.
//! Finders never retry.

use crate::error::{ProviderError, ProviderResult};

/// Remote error codes that mean the object does not exist
pub const NOT_FOUND_CODES: &[&str] = &[
    "ResourceNotFoundException",
    "NotFoundException",
    "ResourceNotFound",
];

/// Whether a remote error code is one of the not-found codes
pub fn is_not_found_code(code: &str) -> bool {
    NOT_FOUND_CODES.contains(&code)
}

/// Collapse a remote read into `Some(found)`, `None` (absent) or an error
///
/// `NotFound` errors and empty payloads both become `None`; every other
/// error is passed through unchanged.
pub fn lookup<T>(result: ProviderResult<Option<T>>) -> ProviderResult<Option<T>> {
    match result {
        Ok(found) => Ok(found),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Turn an absent lookup into a `NotFound` error
pub fn require<T>(found: Option<T>, identifier: &str) -> ProviderResult<T> {
    found.ok_or_else(|| {
        ProviderError::not_found(format!("remote object {} not found", identifier))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn not_found_error_becomes_none() {
        let result: ProviderResult<Option<u32>> = Err(ProviderError::not_found("gone"));
        assert!(lookup(result).unwrap().is_none());
    }

    #[test]
    fn empty_payload_becomes_none() {
        assert!(lookup::<u32>(Ok(None)).unwrap().is_none());
    }

    #[test]
    fn found_payload_is_kept() {
        assert_eq!(lookup(Ok(Some(7))).unwrap(), Some(7));
    }

    #[test]
    fn other_errors_pass_through() {
        let result: ProviderResult<Option<u32>> = Err(ProviderError::transient("throttled"));
        let err = lookup(result).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transient);
        assert_eq!(err.message, "throttled");
    }

    #[test]
    fn not_found_codes() {
        assert!(is_not_found_code("ResourceNotFoundException"));
        assert!(!is_not_found_code("ValidationException"));
    }

    #[test]
    fn require_reports_identifier() {
        let err = require::<u32>(None, "arn:aws:x:::y").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.message.contains("arn:aws:x:::y"));
    }
}
