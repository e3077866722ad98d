//! Error types shared across Keel crates.

use thiserror::Error;

/// Codes the remote service uses to reject a write whose version token is stale.
pub const VERSION_CONFLICT_CODES: &[&str] = &["PreconditionFailed", "InvalidIfMatchVersion"];

/// Codes reported when the caller may not read a dependency.
pub const ACCESS_DENIED_CODES: &[&str] = &["AccessDenied", "AccessDeniedException"];

/// Codes reported when a referenced dependency does not exist.
pub const NOT_FOUND_CODES: &[&str] = &["NoSuchBucket", "NotFound", "NoSuchDistribution"];

/// An error reported by a remote service, identified by its error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    /// Service error code (e.g. `Throttling`, `PreconditionFailed`).
    pub code: String,
    /// Raw message as returned by the service.
    pub message: String,
}

impl RemoteError {
    /// Create a new remote error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classify the error by its code.
    ///
    /// Throttling is not decided here: which codes are retryable is a property
    /// of the configured retry policy, so throttling codes classify as `Other`
    /// until the policy says otherwise.
    pub fn class(&self) -> ErrorClass {
        let code = self.code.as_str();
        if VERSION_CONFLICT_CODES.contains(&code) {
            ErrorClass::VersionConflict
        } else if ACCESS_DENIED_CODES.contains(&code) {
            ErrorClass::AccessDenied
        } else if NOT_FOUND_CODES.contains(&code) {
            ErrorClass::NotFound
        } else {
            ErrorClass::Other
        }
    }

    pub fn is_version_conflict(&self) -> bool {
        self.class() == ErrorClass::VersionConflict
    }
}

/// Categories of remote errors that the engine treats differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rate-limit rejection; retried with backoff.
    Throttled,
    /// The write's version token no longer matches; retried via re-fetch.
    VersionConflict,
    /// Caller may not see the target.
    AccessDenied,
    /// Target does not exist.
    NotFound,
    /// Anything else; terminal for the affected resource.
    Other,
}

/// Errors building a [`Resource`](crate::Resource) from an enumeration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("resource snapshot is not an object")]
    NotAnObject,

    #[error("resource snapshot is missing required field '{0}'")]
    MissingField(&'static str),
}

/// Errors parsing a [`FieldPath`](crate::FieldPath) expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("field path is empty")]
    Empty,

    #[error("field path '{path}' has an empty segment")]
    EmptySegment { path: String },

    #[error("field path '{path}' has a malformed segment '{segment}'")]
    MalformedSegment { path: String, segment: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_known_codes() {
        assert_eq!(
            RemoteError::new("PreconditionFailed", "etag").class(),
            ErrorClass::VersionConflict
        );
        assert_eq!(
            RemoteError::new("AccessDenied", "nope").class(),
            ErrorClass::AccessDenied
        );
        assert_eq!(
            RemoteError::new("NoSuchBucket", "gone").class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            RemoteError::new("Throttling", "slow down").class(),
            ErrorClass::Other
        );
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let err = RemoteError::new("InternalError", "boom");
        assert_eq!(err.to_string(), "InternalError: boom");
    }
}
