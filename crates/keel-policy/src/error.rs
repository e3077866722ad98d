//! Error types for resource selection.
//!
//! Every variant here is fatal for the selection pass it occurs in. Errors
//! that only exclude a single sub-reference (access denied, not found) never
//! surface as a `PolicyError`; they are logged and folded into the verdict.

use keel_core::{RemoteError, ResourceKind};
use thiserror::Error;

/// Errors raised while resolving selection context or evaluating predicates.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// An external value document could not be fetched.
    #[error("value source '{url}' is unreachable: {source}")]
    SourceUnreachable {
        url: String,
        #[source]
        source: RemoteError,
    },

    /// The document was fetched but the expression addressed nothing usable.
    #[error("cannot extract values from '{url}': {reason}")]
    ExtractionError { url: String, reason: String },

    /// A reference matched neither a known name nor a known identifier.
    #[error("unknown {kind} reference '{reference}'")]
    UnknownReference { kind: String, reference: String },

    /// A sibling collection could not be enumerated.
    #[error("failed to enumerate {kind}: {source}")]
    LookupFailed {
        kind: String,
        #[source]
        source: RemoteError,
    },

    /// A predicate's remote call failed with a non-excludable error.
    #[error("{filter} failed for resource {resource_id}: {source}")]
    Remote {
        filter: &'static str,
        resource_id: String,
        #[source]
        source: RemoteError,
    },

    /// The filter or action is not registered for this resource kind.
    #[error("'{type_tag}' is not available for resource kind '{kind}'")]
    UnsupportedForKind {
        type_tag: &'static str,
        kind: ResourceKind,
    },

    /// A definition is structurally valid but semantically unusable.
    #[error("invalid {type_tag} definition: {reason}")]
    InvalidDefinition {
        type_tag: &'static str,
        reason: String,
    },

    /// A predicate asked for context that was never requested.
    #[error("selection context has no entry for {0}")]
    MissingContext(String),
}

impl PolicyError {
    pub fn unknown_reference(kind: &str, reference: &str) -> Self {
        Self::UnknownReference {
            kind: kind.to_string(),
            reference: reference.to_string(),
        }
    }

    pub fn extraction(url: &str, reason: impl Into<String>) -> Self {
        Self::ExtractionError {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
