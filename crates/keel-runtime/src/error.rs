use keel_core::ResourceKind;
use keel_policy::PolicyError;
use thiserror::Error;

/// Errors that abort a whole policy run.
///
/// Per-resource failures are never reported here; they end up as
/// [`crate::outcome::OutcomeStatus::Failed`] entries in the batch report.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("action '{type_tag}' is not available for resource kind '{kind}'")]
    UnsupportedForKind {
        type_tag: &'static str,
        kind: ResourceKind,
    },

    #[error("resource {resource_id} is a {actual}, policy targets {expected}")]
    KindMismatch {
        resource_id: String,
        expected: ResourceKind,
        actual: ResourceKind,
    },
}
