//! # keel-core
//!
//! Shared types for the Keel selection-and-mutation engine:
//!
//! - [`Resource`] snapshots and their [`ResourceKind`] models
//! - [`FieldPath`] addressing and declarative [`Patch`] documents
//! - The remote error model ([`RemoteError`], [`ErrorClass`])
//! - Static [`Permission`] declarations
//! - Throttling classification and backoff ([`RetryPolicy`])
//! - Engine and policy configuration loaded from YAML
//! - The collaborator interfaces the engine talks to ([`adapter`])

pub mod adapter;
pub mod config;
pub mod error;
pub mod patch;
pub mod path;
pub mod permission;
pub mod resource;
pub mod retry;

pub use adapter::{
    BucketAclReader, Collaborators, ConfigApi, Datapoint, Dimension, MetricQuery,
    MetricsBackend, SiblingEnumerator, ValueSource, VersionedConfig,
};
pub use config::{
    ActionDefinition, ComparisonOp, ConfigError, EngineConfig, FilterDefinition,
    PolicyDefinition, PolicyFile, RetryConfig, ValuesFormat, ValuesFrom,
};
pub use error::{ErrorClass, PathError, RemoteError, ResourceError};
pub use patch::{Patch, PatchOp};
pub use path::{FieldPath, Segment};
pub use permission::{Access, Permission};
pub use resource::{Resource, ResourceKind};
pub use retry::RetryPolicy;
