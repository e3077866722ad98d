//! Interfaces to the remote services the engine depends on.
//!
//! Implementations live outside the engine (SDK clients, test fakes). Every
//! call is a suspension point; none of them are retried here.

use crate::error::RemoteError;
use crate::resource::ResourceKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A configuration document together with the version token it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedConfig {
    pub document: Value,
    pub etag: String,
}

/// The remote configuration API for governed resources.
#[async_trait]
pub trait ConfigApi: Send + Sync {
    /// Read the current configuration and its version token.
    async fn fetch_config(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<VersionedConfig, RemoteError>;

    /// Write a configuration conditioned on `etag`. Returns the new token.
    ///
    /// Must fail with a version-conflict error when `etag` is not the
    /// resource's current token.
    async fn write_config(
        &self,
        kind: ResourceKind,
        id: &str,
        document: &Value,
        etag: &str,
    ) -> Result<String, RemoteError>;
}

/// Enumerates a sibling resource collection (e.g. `waf` web ACLs).
#[async_trait]
pub trait SiblingEnumerator: Send + Sync {
    async fn list(&self, kind: &str) -> Result<Vec<Value>, RemoteError>;
}

/// Reads object-storage bucket ownership.
#[async_trait]
pub trait BucketAclReader: Send + Sync {
    /// Return the canonical id of the bucket owner.
    async fn bucket_owner(&self, bucket: &str) -> Result<String, RemoteError>;
}

/// A metric dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A statistic query against the metrics backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub statistic: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period_secs: u64,
}

/// One datapoint of a statistic series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// The external metrics backend.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    async fn query_statistic(&self, query: &MetricQuery) -> Result<Vec<Datapoint>, RemoteError>;
}

/// Fetches the raw body of an external value document.
#[async_trait]
pub trait ValueSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, RemoteError>;
}

/// The full set of collaborators one policy run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub config: Arc<dyn ConfigApi>,
    pub siblings: Arc<dyn SiblingEnumerator>,
    pub buckets: Arc<dyn BucketAclReader>,
    pub metrics: Arc<dyn MetricsBackend>,
    pub values: Arc<dyn ValueSource>,
}
