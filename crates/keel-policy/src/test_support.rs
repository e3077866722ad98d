//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use keel_core::{
    BucketAclReader, Collaborators, ConfigApi, Datapoint, MetricQuery, MetricsBackend,
    RemoteError, ResourceKind, SiblingEnumerator, ValueSource, VersionedConfig,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct NoConfig;

#[async_trait]
impl ConfigApi for NoConfig {
    async fn fetch_config(
        &self,
        _: ResourceKind,
        id: &str,
    ) -> Result<VersionedConfig, RemoteError> {
        Err(RemoteError::new("NoSuchDistribution", id))
    }

    async fn write_config(
        &self,
        _: ResourceKind,
        id: &str,
        _: &Value,
        _: &str,
    ) -> Result<String, RemoteError> {
        Err(RemoteError::new("NoSuchDistribution", id))
    }
}

#[derive(Default)]
pub struct Siblings {
    pub records: Vec<Value>,
    pub calls: Mutex<u32>,
}

#[async_trait]
impl SiblingEnumerator for Siblings {
    async fn list(&self, _kind: &str) -> Result<Vec<Value>, RemoteError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.records.clone())
    }
}

/// Bucket owners keyed by bucket name; missing buckets are `NoSuchBucket`.
#[derive(Default)]
pub struct Buckets {
    pub owners: HashMap<String, Result<String, RemoteError>>,
}

impl Buckets {
    pub fn owner(mut self, bucket: &str, owner: &str) -> Self {
        self.owners.insert(bucket.to_string(), Ok(owner.to_string()));
        self
    }

    pub fn error(mut self, bucket: &str, code: &str) -> Self {
        self.owners
            .insert(bucket.to_string(), Err(RemoteError::new(code, bucket)));
        self
    }
}

#[async_trait]
impl BucketAclReader for Buckets {
    async fn bucket_owner(&self, bucket: &str) -> Result<String, RemoteError> {
        self.owners
            .get(bucket)
            .cloned()
            .unwrap_or_else(|| Err(RemoteError::new("NoSuchBucket", bucket)))
    }
}

#[derive(Default)]
pub struct Metrics {
    pub datapoints: Vec<Datapoint>,
    pub queries: Mutex<Vec<MetricQuery>>,
}

#[async_trait]
impl MetricsBackend for Metrics {
    async fn query_statistic(&self, query: &MetricQuery) -> Result<Vec<Datapoint>, RemoteError> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.datapoints.clone())
    }
}

#[derive(Default)]
pub struct Values {
    pub bodies: HashMap<String, String>,
    pub calls: Mutex<u32>,
}

#[async_trait]
impl ValueSource for Values {
    async fn fetch(&self, url: &str) -> Result<String, RemoteError> {
        *self.calls.lock().unwrap() += 1;
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| RemoteError::new("Http404", url))
    }
}

pub fn collaborators() -> Collaborators {
    Collaborators {
        config: Arc::new(NoConfig),
        siblings: Arc::new(Siblings::default()),
        buckets: Arc::new(Buckets::default()),
        metrics: Arc::new(Metrics::default()),
        values: Arc::new(Values::default()),
    }
}
