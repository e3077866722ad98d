//! In-memory collaborators shared by the engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use keel_core::{
    BucketAclReader, Collaborators, ConfigApi, Datapoint, EngineConfig, MetricQuery,
    MetricsBackend, RemoteError, Resource, ResourceKind, RetryConfig, SiblingEnumerator,
    ValueSource, VersionedConfig,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Configuration store enforcing conditional writes.
///
/// Every accepted write bumps the resource's etag. Writes carrying any other
/// etag are rejected with `PreconditionFailed`.
#[derive(Default)]
pub struct FakeConfigApi {
    documents: Mutex<HashMap<String, (Value, u32)>>,
    /// Per-resource permanent write error.
    write_errors: Mutex<HashMap<String, RemoteError>>,
    /// Per-resource count of writes to reject with `Throttling` first.
    throttled_writes: Mutex<HashMap<String, u32>>,
    /// Per-resource count of reads to reject with `Throttling` first.
    throttled_fetches: Mutex<HashMap<String, u32>>,
    fetches: Mutex<u32>,
    /// Per-resource count of concurrent edits to apply right after a fetch.
    interfering_edits: Mutex<HashMap<String, u32>>,
    accepted: Mutex<Vec<String>>,
    stale_rejections: Mutex<u32>,
}

impl FakeConfigApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: &str, document: Value) {
        self.documents
            .lock()
            .unwrap()
            .insert(id.to_string(), (document, 1));
    }

    pub fn fail_writes(&self, id: &str, code: &str) {
        self.write_errors
            .lock()
            .unwrap()
            .insert(id.to_string(), RemoteError::new(code, "injected failure"));
    }

    pub fn throttle_writes(&self, id: &str, times: u32) {
        self.throttled_writes
            .lock()
            .unwrap()
            .insert(id.to_string(), times);
    }

    pub fn throttle_fetches(&self, id: &str, times: u32) {
        self.throttled_fetches
            .lock()
            .unwrap()
            .insert(id.to_string(), times);
    }

    /// Let another writer modify `id` right after each of the next `times` reads.
    pub fn interfere(&self, id: &str, times: u32) {
        self.interfering_edits
            .lock()
            .unwrap()
            .insert(id.to_string(), times);
    }

    pub fn document(&self, id: &str) -> Value {
        self.documents.lock().unwrap()[id].0.clone()
    }

    /// Ids of accepted writes, in acceptance order.
    pub fn accepted_writes(&self) -> Vec<String> {
        self.accepted.lock().unwrap().clone()
    }

    pub fn stale_rejections(&self) -> u32 {
        *self.stale_rejections.lock().unwrap()
    }

    /// Read calls received, throttled ones included.
    pub fn fetches(&self) -> u32 {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl ConfigApi for FakeConfigApi {
    async fn fetch_config(
        &self,
        _: ResourceKind,
        id: &str,
    ) -> Result<VersionedConfig, RemoteError> {
        *self.fetches.lock().unwrap() += 1;
        if throttled(&self.throttled_fetches, id) {
            return Err(RemoteError::new("Throttling", "Rate exceeded"));
        }

        let mut documents = self.documents.lock().unwrap();
        let Some((document, version)) = documents.get_mut(id) else {
            return Err(RemoteError::new("NoSuchDistribution", id));
        };
        let fetched = VersionedConfig {
            document: document.clone(),
            etag: format!("E{}", version),
        };

        let mut edits = self.interfering_edits.lock().unwrap();
        if let Some(remaining) = edits.get_mut(id).filter(|n| **n > 0) {
            *remaining -= 1;
            document["Comment"] = json!(format!("edited elsewhere at v{}", version));
            *version += 1;
        }
        Ok(fetched)
    }

    async fn write_config(
        &self,
        _: ResourceKind,
        id: &str,
        document: &Value,
        etag: &str,
    ) -> Result<String, RemoteError> {
        if let Some(error) = self.write_errors.lock().unwrap().get(id) {
            return Err(error.clone());
        }
        if throttled(&self.throttled_writes, id) {
            return Err(RemoteError::new("Throttling", "Rate exceeded"));
        }

        let mut documents = self.documents.lock().unwrap();
        let Some((current, version)) = documents.get_mut(id) else {
            return Err(RemoteError::new("NoSuchDistribution", id));
        };
        if etag != format!("E{}", version) {
            *self.stale_rejections.lock().unwrap() += 1;
            return Err(RemoteError::new(
                "PreconditionFailed",
                "The If-Match version is missing or not valid",
            ));
        }

        *current = document.clone();
        *version += 1;
        self.accepted.lock().unwrap().push(id.to_string());
        Ok(format!("E{}", version))
    }
}

/// Consume one pending throttle for `key`, if any are left.
fn throttled(pending: &Mutex<HashMap<String, u32>>, key: &str) -> bool {
    match pending.lock().unwrap().get_mut(key).filter(|n| **n > 0) {
        Some(remaining) => {
            *remaining -= 1;
            true
        }
        None => false,
    }
}

#[derive(Default)]
pub struct FakeSiblings {
    pub records: Vec<Value>,
    pub calls: Mutex<u32>,
    /// Listings to reject with `Throttling` before answering.
    pub throttled: Mutex<u32>,
}

impl FakeSiblings {
    /// Web ACL table `{"acl-a": "id-123", "acl-b": "id-456"}`.
    pub fn web_acls() -> Self {
        Self {
            records: vec![
                json!({"Name": "acl-a", "WebACLId": "id-123"}),
                json!({"Name": "acl-b", "WebACLId": "id-456"}),
            ],
            calls: Mutex::new(0),
            throttled: Mutex::new(0),
        }
    }

    pub fn throttle(self, times: u32) -> Self {
        *self.throttled.lock().unwrap() = times;
        self
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SiblingEnumerator for FakeSiblings {
    async fn list(&self, _kind: &str) -> Result<Vec<Value>, RemoteError> {
        *self.calls.lock().unwrap() += 1;
        let mut throttled = self.throttled.lock().unwrap();
        if *throttled > 0 {
            *throttled -= 1;
            return Err(RemoteError::new("Throttling", "Rate exceeded"));
        }
        Ok(self.records.clone())
    }
}

/// Bucket owners by name; unknown buckets are `NoSuchBucket`.
#[derive(Default)]
pub struct FakeBuckets {
    owners: HashMap<String, Result<String, RemoteError>>,
    /// Per-bucket count of reads to reject with `Throttling` first.
    throttled: Mutex<HashMap<String, u32>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeBuckets {
    pub fn owned(mut self, bucket: &str, owner: &str) -> Self {
        self.owners.insert(bucket.to_string(), Ok(owner.to_string()));
        self
    }

    pub fn denied(mut self, bucket: &str) -> Self {
        self.owners.insert(
            bucket.to_string(),
            Err(RemoteError::new("AccessDenied", "Access Denied")),
        );
        self
    }

    pub fn throttle(self, bucket: &str, times: u32) -> Self {
        self.throttled
            .lock()
            .unwrap()
            .insert(bucket.to_string(), times);
        self
    }

    pub fn failing(mut self, bucket: &str, code: &str) -> Self {
        self.owners
            .insert(bucket.to_string(), Err(RemoteError::new(code, "injected failure")));
        self
    }
}

#[async_trait]
impl BucketAclReader for FakeBuckets {
    async fn bucket_owner(&self, bucket: &str) -> Result<String, RemoteError> {
        self.calls.lock().unwrap().push(bucket.to_string());
        if throttled(&self.throttled, bucket) {
            return Err(RemoteError::new("Throttling", "Rate exceeded"));
        }
        self.owners
            .get(bucket)
            .cloned()
            .unwrap_or_else(|| Err(RemoteError::new("NoSuchBucket", bucket)))
    }
}

/// Returns the same series for every query.
#[derive(Default)]
pub struct FakeMetrics {
    pub series: HashMap<String, Vec<Datapoint>>,
}

#[async_trait]
impl MetricsBackend for FakeMetrics {
    async fn query_statistic(&self, query: &MetricQuery) -> Result<Vec<Datapoint>, RemoteError> {
        let id = query
            .dimensions
            .iter()
            .find(|d| d.name == "DistributionId")
            .map(|d| d.value.clone())
            .unwrap_or_default();
        Ok(self.series.get(&id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeValues {
    pub bodies: HashMap<String, String>,
    pub calls: Mutex<u32>,
}

impl FakeValues {
    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ValueSource for FakeValues {
    async fn fetch(&self, url: &str) -> Result<String, RemoteError> {
        *self.calls.lock().unwrap() += 1;
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| {
                RemoteError::new("RequestFailed", format!("connection refused: {}", url))
            })
    }
}

/// Handles on every fake so tests can inspect them after a run.
pub struct Harness {
    pub config: Arc<FakeConfigApi>,
    pub siblings: Arc<FakeSiblings>,
    pub buckets: Arc<FakeBuckets>,
    pub metrics: Arc<FakeMetrics>,
    pub values: Arc<FakeValues>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            config: Arc::new(FakeConfigApi::new()),
            siblings: Arc::new(FakeSiblings::web_acls()),
            buckets: Arc::new(FakeBuckets::default()),
            metrics: Arc::new(FakeMetrics::default()),
            values: Arc::new(FakeValues::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            config: self.config.clone(),
            siblings: self.siblings.clone(),
            buckets: self.buckets.clone(),
            metrics: self.metrics.clone(),
            values: self.values.clone(),
        }
    }
}

/// Engine configuration with millisecond backoff.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        retry: RetryConfig {
            base_delay_ms: 1,
            max_delay_ms: 2,
            ..RetryConfig::default()
        },
        ..EngineConfig::default()
    }
}

/// A distribution snapshot plus its live configuration document.
pub fn distribution(id: &str, web_acl: &str, enabled: bool) -> (Resource, Value) {
    let config = json!({
        "CallerReference": format!("ref-{}", id),
        "Comment": "",
        "Enabled": enabled,
        "WebACLId": web_acl,
        "DefaultCacheBehavior": {"TargetOriginId": "s3", "ViewerProtocolPolicy": "allow-all"},
        "CacheBehaviors": {"Quantity": 0},
        "Origins": {"Quantity": 0, "Items": []}
    });
    let snapshot = json!({
        "Id": id,
        "ARN": format!("arn:aws:cloudfront::123456789012:distribution/{}", id),
        "Enabled": enabled,
        "WebACLId": web_acl,
        "Origins": {"Quantity": 0, "Items": []}
    });
    let resource = Resource::from_snapshot(ResourceKind::Distribution, snapshot).unwrap();
    (resource, config)
}

/// A distribution whose snapshot lists object-storage origins for `buckets`.
pub fn distribution_with_origins(id: &str, buckets: &[&str]) -> Resource {
    let items: Vec<Value> = buckets
        .iter()
        .map(|bucket| {
            json!({
                "Id": bucket,
                "DomainName": format!("{}.s3.amazonaws.com", bucket),
                "S3OriginConfig": {"OriginAccessIdentity": ""}
            })
        })
        .collect();
    Resource::from_snapshot(
        ResourceKind::Distribution,
        json!({
            "Id": id,
            "ARN": format!("arn:aws:cloudfront::123456789012:distribution/{}", id),
            "Origins": {"Quantity": items.len(), "Items": items}
        }),
    )
    .unwrap()
}

pub fn policy(yaml: &str) -> keel_core::PolicyDefinition {
    keel_core::PolicyFile::from_yaml(yaml)
        .unwrap()
        .policies
        .remove(0)
}
