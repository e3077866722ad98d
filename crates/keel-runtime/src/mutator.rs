//! Read-modify-write against a single resource under optimistic concurrency.
//!
//! ```text
//! Start → Fetch(config + etag) → Decide(skip | patch) → Write(if-match etag)
//!                ▲                                          │
//!                └────────────── version conflict ──────────┤
//!                                                           ├─▶ Applied
//!                                                           └─▶ Failed
//! ```
//!
//! Throttling on either call is absorbed by the [`RetryPolicy`] before the
//! state machine sees it. A version conflict restarts at Fetch, up to
//! `conflict_attempts` cycles. Anything else is terminal for this resource.

use crate::outcome::{MutationOutcome, OutcomeStatus};
use keel_core::{ConfigApi, ErrorClass, Patch, RemoteError, Resource, RetryPolicy};
use serde_json::Value;
use std::sync::Arc;

/// Decision taken against a freshly-fetched configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Leave the resource alone.
    Skip(String),
    /// Apply this patch and write it back.
    Patch(Patch),
}

/// A transformation of a resource configuration.
///
/// `plan` must be deterministic and must only look at `current`.
pub trait Mutation: Send + Sync {
    fn name(&self) -> &'static str;

    fn plan(&self, current: &Value) -> Plan;
}

/// Executes [`Mutation`]s with conditional writes.
#[derive(Clone)]
pub struct VersionedMutator {
    api: Arc<dyn ConfigApi>,
    retry: RetryPolicy,
    conflict_attempts: u32,
}

impl VersionedMutator {
    pub fn new(api: Arc<dyn ConfigApi>, retry: RetryPolicy, conflict_attempts: u32) -> Self {
        Self {
            api,
            retry,
            conflict_attempts: conflict_attempts.max(1),
        }
    }

    /// Run one mutation against one resource to a final outcome.
    ///
    /// Never returns an error: every failure is folded into the outcome.
    pub async fn with_versioned_resource(
        &self,
        resource: &Resource,
        mutation: &dyn Mutation,
    ) -> MutationOutcome {
        let mut attempt = 0;
        let status = loop {
            attempt += 1;
            match self.attempt(resource, mutation).await {
                Ok(status) => break status,
                Err(error) if self.retry.classify(&error) == ErrorClass::VersionConflict => {
                    if attempt >= self.conflict_attempts {
                        break self.failed(
                            resource,
                            mutation,
                            attempt,
                            &error,
                            "version conflict persisted",
                        );
                    }
                    tracing::debug!(
                        resource_id = %resource.id,
                        action = mutation.name(),
                        attempt,
                        "Version conflict, re-fetching"
                    );
                }
                Err(error) => {
                    break self.failed(resource, mutation, attempt, &error, "remote call failed");
                }
            }
        };

        MutationOutcome {
            resource_id: resource.id.clone(),
            arn: resource.arn.clone(),
            action: mutation.name(),
            status,
            attempts: attempt,
        }
    }

    /// One Fetch → Decide → Write cycle.
    async fn attempt(
        &self,
        resource: &Resource,
        mutation: &dyn Mutation,
    ) -> Result<OutcomeStatus, RemoteError> {
        let kind = resource.kind;
        let id = resource.id.as_str();

        let current = self
            .retry
            .run("fetch_config", || self.api.fetch_config(kind, id))
            .await?;

        let patch = match mutation.plan(&current.document) {
            Plan::Skip(reason) => return Ok(OutcomeStatus::Skipped { reason }),
            Plan::Patch(patch) => patch,
        };

        let patched = patch.apply(&current.document);
        if patched == current.document {
            return Ok(OutcomeStatus::Skipped {
                reason: "configuration already in desired state".to_string(),
            });
        }

        let etag = current.etag.as_str();
        let new_etag = self
            .retry
            .run("write_config", || self.api.write_config(kind, id, &patched, etag))
            .await?;

        tracing::info!(
            resource_id = %resource.id,
            action = mutation.name(),
            etag = %new_etag,
            "Configuration updated"
        );
        Ok(OutcomeStatus::Applied)
    }

    fn failed(
        &self,
        resource: &Resource,
        mutation: &dyn Mutation,
        attempt: u32,
        error: &RemoteError,
        context: &str,
    ) -> OutcomeStatus {
        tracing::warn!(
            resource_id = %resource.id,
            arn = %resource.arn,
            action = mutation.name(),
            attempts = attempt,
            code = %error.code,
            error = %error,
            "{}", context
        );
        OutcomeStatus::Failed {
            reason: format!("{}: {}", context, error),
        }
    }
}
