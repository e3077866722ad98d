//! `check-s3-origin`: dependency-existence predicate.
//!
//! A distribution matches when at least one of its object-storage origins
//! still exists and, if an authorized-owner set is configured, is owned by
//! one of those owners. Origins that cannot be read (access denied) or no
//! longer exist are excluded silently; any other remote error aborts the
//! selection pass.

use crate::context::{Requirement, SelectionContext};
use crate::error::PolicyError;
use crate::predicate::Predicate;
use async_trait::async_trait;
use keel_core::{ErrorClass, FieldPath, Permission, Resource, ValuesFrom};
use serde_json::Value;
use std::collections::BTreeSet;

const GET_BUCKET_ACL: Permission = Permission::read("s3:GetBucketAcl");

/// What a single origin check concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginVerdict {
    Verified,
    OwnerNotAuthorized { owner: String },
    AccessDenied,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginCheck {
    pub bucket: String,
    pub verdict: OriginVerdict,
}

#[derive(Debug, Clone)]
pub struct OriginPredicate {
    accounts_from: Option<ValuesFrom>,
}

impl OriginPredicate {
    pub fn new(accounts_from: Option<ValuesFrom>) -> Self {
        Self { accounts_from }
    }

    /// Bucket names behind the resource's object-storage origins.
    pub fn origin_buckets(resource: &Resource) -> Vec<String> {
        let origins = FieldPath::parse("Origins.Items[]")
            .map(|path| resource.select(&path))
            .unwrap_or_default();

        origins
            .into_iter()
            .filter(|origin| origin.get("S3OriginConfig").is_some())
            .filter_map(|origin| origin.get("DomainName").and_then(Value::as_str))
            .map(|domain| domain.split('.').next().unwrap_or(domain).to_string())
            .collect()
    }

    /// Check every origin of `resource`.
    pub async fn check_origins(
        &self,
        resource: &Resource,
        ctx: &SelectionContext,
    ) -> Result<Vec<OriginCheck>, PolicyError> {
        let authorized: Option<&BTreeSet<String>> = match &self.accounts_from {
            Some(from) => Some(ctx.values(from)?),
            None => None,
        };
        let buckets = &ctx.collaborators().buckets;

        let mut checks = Vec::new();
        for bucket in Self::origin_buckets(resource) {
            let result = ctx
                .retry()
                .run("GetBucketAcl", || buckets.bucket_owner(&bucket))
                .await;

            let verdict = match result {
                Ok(owner) => match authorized {
                    Some(owners) if !owners.is_empty() && !owners.contains(&owner) => {
                        tracing::debug!(
                            resource_id = %resource.id,
                            bucket = %bucket,
                            owner = %owner,
                            "Origin bucket owner not in authorized set"
                        );
                        OriginVerdict::OwnerNotAuthorized { owner }
                    }
                    _ => OriginVerdict::Verified,
                },
                Err(error) => match ctx.retry().classify(&error) {
                    ErrorClass::AccessDenied => {
                        tracing::debug!(
                            resource_id = %resource.id,
                            bucket = %bucket,
                            code = %error.code,
                            "Origin bucket not accessible"
                        );
                        OriginVerdict::AccessDenied
                    }
                    ErrorClass::NotFound => {
                        tracing::debug!(
                            resource_id = %resource.id,
                            bucket = %bucket,
                            code = %error.code,
                            "Origin bucket does not exist"
                        );
                        OriginVerdict::NotFound
                    }
                    _ => {
                        return Err(PolicyError::Remote {
                            filter: "check-s3-origin",
                            resource_id: resource.id.clone(),
                            source: error,
                        });
                    }
                },
            };
            checks.push(OriginCheck { bucket, verdict });
        }
        Ok(checks)
    }
}

#[async_trait]
impl Predicate for OriginPredicate {
    fn name(&self) -> &'static str {
        "check-s3-origin"
    }

    fn permissions(&self) -> Vec<Permission> {
        vec![GET_BUCKET_ACL]
    }

    fn requirements(&self) -> Vec<Requirement> {
        self.accounts_from
            .iter()
            .cloned()
            .map(Requirement::Values)
            .collect()
    }

    async fn matches(
        &self,
        resource: &Resource,
        ctx: &SelectionContext,
    ) -> Result<bool, PolicyError> {
        let checks = self.check_origins(resource, ctx).await?;
        Ok(checks
            .iter()
            .any(|check| check.verdict == OriginVerdict::Verified))
    }
}
