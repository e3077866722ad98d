//! Predicates and filter chains.

use crate::context::{Requirement, SelectionContext};
use crate::error::PolicyError;
use crate::filters;
use async_trait::async_trait;
use keel_core::{FilterDefinition, Permission, Resource, ResourceKind};

/// A boolean test over a resource snapshot and the selection context.
#[async_trait]
pub trait Predicate: Send + Sync {
    /// The filter's `type` tag.
    fn name(&self) -> &'static str;

    /// Remote permissions the predicate needs.
    fn permissions(&self) -> Vec<Permission>;

    /// Context the predicate needs resolved before evaluation.
    fn requirements(&self) -> Vec<Requirement> {
        Vec::new()
    }

    /// Check the resolved context once, before any resource is evaluated.
    fn validate(&self, _ctx: &SelectionContext) -> Result<(), PolicyError> {
        Ok(())
    }

    /// Evaluate the predicate for one resource.
    async fn matches(&self, resource: &Resource, ctx: &SelectionContext)
        -> Result<bool, PolicyError>;
}

/// An ordered AND of predicates.
#[derive(Default)]
pub struct FilterChain {
    predicates: Vec<Box<dyn Predicate>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, predicate: Box<dyn Predicate>) {
        self.predicates.push(predicate);
    }

    /// Build a chain from policy definitions for `kind`.
    pub fn from_definitions(
        kind: ResourceKind,
        definitions: &[FilterDefinition],
    ) -> Result<Self, PolicyError> {
        let mut chain = Self::new();
        for definition in definitions {
            chain.push(filters::build_filter(kind, definition)?);
        }
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn requirements(&self) -> Vec<Requirement> {
        self.predicates
            .iter()
            .flat_map(|p| p.requirements())
            .collect()
    }

    pub fn permissions(&self) -> Vec<Permission> {
        self.predicates
            .iter()
            .flat_map(|p| p.permissions())
            .collect()
    }

    pub fn validate(&self, ctx: &SelectionContext) -> Result<(), PolicyError> {
        for predicate in &self.predicates {
            predicate.validate(ctx)?;
        }
        Ok(())
    }

    /// Return the resources that satisfy every predicate, in input order.
    ///
    /// Predicates run in declaration order; a resource is dropped at the
    /// first predicate it fails. Any predicate error aborts the pass.
    pub async fn select(
        &self,
        resources: Vec<Resource>,
        ctx: &SelectionContext,
    ) -> Result<Vec<Resource>, PolicyError> {
        self.validate(ctx)?;

        let total = resources.len();
        let mut remaining = resources;
        for predicate in &self.predicates {
            let mut kept = Vec::with_capacity(remaining.len());
            for resource in remaining {
                if predicate.matches(&resource, ctx).await? {
                    kept.push(resource);
                }
            }
            tracing::debug!(
                filter = predicate.name(),
                kept = kept.len(),
                "Filter applied"
            );
            remaining = kept;
        }

        tracing::info!(candidates = total, selected = remaining.len(), "Selection complete");
        Ok(remaining)
    }
}
