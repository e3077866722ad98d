use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::batch::BatchExecutor;
use crate::error::EngineError;
use crate::mutator::{Mutation, VersionedMutator};
use crate::outcome::BatchReport;
use crate::registry;
use chrono::{DateTime, Utc};
use keel_core::{Collaborators, EngineConfig, PolicyDefinition, Resource, ResourceKind, RetryPolicy};
use keel_policy::{ContextBuilder, SelectionContext};
use serde::Serialize;
use std::sync::Arc;

/// Result of running one policy.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub policy: String,
    pub resource_kind: ResourceKind,
    pub candidates: usize,
    /// Ids of the resources every filter matched, in input order.
    pub selected: Vec<String>,
    pub actions: Vec<BatchReport>,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.actions.iter().map(BatchReport::failed).sum()
    }

    pub fn applied(&self) -> usize {
        self.actions.iter().map(BatchReport::applied).sum()
    }
}

/// Runs policies end to end: resolve, select, mutate.
pub struct PolicyRunner {
    collaborators: Collaborators,
    config: EngineConfig,
    audit: Arc<dyn AuditSink>,
    evaluated_at: Option<DateTime<Utc>>,
}

impl PolicyRunner {
    pub fn new(collaborators: Collaborators, config: EngineConfig) -> Self {
        Self {
            collaborators,
            config,
            audit: Arc::new(TracingAuditSink),
            evaluated_at: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Pin the time metric windows end at.
    pub fn with_evaluated_at(mut self, at: DateTime<Utc>) -> Self {
        self.evaluated_at = Some(at);
        self
    }

    /// Run `policy` over the enumerated `resources`.
    ///
    /// Configuration problems (unsupported filters or actions, unreachable
    /// value sources, unknown references) fail the run before any write.
    /// Per-resource failures are reported in the returned [`RunReport`].
    pub async fn run(
        &self,
        policy: &PolicyDefinition,
        resources: Vec<Resource>,
    ) -> Result<RunReport, EngineError> {
        let compiled = registry::compile(policy)?;
        if let Some(stray) = resources.iter().find(|r| r.kind != compiled.kind) {
            return Err(EngineError::KindMismatch {
                resource_id: stray.id.clone(),
                expected: compiled.kind,
                actual: stray.kind,
            });
        }

        let retry = RetryPolicy::new(self.config.retry.clone());
        let ctx = self.context(compiled.requirements(), retry.clone()).await?;

        compiled.filters.validate(&ctx)?;
        let mutations = compiled
            .actions
            .iter()
            .map(|action| action.prepare(&ctx))
            .collect::<Result<Vec<Arc<dyn Mutation>>, _>>()?;

        let candidates = resources.len();
        let selected = compiled.filters.select(resources, &ctx).await?;
        tracing::info!(
            policy = %compiled.name,
            candidates,
            selected = selected.len(),
            "Policy selection complete"
        );

        let executor = BatchExecutor::new(
            VersionedMutator::new(
                self.collaborators.config.clone(),
                retry,
                self.config.conflict_attempts,
            ),
            self.config.concurrency,
        );

        let mut reports = Vec::with_capacity(mutations.len());
        for mutation in &mutations {
            let report = executor.execute(&selected, mutation.as_ref()).await;
            for outcome in &report.outcomes {
                self.audit.record(AuditEvent {
                    policy: compiled.name.clone(),
                    outcome: outcome.clone(),
                });
            }
            reports.push(report);
        }

        Ok(RunReport {
            policy: compiled.name,
            resource_kind: compiled.kind,
            candidates,
            selected: selected.into_iter().map(|r| r.id).collect(),
            actions: reports,
        })
    }

    async fn context(
        &self,
        requirements: Vec<keel_policy::Requirement>,
        retry: RetryPolicy,
    ) -> Result<SelectionContext, EngineError> {
        let mut builder = ContextBuilder::new(self.collaborators.clone())
            .retry(retry)
            .require_all(requirements);
        if let Some(at) = self.evaluated_at {
            builder = builder.evaluated_at(at);
        }
        Ok(builder.build().await?)
    }
}
