use crate::outcome::{MutationOutcome, OutcomeStatus};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub policy: String,
    pub outcome: MutationOutcome,
}

/// Receives one event per mutation outcome.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Emits each outcome as a structured `tracing` event.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let outcome = &event.outcome;
        match &outcome.status {
            OutcomeStatus::Applied => tracing::info!(
                policy = %event.policy,
                action = outcome.action,
                resource_id = %outcome.resource_id,
                attempts = outcome.attempts,
                "mutated"
            ),
            OutcomeStatus::Skipped { reason } => tracing::info!(
                policy = %event.policy,
                action = outcome.action,
                resource_id = %outcome.resource_id,
                reason = %reason,
                "skipped"
            ),
            OutcomeStatus::Failed { reason } => tracing::warn!(
                policy = %event.policy,
                action = outcome.action,
                resource_id = %outcome.resource_id,
                arn = %outcome.arn,
                reason = %reason,
                "failed"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct CollectingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl CollectingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for CollectingAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
