//! # keel-runtime
//!
//! Mutation side of Keel: conditional read-modify-write of a single resource
//! ([`VersionedMutator`]), bounded fan-out across a selection
//! ([`BatchExecutor`]), the built-in actions and their per-kind registry, and
//! the [`PolicyRunner`] that ties selection and mutation together.

pub mod actions;
pub mod audit;
pub mod batch;
pub mod error;
pub mod mutator;
pub mod orchestrator;
pub mod outcome;
pub mod registry;

pub use actions::Action;
pub use audit::{AuditEvent, AuditSink, CollectingAuditSink, TracingAuditSink};
pub use batch::{parallel_for_each, BatchExecutor};
pub use error::EngineError;
pub use mutator::{Mutation, Plan, VersionedMutator};
pub use orchestrator::{PolicyRunner, RunReport};
pub use outcome::{BatchReport, MutationOutcome, OutcomeStatus};
pub use registry::{compile, permissions, CompiledPolicy};
