//! Bounded fan-out of per-resource work.

use crate::mutator::{Mutation, VersionedMutator};
use crate::outcome::{BatchReport, MutationOutcome};
use futures::stream::{self, StreamExt};
use keel_core::Resource;
use std::future::Future;

/// Run `f` once per item with at most `concurrency` calls in flight.
///
/// Every item is attempted exactly once; results come back in completion
/// order, which is unspecified. `f` is expected to fold its own failures
/// into `T` so that no item can cut the batch short.
pub async fn parallel_for_each<I, T, F, Fut>(items: I, concurrency: usize, f: F) -> Vec<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items)
        .map(f)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}

/// Applies one mutation across a selected resource set.
pub struct BatchExecutor {
    mutator: VersionedMutator,
    concurrency: usize,
}

impl BatchExecutor {
    pub fn new(mutator: VersionedMutator, concurrency: usize) -> Self {
        Self {
            mutator,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn execute(&self, resources: &[Resource], mutation: &dyn Mutation) -> BatchReport {
        tracing::info!(
            action = mutation.name(),
            resources = resources.len(),
            concurrency = self.concurrency,
            "Starting batch"
        );

        let outcomes: Vec<MutationOutcome> =
            parallel_for_each(resources, self.concurrency, |resource| {
                self.mutator.with_versioned_resource(resource, mutation)
            })
            .await;

        let report = BatchReport::new(mutation.name(), outcomes);
        tracing::info!(
            action = report.action,
            applied = report.applied(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Batch complete"
        );
        report
    }
}
