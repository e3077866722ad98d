//! Selection context.
//!
//! Everything a filter pass needs from outside the candidate resources is
//! resolved up front, exactly once per distinct requirement, and then shared
//! read-only by every predicate and every worker task.

use crate::error::PolicyError;
use crate::lookup::{CrossResourceLookup, LookupKind, ReferenceTable};
use crate::values::ExternalValueResolver;
use chrono::{DateTime, Utc};
use keel_core::{Collaborators, RetryPolicy, ValuesFrom};
use std::collections::{BTreeMap, BTreeSet};

/// Something a predicate or action needs resolved before evaluation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Requirement {
    /// An external value set.
    Values(ValuesFrom),
    /// A sibling name → identifier table.
    Lookup(LookupKind),
}

/// Immutable per-pass context.
pub struct SelectionContext {
    evaluated_at: DateTime<Utc>,
    values: BTreeMap<ValuesFrom, BTreeSet<String>>,
    lookups: BTreeMap<&'static str, ReferenceTable>,
    collaborators: Collaborators,
    retry: RetryPolicy,
}

impl SelectionContext {
    pub fn builder(collaborators: Collaborators) -> ContextBuilder {
        ContextBuilder::new(collaborators)
    }

    /// Time the pass started; metric windows end here.
    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    /// The resolved value set for `from`.
    pub fn values(&self, from: &ValuesFrom) -> Result<&BTreeSet<String>, PolicyError> {
        self.values
            .get(from)
            .ok_or_else(|| PolicyError::MissingContext(format!("values from '{}'", from.url)))
    }

    /// The resolved reference table for `kind`.
    pub fn lookup(&self, kind: LookupKind) -> Result<&ReferenceTable, PolicyError> {
        self.lookups
            .get(kind.tag)
            .ok_or_else(|| PolicyError::MissingContext(format!("{} lookup", kind.tag)))
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Collects requirements and resolves them into a [`SelectionContext`].
pub struct ContextBuilder {
    collaborators: Collaborators,
    retry: RetryPolicy,
    evaluated_at: Option<DateTime<Utc>>,
    requirements: BTreeSet<Requirement>,
}

impl ContextBuilder {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            retry: RetryPolicy::default(),
            evaluated_at: None,
            requirements: BTreeSet::new(),
        }
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pin the evaluation time instead of using the current time.
    pub fn evaluated_at(mut self, at: DateTime<Utc>) -> Self {
        self.evaluated_at = Some(at);
        self
    }

    pub fn require(mut self, requirement: Requirement) -> Self {
        self.requirements.insert(requirement);
        self
    }

    pub fn require_all(mut self, requirements: impl IntoIterator<Item = Requirement>) -> Self {
        self.requirements.extend(requirements);
        self
    }

    /// Resolve every distinct requirement once.
    ///
    /// The first failure aborts the build; no partially-resolved context is
    /// ever handed out.
    pub async fn build(self) -> Result<SelectionContext, PolicyError> {
        let resolver = ExternalValueResolver::new(self.collaborators.values.clone());
        let lookup =
            CrossResourceLookup::new(self.collaborators.siblings.clone(), self.retry.clone());

        let mut values = BTreeMap::new();
        let mut lookups = BTreeMap::new();

        for requirement in self.requirements {
            match requirement {
                Requirement::Values(from) => {
                    let set = resolver.resolve(&from).await?;
                    values.insert(from, set);
                }
                Requirement::Lookup(kind) => {
                    let table = lookup.load(kind).await?;
                    lookups.insert(kind.tag, table);
                }
            }
        }

        tracing::debug!(
            value_sets = values.len(),
            lookups = lookups.len(),
            "Selection context resolved"
        );

        Ok(SelectionContext {
            evaluated_at: self.evaluated_at.unwrap_or_else(Utc::now),
            values,
            lookups,
            collaborators: self.collaborators,
            retry: self.retry,
        })
    }
}
