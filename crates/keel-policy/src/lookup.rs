//! Cross-resource lookups.
//!
//! Translates human-friendly references (e.g. a web ACL's name) into the
//! canonical identifiers the remote service stores on governed resources.

use crate::error::PolicyError;
use keel_core::{Permission, RetryPolicy, SiblingEnumerator};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Static description of a sibling collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LookupKind {
    /// Collection tag passed to the enumerator.
    pub tag: &'static str,
    /// Record field holding the human-friendly name.
    pub name_field: &'static str,
    /// Record field holding the canonical identifier.
    pub id_field: &'static str,
    /// Permission needed to enumerate the collection.
    pub permission: Permission,
}

impl LookupKind {
    /// Web ACLs, referenced from distributions by `WebACLId`.
    pub const WEB_ACL: LookupKind = LookupKind {
        tag: "waf",
        name_field: "Name",
        id_field: "WebACLId",
        permission: Permission::read("waf:ListWebACLs"),
    };
}

/// A name → identifier table for one sibling collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    kind: String,
    by_name: BTreeMap<String, String>,
    ids: BTreeSet<String>,
}

impl ReferenceTable {
    /// Build a table from `(name, id)` pairs.
    pub fn from_pairs<N, I>(kind: &str, pairs: impl IntoIterator<Item = (N, I)>) -> Self
    where
        N: Into<String>,
        I: Into<String>,
    {
        let mut table = Self {
            kind: kind.to_string(),
            ..Self::default()
        };
        for (name, id) in pairs {
            let id = id.into();
            table.ids.insert(id.clone());
            table.by_name.insert(name.into(), id);
        }
        table
    }

    /// Build a table from enumerated records. Records lacking either field
    /// are skipped.
    pub fn from_records(kind: LookupKind, records: &[Value]) -> Self {
        let pairs = records.iter().filter_map(|record| {
            let name = record.get(kind.name_field)?.as_str()?;
            let id = record.get(kind.id_field)?.as_str()?;
            Some((name.to_string(), id.to_string()))
        });
        Self::from_pairs(kind.tag, pairs)
    }

    /// Resolve a name or identifier to an identifier.
    ///
    /// An input that already is a known identifier is returned unchanged;
    /// otherwise it is looked up by name. Anything else is an
    /// [`PolicyError::UnknownReference`].
    pub fn resolve(&self, name_or_id: &str) -> Result<String, PolicyError> {
        if self.ids.contains(name_or_id) {
            return Ok(name_or_id.to_string());
        }
        self.by_name
            .get(name_or_id)
            .cloned()
            .ok_or_else(|| PolicyError::unknown_reference(&self.kind, name_or_id))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Enumerates sibling collections into [`ReferenceTable`]s.
#[derive(Clone)]
pub struct CrossResourceLookup {
    siblings: Arc<dyn SiblingEnumerator>,
    retry: RetryPolicy,
}

impl CrossResourceLookup {
    pub fn new(siblings: Arc<dyn SiblingEnumerator>, retry: RetryPolicy) -> Self {
        Self { siblings, retry }
    }

    /// Enumerate the full current collection and build its table.
    pub async fn load(&self, kind: LookupKind) -> Result<ReferenceTable, PolicyError> {
        let records = self
            .retry
            .run(kind.tag, || self.siblings.list(kind.tag))
            .await
            .map_err(|source| PolicyError::LookupFailed {
                kind: kind.tag.to_string(),
                source,
            })?;

        let table = ReferenceTable::from_records(kind, &records);
        tracing::debug!(kind = kind.tag, entries = table.len(), "Loaded reference table");
        Ok(table)
    }
}
