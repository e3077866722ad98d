//! # keel-policy
//!
//! Resource selection for Keel.
//!
//! A selection pass resolves its [`SelectionContext`] once (external value
//! sets through the [`ExternalValueResolver`], name → identifier tables
//! through the [`CrossResourceLookup`]) and then evaluates an ordered
//! [`FilterChain`] of [`Predicate`]s over the candidate resources:
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌───────────────┐
//! │ Requirements │───▶│ SelectionContext │───▶│  FilterChain  │──▶ selected
//! └──────────────┘    └──────────────────┘    └───────────────┘
//!   values / lookups     resolved once           AND, in order
//! ```

pub mod context;
pub mod error;
pub mod filters;
pub mod lookup;
pub mod predicate;
pub mod values;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::{ContextBuilder, Requirement, SelectionContext};
pub use error::PolicyError;
pub use filters::{available_filters, build_filter};
pub use lookup::{CrossResourceLookup, LookupKind, ReferenceTable};
pub use predicate::{FilterChain, Predicate};
pub use values::{DefaultValueSource, ExternalValueResolver, FileValueSource, HttpValueSource};
