//! `waf-enabled`: association-state predicate.

use crate::context::{Requirement, SelectionContext};
use crate::error::PolicyError;
use crate::lookup::LookupKind;
use crate::predicate::Predicate;
use async_trait::async_trait;
use keel_core::{Permission, Resource};

const ASSOCIATION_FIELD: &str = "WebACLId";

/// Matches resources by their web ACL association.
///
/// | state | target | matches when                         |
/// |-------|--------|--------------------------------------|
/// | true  | none   | any association                      |
/// | false | none   | no association                       |
/// | true  | `T`    | associated with exactly `T`          |
/// | false | `T`    | not associated with `T` (or nothing) |
#[derive(Debug, Clone)]
pub struct AssociationPredicate {
    target: Option<String>,
    state: bool,
}

impl AssociationPredicate {
    pub fn new(target: Option<String>, state: bool) -> Self {
        Self { target, state }
    }

    /// The truth table, over an already-resolved target identifier.
    pub fn evaluate(state: bool, target: Option<&str>, current: Option<&str>) -> bool {
        match (state, target) {
            (true, None) => current.is_some(),
            (false, None) => current.is_none(),
            (true, Some(target)) => current == Some(target),
            (false, Some(target)) => current != Some(target),
        }
    }

    fn resolved_target(&self, ctx: &SelectionContext) -> Result<Option<String>, PolicyError> {
        match &self.target {
            None => Ok(None),
            Some(target) => ctx.lookup(LookupKind::WEB_ACL)?.resolve(target).map(Some),
        }
    }
}

#[async_trait]
impl Predicate for AssociationPredicate {
    fn name(&self) -> &'static str {
        "waf-enabled"
    }

    fn permissions(&self) -> Vec<Permission> {
        vec![LookupKind::WEB_ACL.permission]
    }

    fn requirements(&self) -> Vec<Requirement> {
        match self.target {
            Some(_) => vec![Requirement::Lookup(LookupKind::WEB_ACL)],
            None => Vec::new(),
        }
    }

    fn validate(&self, ctx: &SelectionContext) -> Result<(), PolicyError> {
        self.resolved_target(ctx).map(|_| ())
    }

    async fn matches(
        &self,
        resource: &Resource,
        ctx: &SelectionContext,
    ) -> Result<bool, PolicyError> {
        let target = self.resolved_target(ctx)?;
        Ok(Self::evaluate(
            self.state,
            target.as_deref(),
            resource.non_empty_str(ASSOCIATION_FIELD),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use crate::test_support::{collaborators, Siblings};
    use keel_core::ResourceKind;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_truth_table() {
        // No association, state=false, no target.
        assert!(AssociationPredicate::evaluate(false, None, None));
        // Associated with X, state=true, target X.
        assert!(AssociationPredicate::evaluate(true, Some("X"), Some("X")));
        // Associated with Y, state=true, target X.
        assert!(!AssociationPredicate::evaluate(true, Some("X"), Some("Y")));
        // Associated with Y, state=false, target X.
        assert!(AssociationPredicate::evaluate(false, Some("X"), Some("Y")));

        assert!(AssociationPredicate::evaluate(true, None, Some("Y")));
        assert!(!AssociationPredicate::evaluate(true, None, None));
        assert!(!AssociationPredicate::evaluate(false, None, Some("Y")));
        assert!(!AssociationPredicate::evaluate(false, Some("X"), Some("X")));
        assert!(AssociationPredicate::evaluate(false, Some("X"), None));
    }

    fn distribution(id: &str, acl: &str) -> Resource {
        Resource::from_snapshot(
            ResourceKind::Distribution,
            json!({"Id": id, "ARN": format!("arn:dist/{}", id), "WebACLId": acl}),
        )
        .unwrap()
    }

    async fn context() -> SelectionContext {
        let mut collaborators = collaborators();
        collaborators.siblings = Arc::new(Siblings {
            records: vec![
                json!({"Name": "acl-a", "WebACLId": "id-123"}),
                json!({"Name": "acl-b", "WebACLId": "id-456"}),
            ],
            ..Siblings::default()
        });
        ContextBuilder::new(collaborators)
            .require(Requirement::Lookup(LookupKind::WEB_ACL))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_matches_resolves_target_by_name() {
        let ctx = context().await;
        let predicate = AssociationPredicate::new(Some("acl-a".into()), true);

        assert!(predicate.matches(&distribution("E1", "id-123"), &ctx).await.unwrap());
        assert!(!predicate.matches(&distribution("E2", "id-456"), &ctx).await.unwrap());
        assert!(!predicate.matches(&distribution("E3", ""), &ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_association_is_none() {
        let ctx = context().await;
        let predicate = AssociationPredicate::new(None, false);
        assert!(predicate.matches(&distribution("E1", ""), &ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_target_fails_validation() {
        let ctx = context().await;
        let predicate = AssociationPredicate::new(Some("acl-z".into()), true);
        assert!(matches!(
            predicate.validate(&ctx),
            Err(PolicyError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_lookup_only_required_with_target() {
        assert!(AssociationPredicate::new(None, true).requirements().is_empty());
        assert_eq!(
            AssociationPredicate::new(Some("acl-a".into()), true).requirements(),
            vec![Requirement::Lookup(LookupKind::WEB_ACL)]
        );
    }
}
