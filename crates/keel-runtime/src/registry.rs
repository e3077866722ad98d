//! Static registry of actions per resource kind, and policy compilation.

use crate::actions::{Action, Disable, SetProtocols, SetWaf};
use crate::error::EngineError;
use keel_core::{ActionDefinition, Permission, PolicyDefinition, ResourceKind};
use keel_policy::{FilterChain, Requirement};
use std::collections::BTreeSet;

/// Action type tags available for `kind`, in registration order.
pub fn available_actions(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Distribution => &["set-waf", "disable", "set-protocols"],
        ResourceKind::StreamingDistribution => &["disable"],
    }
}

/// Instantiate the action for `definition` on resources of `kind`.
pub fn build_action(
    kind: ResourceKind,
    definition: &ActionDefinition,
) -> Result<Box<dyn Action>, EngineError> {
    let type_tag = definition.type_tag();
    if !available_actions(kind).contains(&type_tag) {
        return Err(EngineError::UnsupportedForKind { type_tag, kind });
    }

    let action: Box<dyn Action> = match definition {
        ActionDefinition::SetWaf { web_acl, force } => {
            Box::new(SetWaf::new(kind, web_acl.clone(), *force))
        }
        ActionDefinition::Disable => Box::new(Disable::new(kind)),
        ActionDefinition::SetProtocols {
            viewer_protocol_policy,
            origin_protocol_policy,
            origin_ssl_protocols,
        } => Box::new(SetProtocols::new(
            kind,
            *viewer_protocol_policy,
            *origin_protocol_policy,
            origin_ssl_protocols.as_deref(),
        )?),
    };
    Ok(action)
}

/// A policy with its filters and actions instantiated for its resource kind.
pub struct CompiledPolicy {
    pub name: String,
    pub kind: ResourceKind,
    pub filters: FilterChain,
    pub actions: Vec<Box<dyn Action>>,
}

impl CompiledPolicy {
    /// Every context requirement of every filter and action.
    pub fn requirements(&self) -> Vec<Requirement> {
        let mut requirements = self.filters.requirements();
        for action in &self.actions {
            requirements.extend(action.requirements());
        }
        requirements
    }

    /// Deduplicated, ordered permissions of every filter and action.
    pub fn permissions(&self) -> Vec<Permission> {
        let mut permissions: BTreeSet<Permission> =
            self.filters.permissions().into_iter().collect();
        for action in &self.actions {
            permissions.extend(action.permissions());
        }
        permissions.into_iter().collect()
    }
}

/// Instantiate a policy against the registry.
///
/// Fails on the first filter or action not available for the policy's kind.
pub fn compile(policy: &PolicyDefinition) -> Result<CompiledPolicy, EngineError> {
    let filters = FilterChain::from_definitions(policy.resource, &policy.filters)?;
    let actions = policy
        .actions
        .iter()
        .map(|definition| build_action(policy.resource, definition))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledPolicy {
        name: policy.name.clone(),
        kind: policy.resource,
        filters,
        actions,
    })
}

/// The static permission declaration for `policy`.
pub fn permissions(policy: &PolicyDefinition) -> Result<Vec<Permission>, EngineError> {
    Ok(compile(policy)?.permissions())
}
