//! Built-in actions.
//!
//! An [`Action`] is the policy-level definition: it declares permissions and
//! context requirements, and is prepared once against the resolved
//! [`SelectionContext`]. Preparation yields the [`Mutation`] that the batch
//! executor applies per resource. Reference resolution happens during
//! preparation, so an unknown reference aborts the run before any write.

use crate::mutator::{Mutation, Plan};
use keel_core::config::{OriginProtocolPolicy, SslProtocol, ViewerProtocolPolicy};
use keel_core::{FieldPath, Patch, Permission, ResourceKind};
use keel_policy::{LookupKind, PolicyError, Requirement, SelectionContext};
use serde_json::Value;
use std::sync::Arc;

pub trait Action: Send + Sync {
    /// The action's `type` tag.
    fn name(&self) -> &'static str;

    fn permissions(&self) -> Vec<Permission>;

    fn requirements(&self) -> Vec<Requirement> {
        Vec::new()
    }

    /// Resolve everything the mutation needs from the context.
    fn prepare(&self, ctx: &SelectionContext) -> Result<Arc<dyn Mutation>, PolicyError>;
}

fn config_permissions(kind: ResourceKind) -> Vec<Permission> {
    vec![kind.read_config_permission(), kind.update_config_permission()]
}

fn path(expr: &str, type_tag: &'static str) -> Result<FieldPath, PolicyError> {
    FieldPath::parse(expr).map_err(|e| PolicyError::InvalidDefinition {
        type_tag,
        reason: e.to_string(),
    })
}

// ============================================================================
// set-waf
// ============================================================================

const WEB_ACL_FIELD: &str = "WebACLId";

/// Associates a web ACL, by name or id.
pub struct SetWaf {
    kind: ResourceKind,
    web_acl: String,
    force: bool,
}

impl SetWaf {
    pub fn new(kind: ResourceKind, web_acl: impl Into<String>, force: bool) -> Self {
        Self {
            kind,
            web_acl: web_acl.into(),
            force,
        }
    }
}

impl Action for SetWaf {
    fn name(&self) -> &'static str {
        "set-waf"
    }

    fn permissions(&self) -> Vec<Permission> {
        let mut permissions = config_permissions(self.kind);
        permissions.push(LookupKind::WEB_ACL.permission);
        permissions
    }

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::Lookup(LookupKind::WEB_ACL)]
    }

    fn prepare(&self, ctx: &SelectionContext) -> Result<Arc<dyn Mutation>, PolicyError> {
        let target = ctx.lookup(LookupKind::WEB_ACL)?.resolve(&self.web_acl)?;
        Ok(Arc::new(SetWafMutation {
            target,
            force: self.force,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct SetWafMutation {
    target: String,
    force: bool,
}

impl Mutation for SetWafMutation {
    fn name(&self) -> &'static str {
        "set-waf"
    }

    fn plan(&self, current: &Value) -> Plan {
        let associated = current
            .get(WEB_ACL_FIELD)
            .and_then(Value::as_str)
            .filter(|acl| !acl.is_empty());

        match associated {
            Some(acl) if acl == self.target => {
                Plan::Skip(format!("already associated with {}", acl))
            }
            Some(acl) if !self.force => {
                Plan::Skip(format!("associated with {} and force is not set", acl))
            }
            _ => Plan::Patch(Patch::new().set(FieldPath::key(WEB_ACL_FIELD), self.target.as_str())),
        }
    }
}

// ============================================================================
// disable
// ============================================================================

pub struct Disable {
    kind: ResourceKind,
}

impl Disable {
    pub fn new(kind: ResourceKind) -> Self {
        Self { kind }
    }
}

impl Action for Disable {
    fn name(&self) -> &'static str {
        "disable"
    }

    fn permissions(&self) -> Vec<Permission> {
        config_permissions(self.kind)
    }

    fn prepare(&self, _ctx: &SelectionContext) -> Result<Arc<dyn Mutation>, PolicyError> {
        Ok(Arc::new(DisableMutation))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DisableMutation;

impl Mutation for DisableMutation {
    fn name(&self) -> &'static str {
        "disable"
    }

    fn plan(&self, current: &Value) -> Plan {
        if current.get("Enabled") == Some(&Value::Bool(false)) {
            return Plan::Skip("already disabled".to_string());
        }
        Plan::Patch(Patch::new().set(FieldPath::key("Enabled"), false))
    }
}

// ============================================================================
// set-protocols
// ============================================================================

/// Enforces viewer and origin protocol settings.
pub struct SetProtocols {
    kind: ResourceKind,
    patch: Patch,
}

impl SetProtocols {
    pub fn new(
        kind: ResourceKind,
        viewer: Option<ViewerProtocolPolicy>,
        origin: Option<OriginProtocolPolicy>,
        ssl_protocols: Option<&[SslProtocol]>,
    ) -> Result<Self, PolicyError> {
        const TAG: &str = "set-protocols";

        let mut patch = Patch::new();
        if let Some(viewer) = viewer {
            patch = patch
                .set(path("DefaultCacheBehavior.ViewerProtocolPolicy", TAG)?, viewer.as_str())
                .set(
                    path("CacheBehaviors.Items[].ViewerProtocolPolicy", TAG)?,
                    viewer.as_str(),
                );
        }
        if let Some(origin) = origin {
            patch = patch.set(
                path("Origins.Items[].CustomOriginConfig.OriginProtocolPolicy", TAG)?,
                origin.as_str(),
            );
        }
        if let Some(protocols) = ssl_protocols {
            patch = patch.set_counted(
                path("Origins.Items[].CustomOriginConfig.OriginSslProtocols", TAG)?,
                protocols.iter().map(|p| Value::from(p.as_str())).collect(),
            );
        }

        if patch.is_empty() {
            return Err(PolicyError::InvalidDefinition {
                type_tag: TAG,
                reason: "at least one protocol setting is required".to_string(),
            });
        }
        Ok(Self { kind, patch })
    }
}

impl Action for SetProtocols {
    fn name(&self) -> &'static str {
        "set-protocols"
    }

    fn permissions(&self) -> Vec<Permission> {
        config_permissions(self.kind)
    }

    fn prepare(&self, _ctx: &SelectionContext) -> Result<Arc<dyn Mutation>, PolicyError> {
        Ok(Arc::new(PatchMutation {
            name: "set-protocols",
            patch: self.patch.clone(),
        }))
    }
}

/// A fixed patch; the mutator skips it when it changes nothing.
#[derive(Debug, Clone)]
pub struct PatchMutation {
    name: &'static str,
    patch: Patch,
}

impl Mutation for PatchMutation {
    fn name(&self) -> &'static str {
        self.name
    }

    fn plan(&self, _current: &Value) -> Plan {
        Plan::Patch(self.patch.clone())
    }
}
