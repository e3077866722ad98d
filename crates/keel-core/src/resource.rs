//! Resource snapshots and resource-kind models.

use crate::error::ResourceError;
use crate::path::FieldPath;
use crate::permission::Permission;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The kinds of remotely-managed resources the engine governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// A content-delivery distribution.
    Distribution,
    /// A streaming (RTMP) distribution.
    StreamingDistribution,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [
        ResourceKind::Distribution,
        ResourceKind::StreamingDistribution,
    ];

    /// The kind's tag as used in policy definitions.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Distribution => "distribution",
            Self::StreamingDistribution => "streaming-distribution",
        }
    }

    /// Metric dimension carrying the resource identifier.
    pub fn metric_dimension(&self) -> &'static str {
        "DistributionId"
    }

    /// Metrics namespace for this kind.
    pub fn metrics_namespace(&self) -> &'static str {
        "AWS/CloudFront"
    }

    /// Global kinds report metrics under `Region=Global` instead of a region.
    pub fn is_global(&self) -> bool {
        true
    }

    /// Permission to read the current configuration and its version token.
    pub fn read_config_permission(&self) -> Permission {
        match self {
            Self::Distribution => Permission::read("cloudfront:GetDistributionConfig"),
            Self::StreamingDistribution => {
                Permission::read("cloudfront:GetStreamingDistributionConfig")
            }
        }
    }

    /// Permission to write a configuration back.
    pub fn update_config_permission(&self) -> Permission {
        match self {
            Self::Distribution => Permission::write("cloudfront:UpdateDistribution"),
            Self::StreamingDistribution => {
                Permission::write("cloudfront:UpdateStreamingDistribution")
            }
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| format!("unknown resource kind '{}'", s))
    }
}

/// A resource as supplied by the enumeration step.
///
/// The snapshot is read-only input for predicates. Mutations never trust it:
/// they re-read the live configuration and version token before writing.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub id: String,
    pub arn: String,
    pub tags: BTreeMap<String, String>,
    /// Full enumeration snapshot, including `Id` and `ARN`.
    pub attributes: Value,
}

impl Resource {
    /// Build a resource from an enumeration snapshot.
    ///
    /// `Id` and `ARN` are required; `Tags` is optional and may be a list of
    /// `{"Key", "Value"}` pairs.
    pub fn from_snapshot(kind: ResourceKind, snapshot: Value) -> Result<Self, ResourceError> {
        let map = snapshot.as_object().ok_or(ResourceError::NotAnObject)?;
        let id = map
            .get("Id")
            .and_then(Value::as_str)
            .ok_or(ResourceError::MissingField("Id"))?
            .to_string();
        let arn = map
            .get("ARN")
            .and_then(Value::as_str)
            .ok_or(ResourceError::MissingField("ARN"))?
            .to_string();

        let tags = map
            .get("Tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|tag| {
                        let key = tag.get("Key")?.as_str()?;
                        let value = tag.get("Value").and_then(Value::as_str).unwrap_or("");
                        Some((key.to_string(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            kind,
            id,
            arn,
            tags,
            attributes: snapshot,
        })
    }

    /// Top-level snapshot attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Top-level string attribute, treating empty strings as absent.
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.attribute(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Every snapshot value addressed by `path`.
    pub fn select(&self, path: &FieldPath) -> Vec<&Value> {
        path.select(&self.attributes)
    }
}
