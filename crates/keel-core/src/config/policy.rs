//! Policy definitions.
//!
//! A policy names one resource kind, an ordered list of filters (combined
//! with AND) and an ordered list of actions applied to whatever the filters
//! select. Filters and actions are tagged by `type`:
//!
//! ```yaml
//! policies:
//!   - name: attach-waf
//!     resource: distribution
//!     filters:
//!       - type: waf-enabled
//!         state: false
//!     actions:
//!       - type: set-waf
//!         web-acl: edge-acl
//! ```

use super::ConfigError;
use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A file holding one or more policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub policies: Vec<PolicyDefinition>,
}

impl PolicyFile {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }
}

/// A single policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    pub name: String,
    pub resource: ResourceKind,
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
}

/// Filter definitions, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FilterDefinition {
    /// Is the resource associated with a web ACL (a given one, any, or none)?
    WafEnabled {
        /// Web ACL name or id. Absent means "any ACL".
        #[serde(rename = "web-acl", default, skip_serializing_if = "Option::is_none")]
        web_acl: Option<String>,
        #[serde(default)]
        state: bool,
    },

    /// Do the resource's object-storage origins exist and belong to an
    /// authorized owner?
    CheckS3Origin {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accounts_from: Option<ValuesFrom>,
    },

    /// Compare a metric statistic against a threshold.
    Metrics {
        /// Metric name, e.g. `Requests` or `4xxErrorRate`.
        name: String,
        #[serde(default = "default_statistic")]
        statistics: String,
        /// Size of the look-back window in days.
        #[serde(default = "default_days")]
        days: u32,
        /// Datapoint period in seconds; defaults to the whole window.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<u64>,
        value: f64,
        #[serde(default)]
        op: ComparisonOp,
    },
}

impl FilterDefinition {
    /// The definition's `type` tag.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::WafEnabled { .. } => "waf-enabled",
            Self::CheckS3Origin { .. } => "check-s3-origin",
            Self::Metrics { .. } => "metrics",
        }
    }
}

/// Action definitions, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionDefinition {
    /// Associate a web ACL.
    SetWaf {
        /// Web ACL name or id.
        #[serde(rename = "web-acl")]
        web_acl: String,
        /// Replace an existing, different association.
        #[serde(default)]
        force: bool,
    },

    /// Disable the resource.
    Disable,

    /// Enforce viewer/origin protocol settings.
    SetProtocols {
        #[serde(
            rename = "ViewerProtocolPolicy",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        viewer_protocol_policy: Option<ViewerProtocolPolicy>,
        #[serde(
            rename = "OriginProtocolPolicy",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        origin_protocol_policy: Option<OriginProtocolPolicy>,
        #[serde(
            rename = "OriginSslProtocols",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        origin_ssl_protocols: Option<Vec<SslProtocol>>,
    },
}

impl ActionDefinition {
    /// The definition's `type` tag.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::SetWaf { .. } => "set-waf",
            Self::Disable => "disable",
            Self::SetProtocols { .. } => "set-protocols",
        }
    }
}

/// Location and extraction expression of an external value list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValuesFrom {
    /// `file://`, bare path, or `http(s)://` URL.
    pub url: String,
    /// Document format; inferred from the URL extension when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ValuesFormat>,
    /// Field path selecting the values, e.g. `accounts[].canonical_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
}

impl ValuesFrom {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: None,
            expr: None,
        }
    }

    pub fn with_expr(mut self, expr: impl Into<String>) -> Self {
        self.expr = Some(expr.into());
        self
    }

    pub fn with_format(mut self, format: ValuesFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Declared format, or the one implied by the URL's extension.
    pub fn effective_format(&self) -> Option<ValuesFormat> {
        self.format.or_else(|| ValuesFormat::infer(&self.url))
    }
}

/// Supported external value document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuesFormat {
    Json,
    Yaml,
    Txt,
}

impl ValuesFormat {
    /// Infer the format from a URL's extension, ignoring any query string.
    pub fn infer(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let (_, ext) = path.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

/// Comparison operator for threshold filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    #[default]
    #[serde(alias = "ge")]
    Gte,
    Lt,
    #[serde(alias = "le")]
    Lte,
}

impl ComparisonOp {
    /// Evaluate `observed <op> threshold`.
    pub fn compare(&self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::Eq => observed == threshold,
            Self::Ne => observed != threshold,
            Self::Gt => observed > threshold,
            Self::Gte => observed >= threshold,
            Self::Lt => observed < threshold,
            Self::Lte => observed <= threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerProtocolPolicy {
    AllowAll,
    HttpsOnly,
    RedirectToHttps,
}

impl ViewerProtocolPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowAll => "allow-all",
            Self::HttpsOnly => "https-only",
            Self::RedirectToHttps => "redirect-to-https",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginProtocolPolicy {
    HttpOnly,
    MatchViewer,
    HttpsOnly,
}

impl OriginProtocolPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpOnly => "http-only",
            Self::MatchViewer => "match-viewer",
            Self::HttpsOnly => "https-only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SslProtocol {
    #[serde(rename = "SSLv3")]
    SslV3,
    #[serde(rename = "TLSv1")]
    TlsV1,
    #[serde(rename = "TLSv1.1")]
    TlsV1_1,
    #[serde(rename = "TLSv1.2")]
    TlsV1_2,
}

impl SslProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SslV3 => "SSLv3",
            Self::TlsV1 => "TLSv1",
            Self::TlsV1_1 => "TLSv1.1",
            Self::TlsV1_2 => "TLSv1.2",
        }
    }
}

fn default_statistic() -> String {
    "Average".to_string()
}

fn default_days() -> u32 {
    5
}
