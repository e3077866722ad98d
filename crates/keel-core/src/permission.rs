//! Static permission declarations.
//!
//! Every filter and action declares the remote calls it makes so the caller
//! can run a dry-run permission check before anything executes.

use serde::Serialize;
use std::fmt;

/// Whether a permission only reads remote state or mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Read,
    Write,
}

/// A single remote permission, e.g. `cloudfront:UpdateDistribution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Permission {
    pub name: &'static str,
    pub access: Access,
}

impl Permission {
    pub const fn read(name: &'static str) -> Self {
        Self {
            name,
            access: Access::Read,
        }
    }

    pub const fn write(name: &'static str) -> Self {
        Self {
            name,
            access: Access::Write,
        }
    }

    pub fn is_mutating(&self) -> bool {
        self.access == Access::Write
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.access {
            Access::Read => write!(f, "{} (read)", self.name),
            Access::Write => write!(f, "{} (write)", self.name),
        }
    }
}
