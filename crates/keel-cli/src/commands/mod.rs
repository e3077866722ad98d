//! CLI command implementations for Keel.

pub mod check;
pub mod permissions;
