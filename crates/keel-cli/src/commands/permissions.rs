//! `keel permissions` command implementation.
//!
//! Prints the static permission declaration of each policy, split into
//! read-only and mutating permissions.

use anyhow::{Context, Result};
use keel_core::{Permission, PolicyFile};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct PolicyPermissions {
    pub policy: String,
    pub read: Vec<&'static str>,
    pub write: Vec<&'static str>,
}

impl PolicyPermissions {
    fn new(policy: &str, permissions: Vec<Permission>) -> Self {
        let (write, read): (Vec<_>, Vec<_>) =
            permissions.into_iter().partition(Permission::is_mutating);
        Self {
            policy: policy.to_string(),
            read: read.into_iter().map(|p| p.name).collect(),
            write: write.into_iter().map(|p| p.name).collect(),
        }
    }
}

/// Collect permissions for every policy in `file`, or only `only`.
pub fn collect(file: &PolicyFile, only: Option<&str>) -> Result<Vec<PolicyPermissions>> {
    let selected: Vec<_> = file
        .policies
        .iter()
        .filter(|p| only.is_none_or(|name| p.name == name))
        .collect();

    if let Some(name) = only {
        if selected.is_empty() {
            anyhow::bail!("no policy named '{}'", name);
        }
    }

    selected
        .into_iter()
        .map(|policy| {
            let permissions = keel_runtime::permissions(policy)
                .with_context(|| format!("policy '{}'", policy.name))?;
            Ok(PolicyPermissions::new(&policy.name, permissions))
        })
        .collect()
}

pub fn run(path: &Path, only: Option<&str>, json: bool) -> Result<()> {
    let file = PolicyFile::from_file(path)
        .with_context(|| format!("Failed to load policy file {}", path.display()))?;
    let report = collect(&file, only)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for entry in &report {
        println!("{}", entry.policy);
        for name in &entry.read {
            println!("  read   {}", name);
        }
        for name in &entry.write {
            println!("  write  {}", name);
        }
    }
    Ok(())
}
