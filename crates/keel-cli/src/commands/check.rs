//! `keel check` command implementation.
//!
//! Validates a policy file before it is run:
//! - Every filter and action is available for the policy's resource kind
//! - Policy names are unique
//! - Settings that widen what a policy touches are flagged
//! - An optional engine configuration loads and validates

use anyhow::{Context, Result};
use keel_core::{ActionDefinition, EngineConfig, FilterDefinition, PolicyFile};
use std::collections::HashSet;
use std::path::Path;

// ============================================================================
// Check Result Types
// ============================================================================

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Category of the check that produced this finding.
    pub category: String,
    pub message: String,
    /// Policy the finding is about, if any.
    pub policy: Option<String>,
}

impl CheckFinding {
    fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category: category.into(),
            message: message.into(),
            policy: None,
        }
    }

    fn warning(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category: category.into(),
            message: message.into(),
            policy: None,
        }
    }

    fn info(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            category: category.into(),
            message: message.into(),
            policy: None,
        }
    }

    fn in_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn add(&mut self, finding: CheckFinding) {
        self.findings.push(finding);
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Print human-readable summary.
    pub fn print_summary(&self) {
        let mut findings: Vec<_> = self.findings.iter().collect();
        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.category.cmp(&b.category))
        });

        if !findings.is_empty() {
            println!();
            println!("{}", "─".repeat(60));
            for finding in &findings {
                print_finding(finding);
            }
        }

        println!();
        println!("{}", "═".repeat(60));
        if findings.iter().all(|f| f.severity == Severity::Info) {
            println!("✅ All checks passed!");
        } else {
            println!(
                "Summary: {} error(s), {} warning(s)",
                self.error_count(),
                self.warning_count()
            );
        }
    }
}

fn print_finding(finding: &CheckFinding) {
    let icon = match finding.severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
        Severity::Info => "ℹ",
    };
    let policy = finding
        .policy
        .as_deref()
        .map(|p| format!(" [{}]", p))
        .unwrap_or_default();

    println!(
        "  {} {} [{}]{}: {}",
        icon, finding.severity, finding.category, policy, finding.message
    );
}

// ============================================================================
// Checks
// ============================================================================

/// Check every policy in `file`.
pub fn check_policies(file: &PolicyFile) -> CheckResults {
    let mut results = CheckResults::default();

    if file.policies.is_empty() {
        results.add(CheckFinding::warning("policies", "policy file defines no policies"));
    }

    let mut seen = HashSet::new();
    for policy in &file.policies {
        if !seen.insert(policy.name.as_str()) {
            results.add(
                CheckFinding::error("policies", "duplicate policy name").in_policy(&policy.name),
            );
        }

        if let Err(e) = keel_runtime::compile(policy) {
            results.add(CheckFinding::error("registry", e.to_string()).in_policy(&policy.name));
        }

        if policy.actions.is_empty() {
            results.add(
                CheckFinding::info("actions", "no actions; policy only selects")
                    .in_policy(&policy.name),
            );
        }

        for filter in &policy.filters {
            match filter {
                FilterDefinition::CheckS3Origin {
                    accounts_from: None,
                } => results.add(
                    CheckFinding::warning(
                        "filters",
                        "check-s3-origin without accounts_from accepts buckets of any owner",
                    )
                    .in_policy(&policy.name),
                ),
                FilterDefinition::Metrics {
                    days,
                    period: Some(period),
                    ..
                } if *period > u64::from(*days) * 86_400 => results.add(
                    CheckFinding::warning(
                        "filters",
                        format!("metrics period {}s exceeds the {}-day window", period, days),
                    )
                    .in_policy(&policy.name),
                ),
                _ => {}
            }
        }

        for action in &policy.actions {
            if let ActionDefinition::SetWaf { force: true, .. } = action {
                results.add(
                    CheckFinding::warning(
                        "actions",
                        "set-waf with force replaces existing web ACL associations",
                    )
                    .in_policy(&policy.name),
                );
            }
        }
    }

    results
}

/// Run all checks and print a summary.
pub fn run(policy_path: &Path, config_path: Option<&Path>) -> Result<()> {
    println!("🔍 Checking {}...", policy_path.display());

    let file = PolicyFile::from_file(policy_path)
        .with_context(|| format!("Failed to load policy file {}", policy_path.display()))?;
    let mut results = check_policies(&file);

    if let Some(config_path) = config_path {
        if let Err(e) = EngineConfig::from_file(config_path) {
            results.add(CheckFinding::error(
                "config",
                format!("{}: {}", config_path.display(), e),
            ));
        }
    }

    tracing::debug!(
        policies = file.policies.len(),
        findings = results.findings.len(),
        "Policy check complete"
    );
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!(
            "Policy check failed with {} error(s)",
            results.error_count()
        );
    }
    Ok(())
}
