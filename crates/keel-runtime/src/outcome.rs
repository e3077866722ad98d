//! Per-resource mutation outcomes and their batch aggregation.

use serde::Serialize;

/// What happened to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// A conditional write was accepted.
    Applied,
    /// The live configuration already satisfied the action, or a guard
    /// declined to change it.
    Skipped { reason: String },
    /// A terminal error for this resource only.
    Failed { reason: String },
}

/// The final, immutable result of one action on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub resource_id: String,
    pub arn: String,
    pub action: &'static str,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Fetch/write cycles used, conflict restarts included.
    pub attempts: u32,
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, OutcomeStatus::Applied)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// Outcomes of one action over a selected resource set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub action: &'static str,
    pub outcomes: Vec<MutationOutcome>,
}

impl BatchReport {
    pub fn new(action: &'static str, mut outcomes: Vec<MutationOutcome>) -> Self {
        // Completion order is arbitrary; reports are not.
        outcomes.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        Self { action, outcomes }
    }

    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &MutationOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn get(&self, resource_id: &str) -> Option<&MutationOutcome> {
        self.outcomes.iter().find(|o| o.resource_id == resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, status: OutcomeStatus) -> MutationOutcome {
        MutationOutcome {
            resource_id: id.to_string(),
            arn: format!("arn:dist/{}", id),
            action: "disable",
            status,
            attempts: 1,
        }
    }

    #[test]
    fn test_report_counts_and_order() {
        let report = BatchReport::new(
            "disable",
            vec![
                outcome("E3", OutcomeStatus::Failed { reason: "boom".into() }),
                outcome("E1", OutcomeStatus::Applied),
                outcome("E2", OutcomeStatus::Skipped { reason: "already disabled".into() }),
            ],
        );
        assert_eq!((report.applied(), report.skipped(), report.failed()), (1, 1, 1));
        let ids: Vec<_> = report.outcomes.iter().map(|o| o.resource_id.as_str()).collect();
        assert_eq!(ids, ["E1", "E2", "E3"]);
        assert_eq!(report.failures().next().map(|o| o.resource_id.as_str()), Some("E3"));
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let value = serde_json::to_value(outcome(
            "E1",
            OutcomeStatus::Skipped {
                reason: "noop".into(),
            },
        ))
        .unwrap();
        assert_eq!(value["status"], "skipped");
        assert_eq!(value["reason"], "noop");
        assert_eq!(value["resource_id"], "E1");
    }
}
