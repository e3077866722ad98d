//! Built-in filters and their per-kind registry.

pub mod metrics;
pub mod s3_origin;
pub mod waf;

pub use metrics::{MetricThreshold, MAX_WINDOW_DAYS};
pub use s3_origin::{OriginCheck, OriginPredicate, OriginVerdict};
pub use waf::AssociationPredicate;

use crate::error::PolicyError;
use crate::predicate::Predicate;
use keel_core::{FilterDefinition, ResourceKind};

/// Filter type tags available for `kind`, in registration order.
pub fn available_filters(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Distribution => &["waf-enabled", "check-s3-origin", "metrics"],
        ResourceKind::StreamingDistribution => &["metrics"],
    }
}

/// Instantiate the predicate for `definition` on resources of `kind`.
pub fn build_filter(
    kind: ResourceKind,
    definition: &FilterDefinition,
) -> Result<Box<dyn Predicate>, PolicyError> {
    let type_tag = definition.type_tag();
    if !available_filters(kind).contains(&type_tag) {
        return Err(PolicyError::UnsupportedForKind { type_tag, kind });
    }

    let predicate: Box<dyn Predicate> = match definition {
        FilterDefinition::WafEnabled { web_acl, state } => {
            Box::new(AssociationPredicate::new(web_acl.clone(), *state))
        }
        FilterDefinition::CheckS3Origin { accounts_from } => {
            Box::new(OriginPredicate::new(accounts_from.clone()))
        }
        FilterDefinition::Metrics {
            name,
            statistics,
            days,
            period,
            value,
            op,
        } => {
            if *days == 0 {
                return Err(PolicyError::InvalidDefinition {
                    type_tag,
                    reason: "days must be at least 1".to_string(),
                });
            }
            if *days > MAX_WINDOW_DAYS {
                return Err(PolicyError::InvalidDefinition {
                    type_tag,
                    reason: format!("days must be at most {}, got {}", MAX_WINDOW_DAYS, days),
                });
            }
            if *period == Some(0) {
                return Err(PolicyError::InvalidDefinition {
                    type_tag,
                    reason: "period must be at least 1 second".to_string(),
                });
            }
            Box::new(MetricThreshold {
                metric: name.clone(),
                statistic: statistics.clone(),
                days: *days,
                period_secs: *period,
                threshold: *value,
                op: *op,
            })
        }
    };
    Ok(predicate)
}
