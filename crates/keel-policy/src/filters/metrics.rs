//! `metrics`: metric-threshold predicate.

use crate::context::SelectionContext;
use crate::error::PolicyError;
use crate::predicate::Predicate;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use keel_core::{ComparisonOp, Dimension, MetricQuery, Permission, Resource};

const GET_METRIC_STATISTICS: Permission = Permission::read("cloudwatch:GetMetricStatistics");
const SECONDS_PER_DAY: u64 = 86_400;

/// Longest window the metrics backend retains data for.
pub const MAX_WINDOW_DAYS: u32 = 455;

#[derive(Debug, Clone)]
pub struct MetricThreshold {
    pub metric: String,
    pub statistic: String,
    pub days: u32,
    pub period_secs: Option<u64>,
    pub threshold: f64,
    pub op: ComparisonOp,
}

impl MetricThreshold {
    /// Dimensions identifying `resource` in the metrics backend.
    pub fn dimensions(resource: &Resource) -> Vec<Dimension> {
        let mut dimensions = vec![Dimension::new(resource.kind.metric_dimension(), &resource.id)];
        if resource.kind.is_global() {
            dimensions.push(Dimension::new("Region", "Global"));
        }
        dimensions
    }

    /// The statistic query for `resource`, with the window ending at `end`.
    ///
    /// Fails when the window start falls outside the representable range.
    pub fn query(
        &self,
        resource: &Resource,
        end: DateTime<Utc>,
    ) -> Result<MetricQuery, PolicyError> {
        let start = Duration::try_days(i64::from(self.days))
            .and_then(|window| end.checked_sub_signed(window))
            .ok_or_else(|| PolicyError::InvalidDefinition {
                type_tag: "metrics",
                reason: format!("a {}-day window ending at {} is out of range", self.days, end),
            })?;

        Ok(MetricQuery {
            namespace: resource.kind.metrics_namespace().to_string(),
            metric_name: self.metric.clone(),
            dimensions: Self::dimensions(resource),
            statistic: self.statistic.clone(),
            start,
            end,
            period_secs: self
                .period_secs
                .unwrap_or(u64::from(self.days) * SECONDS_PER_DAY),
        })
    }
}

#[async_trait]
impl Predicate for MetricThreshold {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn permissions(&self) -> Vec<Permission> {
        vec![GET_METRIC_STATISTICS]
    }

    async fn matches(
        &self,
        resource: &Resource,
        ctx: &SelectionContext,
    ) -> Result<bool, PolicyError> {
        let query = self.query(resource, ctx.evaluated_at())?;
        let metrics = &ctx.collaborators().metrics;
        let datapoints = ctx
            .retry()
            .run("GetMetricStatistics", || metrics.query_statistic(&query))
            .await
            .map_err(|source| PolicyError::Remote {
                filter: "metrics",
                resource_id: resource.id.clone(),
                source,
            })?;

        // No data is not zero.
        let Some(latest) = datapoints.iter().max_by_key(|point| point.timestamp) else {
            tracing::debug!(
                resource_id = %resource.id,
                metric = %self.metric,
                "No datapoints in window"
            );
            return Ok(false);
        };

        Ok(self.op.compare(latest.value, self.threshold))
    }
}
