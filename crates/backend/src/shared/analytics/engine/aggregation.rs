use contracts::dashboards::d500_pharmacy_analytics::FactType;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::cancellable;
use crate::shared::analytics::compiler::{CompiledPredicate, GroupField};
use crate::shared::analytics::error::{AnalyticsError, FilterError};
use crate::shared::analytics::filter::Period;
use crate::shared::analytics::metrics::{Metric, MetricSet};
use crate::shared::analytics::store::{AggregateQuery, FactStore};

/// Metric values for one combination of grouping keys.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedMetrics {
    pub keys: Vec<String>,
    pub metrics: MetricSet,
}

/// Runs one compiled predicate against the fact store and derives metrics from the totals.
#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn FactStore>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self { store }
    }

    /// Rejects metrics that the fact type cannot produce. Runs before any store call.
    pub fn validate_metrics(metrics: &[Metric], fact_type: FactType) -> Result<(), FilterError> {
        match metrics.iter().find(|m| !m.supports(fact_type)) {
            Some(metric) => Err(FilterError::UnsupportedMetric {
                metric: metric.name().to_string(),
                fact_type: fact_type.as_str().to_string(),
            }),
            None => Ok(()),
        }
    }

    pub async fn aggregate(
        &self,
        predicate: &CompiledPredicate,
        period: &Period,
        fact_type: FactType,
        metrics: &[Metric],
        token: &CancellationToken,
    ) -> Result<MetricSet, AnalyticsError> {
        Self::validate_metrics(metrics, fact_type)?;

        let query = AggregateQuery {
            predicate,
            period,
            fact_type,
        };
        let raw = cancellable(token, self.store.aggregate(&query)).await?;
        tracing::debug!(
            "aggregated {} {} facts over {}",
            raw.fact_count,
            fact_type.as_str(),
            period
        );

        Ok(MetricSet::derive(&raw, period, metrics))
    }

    /// Per-group metrics, ordered by keys as returned by the store.
    pub async fn aggregate_grouped(
        &self,
        predicate: &CompiledPredicate,
        period: &Period,
        fact_type: FactType,
        metrics: &[Metric],
        group_by: &[GroupField],
        token: &CancellationToken,
    ) -> Result<Vec<GroupedMetrics>, AnalyticsError> {
        Self::validate_metrics(metrics, fact_type)?;

        let query = AggregateQuery {
            predicate,
            period,
            fact_type,
        };
        let groups = cancellable(token, self.store.aggregate_grouped(&query, group_by)).await?;

        Ok(groups
            .into_iter()
            .map(|g| GroupedMetrics {
                metrics: MetricSet::derive(&g.totals, period, metrics),
                keys: g.keys,
            })
            .collect())
    }
}
