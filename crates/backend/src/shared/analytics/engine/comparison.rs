use contracts::dashboards::d500_pharmacy_analytics::{ComparisonDto, FactType};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use super::AggregationEngine;
use crate::shared::analytics::compiler::CompiledPredicate;
use crate::shared::analytics::error::AnalyticsError;
use crate::shared::analytics::filter::Period;
use crate::shared::analytics::metrics::{Metric, MetricSet};

/// Percentage change from `previous` to `current`.
///
/// `None` when either side is undefined or `previous` is 0, for every metric alike.
pub fn evolution_pct(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(cur), Some(prev)) if prev != 0.0 => {
            Some((cur - prev) * 100.0 / prev.abs()).filter(|v| v.is_finite())
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub current: MetricSet,
    pub previous: Option<MetricSet>,
    pub evolution_pct: BTreeMap<Metric, Option<f64>>,
}

impl ComparisonResult {
    pub fn new(current: MetricSet, previous: Option<MetricSet>) -> Self {
        let evolution_pct = current
            .iter()
            .map(|(metric, value)| {
                let prev = previous.as_ref().and_then(|p| p.get(metric));
                (metric, evolution_pct(value, prev))
            })
            .collect();

        Self {
            current,
            previous,
            evolution_pct,
        }
    }

    pub fn to_dto(&self) -> ComparisonDto {
        ComparisonDto {
            current: self.current.to_values(),
            previous: self.previous.as_ref().map(MetricSet::to_values),
            evolution_pct: self
                .evolution_pct
                .iter()
                .map(|(m, v)| (m.name().to_string(), *v))
                .collect(),
        }
    }
}

/// Same predicate, two periods.
#[derive(Clone)]
pub struct ComparisonEngine {
    aggregation: AggregationEngine,
}

impl ComparisonEngine {
    pub fn new(aggregation: AggregationEngine) -> Self {
        Self { aggregation }
    }

    /// Without a comparison period, `previous` is `None` and every evolution is `None`.
    pub async fn compare(
        &self,
        predicate: &CompiledPredicate,
        period: &Period,
        comparison: Option<&Period>,
        fact_type: FactType,
        metrics: &[Metric],
        token: &CancellationToken,
    ) -> Result<ComparisonResult, AnalyticsError> {
        let current = self
            .aggregation
            .aggregate(predicate, period, fact_type, metrics, token);

        match comparison {
            None => Ok(ComparisonResult::new(current.await?, None)),
            Some(previous_period) => {
                let previous = self.aggregation.aggregate(
                    predicate,
                    previous_period,
                    fact_type,
                    metrics,
                    token,
                );
                let (current, previous) = tokio::try_join!(current, previous)?;
                Ok(ComparisonResult::new(current, Some(previous)))
            }
        }
    }
}
