use contracts::dashboards::d500_pharmacy_analytics::{FactType, SegmentDto, ShareDto, TopEntryDto};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use super::{AggregationEngine, GroupedMetrics, Page, PageRequest, ResultPaginator};
use crate::shared::analytics::compiler::{CompiledPredicate, HierarchyLevel};
use crate::shared::analytics::error::{AnalyticsError, FilterError};
use crate::shared::analytics::filter::Period;
use crate::shared::analytics::metrics::{Metric, MetricSet};

/// How selection and total groupings are matched by segment name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentJoinMode {
    /// Keep segments present on both sides
    #[default]
    Inner,
    /// Keep every segment of either side; a missing side counts as 0
    Outer,
}

/// `selection / total * 100`, or 0 when the total is not positive.
pub fn share_pct(selection: f64, total: f64) -> f64 {
    if total > 0.0 {
        selection * 100.0 / total
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricShare {
    pub metric: Metric,
    pub selection: f64,
    pub total: f64,
    pub share_pct: f64,
}

impl MetricShare {
    fn new(metric: Metric, selection: &MetricSet, total: &MetricSet) -> Self {
        let selection = selection.sum_value(metric);
        let total = total.sum_value(metric);
        Self {
            metric,
            selection,
            total,
            share_pct: share_pct(selection, total),
        }
    }

    pub fn to_dto(&self) -> ShareDto {
        ShareDto {
            selection: self.selection,
            total: self.total,
            share_pct: self.share_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopEntry {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub shares: Vec<MetricShare>,
    pub top_n: Vec<TopEntry>,
}

impl Segment {
    fn selection_of(&self, metric: Metric) -> f64 {
        self.shares
            .iter()
            .find(|s| s.metric == metric)
            .map_or(0.0, |s| s.selection)
    }

    pub fn to_dto(&self) -> SegmentDto {
        let by_metric = |f: fn(&MetricShare) -> f64| -> BTreeMap<String, f64> {
            self.shares
                .iter()
                .map(|s| (s.metric.name().to_string(), f(s)))
                .collect()
        };

        SegmentDto {
            segment_name: self.name.clone(),
            selection: by_metric(|s| s.selection),
            total: by_metric(|s| s.total),
            share_pct: by_metric(|s| s.share_pct),
            top_n: self
                .top_n
                .iter()
                .map(|t| TopEntryDto {
                    name: t.name.clone(),
                    value: t.value,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HierarchyOptions {
    pub level: HierarchyLevel,
    pub join_mode: SegmentJoinMode,
    pub top_n: usize,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyResult {
    pub level: HierarchyLevel,
    /// Metric used for segment ordering and top-N ranking
    pub primary: Metric,
    pub page: Page<Segment>,
}

/// Share of a selection in a wider total, flat or per hierarchy segment.
#[derive(Clone)]
pub struct MarketShareEngine {
    aggregation: AggregationEngine,
}

impl MarketShareEngine {
    pub fn new(aggregation: AggregationEngine) -> Self {
        Self { aggregation }
    }

    /// Only sums and counts can be expressed as a share.
    pub fn validate_metrics(metrics: &[Metric], fact_type: FactType) -> Result<(), FilterError> {
        AggregationEngine::validate_metrics(metrics, fact_type)?;
        match metrics.iter().find(|m| !m.is_additive()) {
            Some(metric) => Err(FilterError::NonAdditiveShare(metric.name().to_string())),
            None => Ok(()),
        }
    }

    pub async fn flat(
        &self,
        selection: &CompiledPredicate,
        total: &CompiledPredicate,
        period: &Period,
        fact_type: FactType,
        metrics: &[Metric],
        token: &CancellationToken,
    ) -> Result<Vec<MetricShare>, AnalyticsError> {
        Self::validate_metrics(metrics, fact_type)?;

        let (selection_set, total_set) = tokio::try_join!(
            self.aggregation
                .aggregate(selection, period, fact_type, metrics, token),
            self.aggregation
                .aggregate(total, period, fact_type, metrics, token),
        )?;

        Ok(metrics
            .iter()
            .map(|m| MetricShare::new(*m, &selection_set, &total_set))
            .collect())
    }

    /// Segments by `options.level`, ranked and paginated. The first metric is the primary one.
    #[allow(clippy::too_many_arguments)]
    pub async fn hierarchical(
        &self,
        selection: &CompiledPredicate,
        total: &CompiledPredicate,
        period: &Period,
        fact_type: FactType,
        metrics: &[Metric],
        options: &HierarchyOptions,
        token: &CancellationToken,
    ) -> Result<HierarchyResult, AnalyticsError> {
        Self::validate_metrics(metrics, fact_type)?;
        let primary = *metrics
            .first()
            .ok_or_else(|| FilterError::UnknownMetric(String::new()))?;

        let segment_field = options.level.group_field();
        let sub_entity = options.level.sub_entity();
        let segment_fields = [segment_field];
        let sub_fields = [segment_field, sub_entity];

        let primary_only = [primary];
        let (selection_groups, total_groups, sub_groups) = tokio::try_join!(
            self.aggregation.aggregate_grouped(
                selection,
                period,
                fact_type,
                metrics,
                &segment_fields,
                token
            ),
            self.aggregation.aggregate_grouped(
                total,
                period,
                fact_type,
                metrics,
                &segment_fields,
                token
            ),
            self.aggregation.aggregate_grouped(
                total,
                period,
                fact_type,
                &primary_only,
                &sub_fields,
                token
            ),
        )?;

        let mut segments = join_segments(
            selection_groups,
            total_groups,
            options.join_mode,
            metrics,
        );
        let mut top = rank_top_n(&sub_groups, primary, options.top_n);
        for segment in &mut segments {
            segment.top_n = top.remove(&segment.name).unwrap_or_default();
        }
        sort_segments(&mut segments, primary);

        tracing::debug!(
            "{} segments at level {} ({:?} join)",
            segments.len(),
            options.level.as_str(),
            options.join_mode
        );

        Ok(HierarchyResult {
            level: options.level,
            primary,
            page: ResultPaginator::paginate(segments, options.page),
        })
    }
}

fn zero_set(metrics: &[Metric]) -> MetricSet {
    metrics.iter().map(|m| (*m, Some(0.0))).collect()
}

/// Matches selection and total groups by segment name (first key).
pub fn join_segments(
    selection: Vec<GroupedMetrics>,
    total: Vec<GroupedMetrics>,
    mode: SegmentJoinMode,
    metrics: &[Metric],
) -> Vec<Segment> {
    let first_key = |g: GroupedMetrics| (g.keys.into_iter().next().unwrap_or_default(), g.metrics);
    let mut selection: BTreeMap<String, MetricSet> = selection.into_iter().map(first_key).collect();
    let total: BTreeMap<String, MetricSet> = total.into_iter().map(first_key).collect();

    let mut paired = Vec::new();
    for (name, total_set) in total {
        match (selection.remove(&name), mode) {
            (Some(selection_set), _) => paired.push((name, selection_set, total_set)),
            (None, SegmentJoinMode::Outer) => paired.push((name, zero_set(metrics), total_set)),
            (None, SegmentJoinMode::Inner) => {}
        }
    }
    if mode == SegmentJoinMode::Outer {
        for (name, selection_set) in selection {
            paired.push((name, selection_set, zero_set(metrics)));
        }
    }

    paired
        .into_iter()
        .map(|(name, selection_set, total_set)| Segment {
            name,
            shares: metrics
                .iter()
                .map(|m| MetricShare::new(*m, &selection_set, &total_set))
                .collect(),
            top_n: Vec::new(),
        })
        .collect()
}

/// Top `n` sub-entities per segment from rows keyed `[segment, sub_entity]`, ranked by
/// `metric` descending. Ties keep input order.
pub fn rank_top_n(
    rows: &[GroupedMetrics],
    metric: Metric,
    n: usize,
) -> BTreeMap<String, Vec<TopEntry>> {
    let mut by_segment: BTreeMap<String, Vec<TopEntry>> = BTreeMap::new();
    for row in rows {
        let (Some(segment), Some(sub)) = (row.keys.first(), row.keys.get(1)) else {
            continue;
        };
        by_segment.entry(segment.clone()).or_default().push(TopEntry {
            name: sub.clone(),
            value: row.metrics.sum_value(metric),
        });
    }

    for entries in by_segment.values_mut() {
        // sort_by is stable
        entries.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
        entries.truncate(n);
    }
    by_segment
}

/// Descending by selection of `primary`, then by name ascending.
pub fn sort_segments(segments: &mut [Segment], primary: Metric) {
    segments.sort_by(|a, b| {
        b.selection_of(primary)
            .partial_cmp(&a.selection_of(primary))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
}
