use serde::{Deserialize, Serialize};

use crate::dashboards::d500_pharmacy_analytics::FactType;

// ---------------------------------------------------------------------------
// Metric display metadata
// ---------------------------------------------------------------------------

/// How to format the numeric value on the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ValueFormat {
    Money { currency: String },
    Number { decimals: u8 },
    Percent { decimals: u8 },
    Integer,
    Days,
}

/// How a metric is derived from facts. Drives zero/null defaults and share eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    /// Summed over facts, 0 when nothing matches.
    Sum,
    /// Distinct count, 0 when nothing matches.
    Count,
    /// Quotient of two sums, `null` at zero denominator.
    Ratio,
}

/// Static metadata describing one metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricMeta {
    /// Wire name used in requests and responses
    pub id: String,
    pub label: String,
    pub fact_types: Vec<FactType>,
    pub kind: MetricKind,
    pub format: ValueFormat,
    pub description: Option<String>,
}

/// A grouping field accepted as `hierarchyLevel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyLevelMeta {
    pub id: String,
    pub label: String,
    /// Sub-entity ranked inside each segment ("laboratory" or "product")
    pub sub_entity: String,
}

/// GET /api/analytics/metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCatalogResponse {
    pub metrics: Vec<MetricMeta>,
    pub hierarchy_levels: Vec<HierarchyLevelMeta>,
}
