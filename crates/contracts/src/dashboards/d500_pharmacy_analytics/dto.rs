use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Enumerations shared by requests and the backend engine
// ---------------------------------------------------------------------------

/// Which fact table an aggregation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FactType {
    Sales,
    Purchases,
    Stock,
}

impl Default for FactType {
    fn default() -> Self {
        FactType::Sales
    }
}

impl FactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::Sales => "sales",
            FactType::Purchases => "purchases",
            FactType::Stock => "stock",
        }
    }
}

/// Reimbursement filter. `All` means no filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReimbursementStatus {
    #[default]
    All,
    Reimbursed,
    NotReimbursed,
}

/// Generic / brand filter. `All` means no filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GenericStatus {
    #[default]
    All,
    Generic,
    Brand,
}

/// Derives the comparison window when no explicit range is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonPreset {
    /// Window of equal length ending the day before `dateRange.start`.
    PreviousPeriod,
    /// Same dates one year earlier.
    PreviousYear,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Inclusive date range, dates in format "YYYY-MM-DD".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeDto {
    pub start: String,
    pub end: String,
}

impl DateRangeDto {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

/// Numeric range, either bound optional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericRangeDto {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Body shared by every analytics endpoint.
///
/// Fields that only make sense for one endpoint (hierarchy, pagination) are ignored by the
/// others. Empty lists and `All` statuses never narrow the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRequest {
    /// Required. Kept optional here so a missing range is reported as a validation error.
    #[serde(default)]
    pub date_range: Option<DateRangeDto>,
    #[serde(default)]
    pub comparison_date_range: Option<DateRangeDto>,
    #[serde(default)]
    pub comparison_preset: Option<ComparisonPreset>,

    #[serde(default)]
    pub fact_type: FactType,
    /// Metric wire names (e.g. "ca_ttc"). Empty = endpoint default.
    #[serde(default)]
    pub metrics: Vec<String>,

    #[serde(default)]
    pub product_codes: Vec<String>,
    #[serde(default)]
    pub laboratory_codes: Vec<String>,
    #[serde(default)]
    pub category_codes: Vec<String>,
    #[serde(default)]
    pub pharmacy_ids: Vec<String>,

    #[serde(default)]
    pub excluded_product_codes: Vec<String>,
    #[serde(default)]
    pub excluded_laboratory_codes: Vec<String>,
    #[serde(default)]
    pub excluded_category_codes: Vec<String>,
    #[serde(default)]
    pub excluded_pharmacy_ids: Vec<String>,

    #[serde(default)]
    pub purchase_price_net_range: Option<NumericRangeDto>,
    #[serde(default)]
    pub purchase_price_gross_range: Option<NumericRangeDto>,
    #[serde(default)]
    pub sell_price_range: Option<NumericRangeDto>,
    #[serde(default)]
    pub discount_range: Option<NumericRangeDto>,
    #[serde(default)]
    pub margin_range: Option<NumericRangeDto>,

    #[serde(default)]
    pub tva_rates: Vec<f64>,
    #[serde(default)]
    pub reimbursement_status: ReimbursementStatus,
    #[serde(default)]
    pub is_generic: GenericStatus,

    /// Hierarchical market share only: "category1", "category2", "category3", "laboratory".
    #[serde(default)]
    pub hierarchy_level: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Metric wire name → value. `None` is serialized as `null` (undefined ratio).
pub type MetricValues = BTreeMap<String, Option<f64>>;

/// Current vs previous period for the same filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonDto {
    pub current: MetricValues,
    /// `None` when no comparison period was supplied.
    pub previous: Option<MetricValues>,
    pub evolution_pct: BTreeMap<String, Option<f64>>,
}

/// POST /api/analytics/kpi
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResponse {
    pub fact_type: FactType,
    pub period: DateRangeDto,
    /// Requested metrics as flat fields.
    #[serde(flatten)]
    pub metrics: MetricValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonDto>,
    /// Milliseconds spent serving the request
    pub query_time: u64,
    pub cached: bool,
}

/// POST /api/analytics/comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResponse {
    pub fact_type: FactType,
    pub period: DateRangeDto,
    pub comparison_period: Option<DateRangeDto>,
    pub comparison: ComparisonDto,
    pub query_time: u64,
    pub cached: bool,
}

/// Share of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareDto {
    pub selection: f64,
    pub total: f64,
    pub share_pct: f64,
}

/// POST /api/analytics/market-share
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketShareResponse {
    pub fact_type: FactType,
    pub period: DateRangeDto,
    pub shares: BTreeMap<String, ShareDto>,
    /// Selection metrics compared with the comparison period, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonDto>,
    pub query_time: u64,
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEntryDto {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDto {
    pub segment_name: String,
    pub selection: BTreeMap<String, f64>,
    pub total: BTreeMap<String, f64>,
    pub share_pct: BTreeMap<String, f64>,
    /// Best sub-entities of the segment (laboratories or products), ranked by the primary metric.
    pub top_n: Vec<TopEntryDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// POST /api/analytics/market-share/hierarchy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyMarketShareResponse {
    pub fact_type: FactType,
    pub period: DateRangeDto,
    pub hierarchy_level: String,
    /// Metric used for ranking segments and top-N entries.
    pub primary_metric: String,
    pub segments: Vec<SegmentDto>,
    pub pagination: PaginationDto,
    pub query_time: u64,
    pub cached: bool,
}

/// Error envelope returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
