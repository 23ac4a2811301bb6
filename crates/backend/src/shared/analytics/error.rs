use thiserror::Error;

/// Malformed or out-of-policy request input. Raised before any I/O.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("dateRange is required")]
    MissingPeriod,

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("period start {start} is after end {end}")]
    InvertedPeriod { start: String, end: String },

    #[error("period spans {days} days, maximum is {max}")]
    PeriodTooLong { days: i64, max: i64 },

    #[error("comparison period cannot be derived from {0}")]
    ComparisonOutOfRange(String),

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("range '{name}' has min {min} greater than max {max}")]
    InvertedRange { name: String, min: f64, max: f64 },

    #[error("range '{0}' has a bound that is not a finite number")]
    NonFiniteBound(String),

    #[error("invalid TVA rate {0}")]
    InvalidTvaRate(f64),

    #[error("unknown hierarchy level '{0}'")]
    UnknownHierarchyLevel(String),

    #[error("hierarchyLevel is required for hierarchical market share")]
    MissingHierarchyLevel,

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("metric '{metric}' is not available for {fact_type} facts")]
    UnsupportedMetric { metric: String, fact_type: String },

    #[error("metric '{0}' is a ratio and cannot be expressed as a market share")]
    NonAdditiveShare(String),
}

/// Failure of the fact store while executing a query.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("fact store query failed: {0}")]
    Query(String),

    #[error("fact store unavailable: {0}")]
    Unavailable(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(e: sea_orm::DbErr) -> Self {
        StoreError::Query(e.to_string())
    }
}

/// Failure of the result cache. Never surfaced to the caller.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}

/// Error returned by the engines and the dashboard service.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Validation(#[from] FilterError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("request cancelled")]
    Cancelled,

    #[error("request exceeded {0} ms")]
    Timeout(u64),
}

impl AnalyticsError {
    pub fn is_validation(&self) -> bool {
        matches!(self, AnalyticsError::Validation(_))
    }
}
