pub mod aggregation;
pub mod comparison;
pub mod market_share;
pub mod paginator;

use std::future::Future;
use tokio_util::sync::CancellationToken;

use super::error::{AnalyticsError, StoreError};

pub use aggregation::{AggregationEngine, GroupedMetrics};
pub use comparison::{evolution_pct, ComparisonEngine, ComparisonResult};
pub use market_share::{
    share_pct, HierarchyOptions, HierarchyResult, MarketShareEngine, MetricShare, Segment,
    SegmentJoinMode, TopEntry,
};
pub use paginator::{Page, PageRequest, ResultPaginator};

/// Races a store call against the request's cancellation token.
/// On cancellation the call is dropped and its result discarded.
pub async fn cancellable<T, F>(token: &CancellationToken, call: F) -> Result<T, AnalyticsError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AnalyticsError::Cancelled),
        result = call => result.map_err(AnalyticsError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<u32, _> = cancellable(&token, async { Ok(1) }).await;
        assert!(matches!(result, Err(AnalyticsError::Cancelled)));
    }

    #[tokio::test]
    async fn test_store_error_is_propagated() {
        let token = CancellationToken::new();
        let result: Result<u32, _> =
            cancellable(&token, async { Err(StoreError::Query("boom".into())) }).await;
        assert!(matches!(result, Err(AnalyticsError::Store(StoreError::Query(_)))));
    }
}
