use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use contracts::dashboards::d500_pharmacy_analytics::{
    AnalyticsRequest, ComparisonResponse, HierarchyMarketShareResponse, KpiResponse,
    MarketShareResponse,
};
use contracts::shared::metrics::MetricCatalogResponse;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::dashboards::d500_pharmacy_analytics::mapping::parse_pharmacy_scope;
use crate::dashboards::d500_pharmacy_analytics::AnalyticsService;
use crate::shared::analytics::catalog::catalog;
use crate::shared::analytics::error::AnalyticsError;

/// Header carrying the pharmacies the caller may see, set by the authenticating gateway.
pub const PHARMACY_SCOPE_HEADER: &str = "x-pharmacy-scope";

/// Runs one analytics call under a per-request cancellation token and the query timeout.
///
/// The token is cancelled when the handler future is dropped (client gone) or the timeout
/// elapses, which stops every in-flight store call of the request.
async fn run<T, F, Fut>(
    state: &AppState,
    endpoint: &str,
    headers: &HeaderMap,
    payload: Result<Json<AnalyticsRequest>, JsonRejection>,
    call: F,
) -> Result<Json<T>, ApiError>
where
    F: FnOnce(Arc<AnalyticsService>, AnalyticsRequest, Vec<String>, CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, AnalyticsError>>,
{
    let Json(request) = payload?;
    let scope = parse_pharmacy_scope(
        headers
            .get(PHARMACY_SCOPE_HEADER)
            .and_then(|value| value.to_str().ok()),
    );
    tracing::info!(
        "D500 Analytics: {} {} facts, period {:?}, scope {} pharmacies",
        endpoint,
        request.fact_type.as_str(),
        request.date_range,
        scope.len()
    );

    let token = CancellationToken::new();
    let _cancel_on_drop = token.clone().drop_guard();
    let timeout_ms = state.analytics.config().query_timeout_ms;

    let call = call(state.analytics.clone(), request, scope, token.clone());
    match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
        Ok(result) => Ok(Json(result?)),
        Err(_) => {
            token.cancel();
            Err(AnalyticsError::Timeout(timeout_ms).into())
        }
    }
}

/// GET /api/analytics/metrics
pub async fn get_metrics() -> Json<MetricCatalogResponse> {
    Json(catalog().clone())
}

/// POST /api/analytics/kpi
pub async fn kpi(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AnalyticsRequest>, JsonRejection>,
) -> Result<Json<KpiResponse>, ApiError> {
    let response = run(
        &state,
        "kpi",
        &headers,
        payload,
        |service, request, scope, token| async move {
            service.kpi(&request, &scope, &token).await
        },
    )
    .await?;

    tracing::info!(
        "D500 Analytics: kpi returned {} metrics in {}ms (cached: {})",
        response.metrics.len(),
        response.query_time,
        response.cached
    );
    Ok(response)
}

/// POST /api/analytics/comparison
pub async fn comparison(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AnalyticsRequest>, JsonRejection>,
) -> Result<Json<ComparisonResponse>, ApiError> {
    let response = run(
        &state,
        "comparison",
        &headers,
        payload,
        |service, request, scope, token| async move {
            service.comparison(&request, &scope, &token).await
        },
    )
    .await?;

    tracing::info!(
        "D500 Analytics: comparison returned {} metrics in {}ms (cached: {})",
        response.comparison.current.len(),
        response.query_time,
        response.cached
    );
    Ok(response)
}

/// POST /api/analytics/market-share
pub async fn market_share(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AnalyticsRequest>, JsonRejection>,
) -> Result<Json<MarketShareResponse>, ApiError> {
    let response = run(
        &state,
        "market-share",
        &headers,
        payload,
        |service, request, scope, token| async move {
            service.market_share(&request, &scope, &token).await
        },
    )
    .await?;

    tracing::info!(
        "D500 Analytics: market-share returned {} shares in {}ms (cached: {})",
        response.shares.len(),
        response.query_time,
        response.cached
    );
    Ok(response)
}

/// POST /api/analytics/market-share/hierarchy
pub async fn market_share_hierarchy(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AnalyticsRequest>, JsonRejection>,
) -> Result<Json<HierarchyMarketShareResponse>, ApiError> {
    let response = run(
        &state,
        "market-share/hierarchy",
        &headers,
        payload,
        |service, request, scope, token| async move {
            service.market_share_hierarchy(&request, &scope, &token).await
        },
    )
    .await?;

    tracing::info!(
        "D500 Analytics: hierarchy {} returned {} of {} segments in {}ms (cached: {})",
        response.hierarchy_level,
        response.segments.len(),
        response.pagination.total,
        response.query_time,
        response.cached
    );
    Ok(response)
}
