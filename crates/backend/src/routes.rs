use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::d500_pharmacy_analytics;
use crate::api::AppState;

/// Конфигурация всех роутов приложения
pub fn configure_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // D500 PHARMACY ANALYTICS
        // ========================================
        .route(
            "/api/analytics/metrics",
            get(d500_pharmacy_analytics::get_metrics),
        )
        .route("/api/analytics/kpi", post(d500_pharmacy_analytics::kpi))
        .route(
            "/api/analytics/comparison",
            post(d500_pharmacy_analytics::comparison),
        )
        .route(
            "/api/analytics/market-share",
            post(d500_pharmacy_analytics::market_share),
        )
        .route(
            "/api/analytics/market-share/hierarchy",
            post(d500_pharmacy_analytics::market_share_hierarchy),
        )
        .with_state(state)
}
