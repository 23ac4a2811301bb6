pub mod error;
pub mod handlers;

use std::sync::Arc;

use crate::dashboards::d500_pharmacy_analytics::AnalyticsService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub analytics: Arc<AnalyticsService>,
}

impl AppState {
    pub fn new(analytics: AnalyticsService) -> Self {
        Self {
            analytics: Arc::new(analytics),
        }
    }
}
