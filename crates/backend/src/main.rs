#![allow(clippy::too_many_arguments)]

pub mod api;
pub mod dashboards;
pub mod routes;
pub mod shared;
pub mod system;

use std::sync::Arc;
use std::time::Duration;

use crate::api::AppState;
use crate::dashboards::d500_pharmacy_analytics::AnalyticsService;
use crate::shared::analytics::cache::{MemoryResultCache, NoopCache, ResultCache};
use crate::shared::analytics::store::SqlFactStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use axum::http::{header, HeaderName, Method};
    use axum::middleware;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tower_http::cors::{Any, CorsLayer};

    system::tracing::initialize()?;

    let config = shared::config::load_config()?;
    let db_path = shared::config::get_database_path(&config)?;

    shared::data::migration_runner::run_migrations(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;
    let db = shared::data::db::connect(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e}"))?;

    let store = Arc::new(SqlFactStore::new(db));
    let cache: Arc<dyn ResultCache> = if config.cache.enabled {
        tracing::info!(
            "Result cache enabled (ttl {}s, max {} entries)",
            config.cache.ttl_seconds,
            config.cache.max_entries
        );
        Arc::new(MemoryResultCache::new(config.cache.max_entries))
    } else {
        tracing::info!("Result cache disabled");
        Arc::new(NoopCache)
    };

    let service = AnalyticsService::new(
        store.clone(),
        store,
        cache,
        config.analytics.clone(),
        Duration::from_secs(config.cache.ttl_seconds),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(api::handlers::d500_pharmacy_analytics::PHARMACY_SCOPE_HEADER),
        ]);

    let app = routes::configure_routes(AppState::new(service))
        .layer(middleware::from_fn(
            system::middleware::request_logger::request_logger,
        ))
        .layer(cors);

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server host '{}': {e}", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: Port {} is already in use. Please ensure no other process is using this port.",
                    addr.port()
                );
            } else {
                tracing::error!("Failed to bind to {}. Error: {}", addr, e);
            }
            // Propagate the error to stop the application
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;

    Ok(())
}
