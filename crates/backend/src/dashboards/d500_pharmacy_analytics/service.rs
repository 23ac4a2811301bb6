use contracts::dashboards::d500_pharmacy_analytics::{
    AnalyticsRequest, ComparisonResponse, FactType, HierarchyMarketShareResponse, KpiResponse,
    MarketShareResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::mapping::{self, RequestPeriods};
use crate::shared::analytics::cache::{self, ResultCache};
use crate::shared::analytics::compiler::{CompiledPredicate, HierarchyLevel, QueryCompiler};
use crate::shared::analytics::engine::{
    cancellable, AggregationEngine, ComparisonEngine, HierarchyOptions, MarketShareEngine,
    PageRequest, SegmentJoinMode,
};
use crate::shared::analytics::error::{AnalyticsError, FilterError};
use crate::shared::analytics::filter::FilterSpecification;
use crate::shared::analytics::metrics::{default_metrics, parse_metrics, Metric};
use crate::shared::analytics::store::{FactStore, IdentifierResolver};
use crate::shared::config::AnalyticsConfig;

/// Metrics returned by the share endpoints when a request does not name any.
fn default_share_metrics(fact_type: FactType) -> Vec<Metric> {
    match fact_type {
        FactType::Sales => vec![
            Metric::RevenueGross,
            Metric::QuantitySold,
            Metric::MarginAmount,
        ],
        FactType::Purchases => vec![Metric::PurchaseAmount, Metric::QuantityBought],
        FactType::Stock => vec![Metric::StockValue, Metric::StockQuantity],
    }
}

/// Normalized request identity used for the result cache key.
#[derive(Serialize)]
struct CacheKeyInput<'a> {
    spec: &'a FilterSpecification,
    fact_type: FactType,
    metrics: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hierarchy: Option<HierarchyKey>,
}

#[derive(Serialize)]
struct HierarchyKey {
    level: &'static str,
    join_mode: SegmentJoinMode,
    top_n: usize,
    page: usize,
    page_size: usize,
}

/// Validated, resolved and compiled request.
struct PreparedQuery {
    periods: RequestPeriods,
    spec: FilterSpecification,
    predicate: CompiledPredicate,
    fact_type: FactType,
    metrics: Vec<Metric>,
}

impl PreparedQuery {
    fn cache_input(&self, hierarchy: Option<HierarchyKey>) -> CacheKeyInput<'_> {
        CacheKeyInput {
            spec: &self.spec,
            fact_type: self.fact_type,
            metrics: self.metrics.iter().map(Metric::name).collect(),
            hierarchy,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Maps analytics requests onto the engines, with result caching.
pub struct AnalyticsService {
    resolver: Arc<dyn IdentifierResolver>,
    comparison: ComparisonEngine,
    market_share: MarketShareEngine,
    cache: Arc<dyn ResultCache>,
    config: AnalyticsConfig,
    cache_ttl: Duration,
}

impl AnalyticsService {
    pub fn new(
        store: Arc<dyn FactStore>,
        resolver: Arc<dyn IdentifierResolver>,
        cache: Arc<dyn ResultCache>,
        config: AnalyticsConfig,
        cache_ttl: Duration,
    ) -> Self {
        let aggregation = AggregationEngine::new(store);
        Self {
            resolver,
            comparison: ComparisonEngine::new(aggregation.clone()),
            market_share: MarketShareEngine::new(aggregation),
            cache,
            config,
            cache_ttl,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// KPI values for the period, with evolution when a comparison period is given.
    pub async fn kpi(
        &self,
        request: &AnalyticsRequest,
        scope: &[String],
        token: &CancellationToken,
    ) -> Result<KpiResponse, AnalyticsError> {
        let started = Instant::now();
        let metrics = parse_metrics(
            &request.metrics,
            request.fact_type,
            default_metrics(request.fact_type),
        )?;
        AggregationEngine::validate_metrics(&metrics, request.fact_type)?;
        let query = self.prepare(request, scope, metrics, token).await?;

        let key = self.key_for("kpi", &query.cache_input(None));
        if let Some(hit) = self.lookup::<KpiResponse>(key.as_deref()).await {
            return Ok(KpiResponse {
                query_time: elapsed_ms(started),
                cached: true,
                ..hit
            });
        }

        let result = self
            .comparison
            .compare(
                &query.predicate,
                &query.periods.period,
                query.periods.comparison.as_ref(),
                query.fact_type,
                &query.metrics,
                token,
            )
            .await?;

        let response = KpiResponse {
            fact_type: query.fact_type,
            period: query.periods.period.to_dto(),
            metrics: result.current.to_values(),
            comparison: query.periods.comparison.map(|_| result.to_dto()),
            query_time: elapsed_ms(started),
            cached: false,
        };
        self.remember(key.as_deref(), &response).await;
        Ok(response)
    }

    /// Current and previous values with per-metric evolution.
    pub async fn comparison(
        &self,
        request: &AnalyticsRequest,
        scope: &[String],
        token: &CancellationToken,
    ) -> Result<ComparisonResponse, AnalyticsError> {
        let started = Instant::now();
        let metrics = parse_metrics(
            &request.metrics,
            request.fact_type,
            default_metrics(request.fact_type),
        )?;
        AggregationEngine::validate_metrics(&metrics, request.fact_type)?;
        let query = self.prepare(request, scope, metrics, token).await?;

        let key = self.key_for("comparison", &query.cache_input(None));
        if let Some(hit) = self.lookup::<ComparisonResponse>(key.as_deref()).await {
            return Ok(ComparisonResponse {
                query_time: elapsed_ms(started),
                cached: true,
                ..hit
            });
        }

        let result = self
            .comparison
            .compare(
                &query.predicate,
                &query.periods.period,
                query.periods.comparison.as_ref(),
                query.fact_type,
                &query.metrics,
                token,
            )
            .await?;

        let response = ComparisonResponse {
            fact_type: query.fact_type,
            period: query.periods.period.to_dto(),
            comparison_period: query.periods.comparison.map(|p| p.to_dto()),
            comparison: result.to_dto(),
            query_time: elapsed_ms(started),
            cached: false,
        };
        self.remember(key.as_deref(), &response).await;
        Ok(response)
    }

    /// Share of the product selection in the unselected total, per metric.
    pub async fn market_share(
        &self,
        request: &AnalyticsRequest,
        scope: &[String],
        token: &CancellationToken,
    ) -> Result<MarketShareResponse, AnalyticsError> {
        let started = Instant::now();
        let metrics = parse_metrics(
            &request.metrics,
            request.fact_type,
            default_share_metrics(request.fact_type),
        )?;
        MarketShareEngine::validate_metrics(&metrics, request.fact_type)?;
        let query = self.prepare(request, scope, metrics, token).await?;

        let key = self.key_for("market-share", &query.cache_input(None));
        if let Some(hit) = self.lookup::<MarketShareResponse>(key.as_deref()).await {
            return Ok(MarketShareResponse {
                query_time: elapsed_ms(started),
                cached: true,
                ..hit
            });
        }

        let total = query.predicate.without_selection();
        let period = &query.periods.period;
        let flat = self.market_share.flat(
            &query.predicate,
            &total,
            period,
            query.fact_type,
            &query.metrics,
            token,
        );

        let (shares, comparison) = match query.periods.comparison.as_ref() {
            Some(previous) => {
                let compared = self.comparison.compare(
                    &query.predicate,
                    period,
                    Some(previous),
                    query.fact_type,
                    &query.metrics,
                    token,
                );
                let (shares, compared) = tokio::try_join!(flat, compared)?;
                (shares, Some(compared.to_dto()))
            }
            None => (flat.await?, None),
        };

        let response = MarketShareResponse {
            fact_type: query.fact_type,
            period: period.to_dto(),
            shares: shares
                .iter()
                .map(|s| (s.metric.name().to_string(), s.to_dto()))
                .collect(),
            comparison,
            query_time: elapsed_ms(started),
            cached: false,
        };
        self.remember(key.as_deref(), &response).await;
        Ok(response)
    }

    /// Shares per hierarchy segment, ranked and paginated.
    pub async fn market_share_hierarchy(
        &self,
        request: &AnalyticsRequest,
        scope: &[String],
        token: &CancellationToken,
    ) -> Result<HierarchyMarketShareResponse, AnalyticsError> {
        let started = Instant::now();
        let metrics = parse_metrics(
            &request.metrics,
            request.fact_type,
            default_share_metrics(request.fact_type),
        )?;
        MarketShareEngine::validate_metrics(&metrics, request.fact_type)?;

        let level: HierarchyLevel = request
            .hierarchy_level
            .as_deref()
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .ok_or(FilterError::MissingHierarchyLevel)?
            .parse()?;
        let options = HierarchyOptions {
            level,
            join_mode: self.config.segment_join,
            top_n: self.config.top_n,
            page: PageRequest::clamped(
                request.page,
                request.page_size,
                self.config.default_page_size,
                self.config.max_page_size,
            ),
        };

        let query = self.prepare(request, scope, metrics, token).await?;

        let key = self.key_for(
            "market-share/hierarchy",
            &query.cache_input(Some(HierarchyKey {
                level: level.as_str(),
                join_mode: options.join_mode,
                top_n: options.top_n,
                page: options.page.page(),
                page_size: options.page.page_size(),
            })),
        );
        if let Some(hit) = self
            .lookup::<HierarchyMarketShareResponse>(key.as_deref())
            .await
        {
            return Ok(HierarchyMarketShareResponse {
                query_time: elapsed_ms(started),
                cached: true,
                ..hit
            });
        }

        let total = query.predicate.without_selection();
        let result = self
            .market_share
            .hierarchical(
                &query.predicate,
                &total,
                &query.periods.period,
                query.fact_type,
                &query.metrics,
                &options,
                token,
            )
            .await?;

        let response = HierarchyMarketShareResponse {
            fact_type: query.fact_type,
            period: query.periods.period.to_dto(),
            hierarchy_level: result.level.as_str().to_string(),
            primary_metric: result.primary.name().to_string(),
            segments: result.page.items.iter().map(|s| s.to_dto()).collect(),
            pagination: result.page.pagination(),
            query_time: elapsed_ms(started),
            cached: false,
        };
        self.remember(key.as_deref(), &response).await;
        Ok(response)
    }

    /// Validates the request, then resolves identifiers and compiles the predicate.
    async fn prepare(
        &self,
        request: &AnalyticsRequest,
        scope: &[String],
        metrics: Vec<Metric>,
        token: &CancellationToken,
    ) -> Result<PreparedQuery, AnalyticsError> {
        let periods = mapping::parse_periods(request, &self.config)?;
        mapping::validate_filters(request, &periods, scope)?;

        let spec = cancellable(
            token,
            mapping::resolve_specification(request, &periods, scope, self.resolver.as_ref()),
        )
        .await?;
        let predicate = QueryCompiler::compile(&spec)?;

        Ok(PreparedQuery {
            periods,
            spec,
            predicate,
            fact_type: request.fact_type,
            metrics,
        })
    }

    fn key_for(&self, endpoint: &str, input: &CacheKeyInput<'_>) -> Option<String> {
        match cache::cache_key(endpoint, input) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!("no cache key for {}: {}", endpoint, e);
                None
            }
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: Option<&str>) -> Option<T> {
        match key {
            Some(key) => cache::load(self.cache.as_ref(), key).await,
            None => None,
        }
    }

    async fn remember<T: Serialize>(&self, key: Option<&str>, value: &T) {
        if let Some(key) = key {
            cache::store(self.cache.as_ref(), key, value, self.cache_ttl).await;
        }
    }
}
