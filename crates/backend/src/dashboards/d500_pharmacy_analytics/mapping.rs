use contracts::dashboards::d500_pharmacy_analytics::{
    AnalyticsRequest, ComparisonPreset, NumericRangeDto,
};
use std::collections::BTreeSet;

use crate::shared::analytics::compiler::QueryCompiler;
use crate::shared::analytics::error::{FilterError, StoreError};
use crate::shared::analytics::filter::{
    FilterSpecification, FilterSpecificationBuilder, NumericRange, Period, RangeField,
};
use crate::shared::analytics::store::IdentifierResolver;
use crate::shared::config::AnalyticsConfig;

/// Request period and the comparison period derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestPeriods {
    pub period: Period,
    pub comparison: Option<Period>,
}

/// Parses `dateRange` and the comparison window.
///
/// An explicit `comparisonDateRange` wins over `comparisonPreset`. The span cap applies to
/// both windows when enforced.
pub fn parse_periods(
    request: &AnalyticsRequest,
    config: &AnalyticsConfig,
) -> Result<RequestPeriods, FilterError> {
    let period = Period::parse(
        request
            .date_range
            .as_ref()
            .ok_or(FilterError::MissingPeriod)?,
    )?;

    let comparison = match (&request.comparison_date_range, request.comparison_preset) {
        (Some(range), _) => Some(Period::parse(range)?),
        (None, Some(ComparisonPreset::PreviousPeriod)) => Some(period.previous_adjacent()?),
        (None, Some(ComparisonPreset::PreviousYear)) => Some(period.previous_year()?),
        (None, None) => None,
    };

    if config.enforce_period_cap {
        period.ensure_max_span(config.max_period_days)?;
        if let Some(comparison) = &comparison {
            comparison.ensure_max_span(config.max_period_days)?;
        }
    }

    Ok(RequestPeriods { period, comparison })
}

/// Pharmacy scope from the gateway header: comma-separated identifiers.
pub fn parse_pharmacy_scope(header: Option<&str>) -> Vec<String> {
    header
        .map(|value| clean(value.split(',')))
        .unwrap_or_default()
}

/// Trimmed identifiers, blanks dropped.
fn clean<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    ids.into_iter()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_codes(codes: &[String]) -> Vec<String> {
    clean(codes.iter().map(String::as_str))
}

fn range_filters(request: &AnalyticsRequest) -> [(RangeField, Option<NumericRangeDto>); 5] {
    [
        (RangeField::PurchasePriceNet, request.purchase_price_net_range),
        (
            RangeField::PurchasePriceGross,
            request.purchase_price_gross_range,
        ),
        (RangeField::SellPrice, request.sell_price_range),
        (RangeField::Discount, request.discount_range),
        (RangeField::Margin, request.margin_range),
    ]
}

/// Everything except the laboratory and category sets, which need the resolver.
fn base_builder(
    request: &AnalyticsRequest,
    periods: &RequestPeriods,
    scope: &[String],
) -> FilterSpecificationBuilder {
    let mut builder = FilterSpecification::builder(periods.period)
        .comparison_period(periods.comparison)
        .include_pharmacies(clean_codes(&request.pharmacy_ids))
        .exclude_products(clean_codes(&request.excluded_product_codes))
        .exclude_pharmacies(clean_codes(&request.excluded_pharmacy_ids))
        .tva_rates(&request.tva_rates)
        .reimbursement(request.reimbursement_status)
        .generic(request.is_generic)
        .pharmacy_scope(scope.iter().cloned());

    for (field, range) in range_filters(request) {
        if let Some(range) = range {
            builder = builder.range(field.name(), NumericRange::from(range));
        }
    }
    builder
}

fn has_product_selection(request: &AnalyticsRequest) -> bool {
    [
        &request.product_codes,
        &request.laboratory_codes,
        &request.category_codes,
    ]
    .iter()
    .any(|codes| !clean_codes(codes).is_empty())
}

/// Validates the request filters without touching the store.
pub fn validate_filters(
    request: &AnalyticsRequest,
    periods: &RequestPeriods,
    scope: &[String],
) -> Result<(), FilterError> {
    let spec = base_builder(request, periods, scope)
        .include_products(clean_codes(&request.product_codes))
        .build();
    QueryCompiler::validate(&spec)
}

/// Builds the specification, resolving laboratory and category codes to product codes.
///
/// Product, laboratory and category includes form one product universe. A selection whose
/// codes all resolve to nothing stays an empty universe and matches no fact.
pub async fn resolve_specification(
    request: &AnalyticsRequest,
    periods: &RequestPeriods,
    scope: &[String],
    resolver: &dyn IdentifierResolver,
) -> Result<FilterSpecification, StoreError> {
    let mut builder = base_builder(request, periods, scope);

    if has_product_selection(request) {
        let mut universe: BTreeSet<String> =
            clean_codes(&request.product_codes).into_iter().collect();
        universe.extend(
            resolve_codes(&request.laboratory_codes, resolver, CodeKind::Laboratory).await?,
        );
        universe.extend(
            resolve_codes(&request.category_codes, resolver, CodeKind::Category).await?,
        );
        builder = builder.include_products(universe);
    }

    let excluded_labs =
        resolve_codes(&request.excluded_laboratory_codes, resolver, CodeKind::Laboratory).await?;
    let excluded_categories =
        resolve_codes(&request.excluded_category_codes, resolver, CodeKind::Category).await?;
    builder = builder
        .exclude_products(excluded_labs)
        .exclude_products(excluded_categories);

    Ok(builder.build())
}

#[derive(Debug, Clone, Copy)]
enum CodeKind {
    Laboratory,
    Category,
}

async fn resolve_codes(
    codes: &[String],
    resolver: &dyn IdentifierResolver,
    kind: CodeKind,
) -> Result<BTreeSet<String>, StoreError> {
    let codes = clean_codes(codes);
    if codes.is_empty() {
        return Ok(BTreeSet::new());
    }

    let products = match kind {
        CodeKind::Laboratory => resolver.products_for_laboratories(&codes).await?,
        CodeKind::Category => resolver.products_for_categories(&codes).await?,
    };
    tracing::debug!(
        "resolved {} {:?} codes to {} products",
        codes.len(),
        kind,
        products.len()
    );
    Ok(products)
}
