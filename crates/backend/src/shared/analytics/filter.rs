use chrono::{Duration, Months, NaiveDate};
use contracts::dashboards::d500_pharmacy_analytics::{
    DateRangeDto, GenericStatus, NumericRangeDto, ReimbursementStatus,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::error::FilterError;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// Closed date interval on the fact's event date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FilterError> {
        if start > end {
            return Err(FilterError::InvertedPeriod {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse a request date range ("YYYY-MM-DD" bounds).
    pub fn parse(dto: &DateRangeDto) -> Result<Self, FilterError> {
        Self::new(parse_date(&dto.start)?, parse_date(&dto.end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, bounds included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Rejects periods whose span (end - start) exceeds `max_days`.
    pub fn ensure_max_span(&self, max_days: i64) -> Result<(), FilterError> {
        let span = (self.end - self.start).num_days();
        if span > max_days {
            return Err(FilterError::PeriodTooLong {
                days: span,
                max: max_days,
            });
        }
        Ok(())
    }

    /// Window of equal length ending the day before `start`.
    pub fn previous_adjacent(&self) -> Result<Period, FilterError> {
        let out_of_range = || FilterError::ComparisonOutOfRange(self.to_string());
        let end = self
            .start
            .checked_sub_signed(Duration::days(1))
            .ok_or_else(out_of_range)?;
        let start = end
            .checked_sub_signed(Duration::days(self.days() - 1))
            .ok_or_else(out_of_range)?;
        Period::new(start, end)
    }

    /// Same dates one year earlier (Feb 29 becomes Feb 28).
    pub fn previous_year(&self) -> Result<Period, FilterError> {
        let out_of_range = || FilterError::ComparisonOutOfRange(self.to_string());
        let start = self
            .start
            .checked_sub_months(Months::new(12))
            .ok_or_else(out_of_range)?;
        let end = self
            .end
            .checked_sub_months(Months::new(12))
            .ok_or_else(out_of_range)?;
        Period::new(start, end)
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }

    pub fn to_dto(&self) -> DateRangeDto {
        DateRangeDto {
            start: self.start_str(),
            end: self.end_str(),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start_str(), self.end_str())
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| FilterError::InvalidDate(s.to_string()))
}

// ---------------------------------------------------------------------------
// Numeric ranges
// ---------------------------------------------------------------------------

/// Numeric constraint; a missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

impl From<NumericRangeDto> for NumericRange {
    fn from(dto: NumericRangeDto) -> Self {
        Self::new(dto.min, dto.max)
    }
}

/// Per-fact derived fields a range filter can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RangeField {
    PurchasePriceNet,
    PurchasePriceGross,
    SellPrice,
    Discount,
    Margin,
}

impl RangeField {
    pub const ALL: [RangeField; 5] = [
        RangeField::PurchasePriceNet,
        RangeField::PurchasePriceGross,
        RangeField::SellPrice,
        RangeField::Discount,
        RangeField::Margin,
    ];

    /// Filter name as used in requests (without the `Range` suffix).
    pub fn name(&self) -> &'static str {
        match self {
            RangeField::PurchasePriceNet => "purchasePriceNet",
            RangeField::PurchasePriceGross => "purchasePriceGross",
            RangeField::SellPrice => "sellPrice",
            RangeField::Discount => "discount",
            RangeField::Margin => "margin",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, FilterError> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| FilterError::UnknownFilter(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// FilterSpecification
// ---------------------------------------------------------------------------

/// What subset of facts a request covers. Immutable once built.
///
/// Laboratory and category selections are resolved to product codes before they reach this
/// type, so product filters carry product codes only. `include_products = Some(empty)` means
/// the user asked for codes that resolved to nothing: it matches no fact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSpecification {
    period: Period,
    comparison_period: Option<Period>,
    include_products: Option<BTreeSet<String>>,
    include_pharmacies: BTreeSet<String>,
    exclude_products: BTreeSet<String>,
    exclude_pharmacies: BTreeSet<String>,
    range_filters: BTreeMap<String, NumericRange>,
    tva_rates: Vec<f64>,
    reimbursement: ReimbursementStatus,
    generic: GenericStatus,
    pharmacy_scope: BTreeSet<String>,
}

impl FilterSpecification {
    pub fn builder(period: Period) -> FilterSpecificationBuilder {
        FilterSpecificationBuilder {
            spec: FilterSpecification {
                period,
                comparison_period: None,
                include_products: None,
                include_pharmacies: BTreeSet::new(),
                exclude_products: BTreeSet::new(),
                exclude_pharmacies: BTreeSet::new(),
                range_filters: BTreeMap::new(),
                tva_rates: Vec::new(),
                reimbursement: ReimbursementStatus::All,
                generic: GenericStatus::All,
                pharmacy_scope: BTreeSet::new(),
            },
        }
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn comparison_period(&self) -> Option<&Period> {
        self.comparison_period.as_ref()
    }

    pub fn include_products(&self) -> Option<&BTreeSet<String>> {
        self.include_products.as_ref()
    }

    pub fn include_pharmacies(&self) -> &BTreeSet<String> {
        &self.include_pharmacies
    }

    pub fn exclude_products(&self) -> &BTreeSet<String> {
        &self.exclude_products
    }

    pub fn exclude_pharmacies(&self) -> &BTreeSet<String> {
        &self.exclude_pharmacies
    }

    pub fn range_filters(&self) -> &BTreeMap<String, NumericRange> {
        &self.range_filters
    }

    /// Sorted, deduplicated.
    pub fn tva_rates(&self) -> &[f64] {
        &self.tva_rates
    }

    pub fn reimbursement(&self) -> ReimbursementStatus {
        self.reimbursement
    }

    pub fn generic(&self) -> GenericStatus {
        self.generic
    }

    pub fn pharmacy_scope(&self) -> &BTreeSet<String> {
        &self.pharmacy_scope
    }
}

pub struct FilterSpecificationBuilder {
    spec: FilterSpecification,
}

impl FilterSpecificationBuilder {
    pub fn comparison_period(mut self, period: Option<Period>) -> Self {
        self.spec.comparison_period = period;
        self
    }

    /// Restrict to the given product codes. Repeated calls widen the universe (union).
    pub fn include_products<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec
            .include_products
            .get_or_insert_with(BTreeSet::new)
            .extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn include_pharmacies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec
            .include_pharmacies
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn exclude_products<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec
            .exclude_products
            .extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn exclude_pharmacies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec
            .exclude_pharmacies
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Named range; the name is validated when the specification is compiled.
    pub fn range(mut self, name: &str, range: NumericRange) -> Self {
        self.spec.range_filters.insert(name.to_string(), range);
        self
    }

    pub fn tva_rates(mut self, rates: &[f64]) -> Self {
        let mut rates = rates.to_vec();
        rates.sort_by(|a, b| a.total_cmp(b));
        rates.dedup();
        self.spec.tva_rates = rates;
        self
    }

    pub fn reimbursement(mut self, status: ReimbursementStatus) -> Self {
        self.spec.reimbursement = status;
        self
    }

    pub fn generic(mut self, status: GenericStatus) -> Self {
        self.spec.generic = status;
        self
    }

    pub fn pharmacy_scope<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec
            .pharmacy_scope
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> FilterSpecification {
        self.spec
    }
}
