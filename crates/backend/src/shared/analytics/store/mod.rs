#[cfg(test)]
pub mod memory;
pub mod sql;

use async_trait::async_trait;
use contracts::dashboards::d500_pharmacy_analytics::FactType;
use std::collections::BTreeSet;

use super::compiler::{CompiledPredicate, GroupField};
use super::error::StoreError;
use super::filter::Period;
use super::metrics::RawTotals;

#[cfg(test)]
pub use memory::MemoryFactStore;
pub use sql::SqlFactStore;

/// One aggregation request against a fact table.
#[derive(Debug, Clone, Copy)]
pub struct AggregateQuery<'a> {
    pub predicate: &'a CompiledPredicate,
    pub period: &'a Period,
    pub fact_type: FactType,
}

/// Totals for one combination of grouping keys.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedTotals {
    pub keys: Vec<String>,
    pub totals: RawTotals,
}

/// Read-only access to sales, purchase and stock facts.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Totals over every fact matching the query.
    async fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<RawTotals, StoreError>;

    /// Totals per combination of `group_by` values, ordered by keys ascending.
    async fn aggregate_grouped(
        &self,
        query: &AggregateQuery<'_>,
        group_by: &[GroupField],
    ) -> Result<Vec<GroupedTotals>, StoreError>;
}

/// Resolves laboratory and category codes to the product codes they cover.
#[async_trait]
pub trait IdentifierResolver: Send + Sync {
    async fn products_for_laboratories(
        &self,
        codes: &[String],
    ) -> Result<BTreeSet<String>, StoreError>;

    /// Categories match on any of the three levels.
    async fn products_for_categories(
        &self,
        codes: &[String],
    ) -> Result<BTreeSet<String>, StoreError>;
}
