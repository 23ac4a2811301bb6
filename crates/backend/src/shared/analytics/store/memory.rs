use async_trait::async_trait;
use chrono::NaiveDate;
use contracts::dashboards::d500_pharmacy_analytics::FactType;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{AggregateQuery, FactStore, GroupedTotals, IdentifierResolver};
use crate::shared::analytics::compiler::{GroupField, PredicateFragment, UNASSIGNED_SEGMENT};
use crate::shared::analytics::error::StoreError;
use crate::shared::analytics::filter::{NumericRange, Period, RangeField};
use crate::shared::analytics::metrics::RawTotals;

#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub code: String,
    pub name: String,
    pub laboratory_id: Option<i64>,
    /// Category levels 1 to 3
    pub categories: [Option<String>; 3],
    pub tva_rate: f64,
    pub reimbursed: bool,
    pub generic: bool,
}

#[derive(Debug, Clone)]
pub struct LaboratoryRecord {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// Prices and rates negotiated for one product in one pharmacy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostBasisRecord {
    pub purchase_price_net: f64,
    pub purchase_price_gross: f64,
    pub sell_price: f64,
    pub discount_pct: f64,
    pub margin_pct: f64,
}

impl CostBasisRecord {
    fn value(&self, field: RangeField) -> f64 {
        match field {
            RangeField::PurchasePriceNet => self.purchase_price_net,
            RangeField::PurchasePriceGross => self.purchase_price_gross,
            RangeField::SellPrice => self.sell_price,
            RangeField::Discount => self.discount_pct,
            RangeField::Margin => self.margin_pct,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaleFact {
    pub pharmacy_id: String,
    pub product_code: String,
    pub sale_date: NaiveDate,
    pub quantity: f64,
    pub unit_price_ttc: f64,
    pub tva_rate: f64,
    pub unit_cost: f64,
}

#[derive(Debug, Clone)]
pub struct PurchaseFact {
    pub pharmacy_id: String,
    pub product_code: String,
    pub order_date: NaiveDate,
    /// `None` while the order is not delivered
    pub delivery_date: Option<NaiveDate>,
    pub quantity_ordered: f64,
    pub quantity_received: f64,
    pub unit_cost: f64,
}

#[derive(Debug, Clone)]
pub struct StockFact {
    pub pharmacy_id: String,
    pub product_code: String,
    pub snapshot_date: NaiveDate,
    pub quantity: f64,
    pub unit_cost: f64,
}

/// One fact reduced to its owner and its contribution to the totals.
struct FactContribution<'a> {
    pharmacy_id: &'a str,
    product_code: &'a str,
    totals: RawTotals,
}

#[derive(Default)]
struct GroupAccumulator<'a> {
    totals: RawTotals,
    products: BTreeSet<&'a str>,
    pharmacies: BTreeSet<&'a str>,
}

/// Fact store evaluating predicates in memory. Same semantics as the SQL store:
/// a fragment on a missing product or cost basis does not match.
#[derive(Default)]
pub struct MemoryFactStore {
    products: BTreeMap<String, ProductRecord>,
    laboratories: BTreeMap<i64, LaboratoryRecord>,
    cost_basis: BTreeMap<(String, String), CostBasisRecord>,
    sales: Vec<SaleFact>,
    purchases: Vec<PurchaseFact>,
    stock: Vec<StockFact>,
    failure: Option<StoreError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_laboratory(&mut self, id: i64, code: &str, name: &str) -> &mut Self {
        self.laboratories.insert(
            id,
            LaboratoryRecord {
                id,
                code: code.to_string(),
                name: name.to_string(),
            },
        );
        self
    }

    pub fn add_product(&mut self, product: ProductRecord) -> &mut Self {
        self.products.insert(product.code.clone(), product);
        self
    }

    pub fn add_cost_basis(
        &mut self,
        pharmacy_id: &str,
        product_code: &str,
        cost: CostBasisRecord,
    ) -> &mut Self {
        self.cost_basis
            .insert((pharmacy_id.to_string(), product_code.to_string()), cost);
        self
    }

    pub fn add_sale(&mut self, sale: SaleFact) -> &mut Self {
        self.sales.push(sale);
        self
    }

    pub fn add_purchase(&mut self, purchase: PurchaseFact) -> &mut Self {
        self.purchases.push(purchase);
        self
    }

    pub fn add_stock(&mut self, snapshot: StockFact) -> &mut Self {
        self.stock.push(snapshot);
        self
    }

    /// Every subsequent call fails with `error`.
    pub fn fail_with(&mut self, error: StoreError) -> &mut Self {
        self.failure = Some(error);
        self
    }

    /// Every subsequent aggregation sleeps for `delay` first.
    pub fn with_delay(&mut self, delay: Duration) -> &mut Self {
        self.delay = Some(delay);
        self
    }

    /// Number of aggregation calls served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn product(&self, code: &str) -> Option<&ProductRecord> {
        self.products.get(code)
    }

    fn matches(&self, fragment: &PredicateFragment, pharmacy_id: &str, product_code: &str) -> bool {
        match fragment {
            PredicateFragment::PharmacyScope(ids) | PredicateFragment::PharmacyIn(ids) => {
                contains(ids, pharmacy_id)
            }
            PredicateFragment::ProductIn(codes) => contains(codes, product_code),
            PredicateFragment::PharmacyNotIn(ids) => !contains(ids, pharmacy_id),
            PredicateFragment::ProductNotIn(codes) => !contains(codes, product_code),
            PredicateFragment::Range { field, min, max } => self
                .cost_basis
                .get(&(pharmacy_id.to_string(), product_code.to_string()))
                .map_or(false, |c| {
                    NumericRange::new(*min, *max).contains(c.value(*field))
                }),
            PredicateFragment::TvaRateIn(rates) => self.product(product_code).map_or(false, |p| {
                rates.iter().any(|r| round2(*r) == round2(p.tva_rate))
            }),
            PredicateFragment::Reimbursed(flag) => self
                .product(product_code)
                .map_or(false, |p| p.reimbursed == *flag),
            PredicateFragment::Generic(flag) => self
                .product(product_code)
                .map_or(false, |p| p.generic == *flag),
        }
    }

    fn group_key(&self, field: GroupField, product_code: &str) -> String {
        let product = self.product(product_code);
        let value = match field {
            GroupField::Category1 => product.and_then(|p| p.categories[0].clone()),
            GroupField::Category2 => product.and_then(|p| p.categories[1].clone()),
            GroupField::Category3 => product.and_then(|p| p.categories[2].clone()),
            GroupField::Laboratory => product
                .and_then(|p| p.laboratory_id)
                .and_then(|id| self.laboratories.get(&id))
                .map(|l| l.name.clone()),
            GroupField::Product => Some(
                product
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| product_code.to_string()),
            ),
        };
        value.unwrap_or_else(|| UNASSIGNED_SEGMENT.to_string())
    }

    fn contributions(&self, fact_type: FactType, period: &Period) -> Vec<FactContribution<'_>> {
        match fact_type {
            FactType::Sales => self
                .sales
                .iter()
                .filter(|s| period.contains(s.sale_date))
                .map(|s| {
                    let net_price = s.unit_price_ttc / (1.0 + s.tva_rate / 100.0);
                    FactContribution {
                        pharmacy_id: &s.pharmacy_id,
                        product_code: &s.product_code,
                        totals: RawTotals {
                            fact_count: 1,
                            quantity_sold: s.quantity,
                            revenue_gross: s.quantity * s.unit_price_ttc,
                            revenue_net: s.quantity * net_price,
                            margin: s.quantity * (net_price - s.unit_cost),
                            ..RawTotals::default()
                        },
                    }
                })
                .collect(),
            FactType::Purchases => self
                .purchases
                .iter()
                .filter(|p| p.delivery_date.map_or(false, |d| period.contains(d)))
                .map(|p| FactContribution {
                    pharmacy_id: &p.pharmacy_id,
                    product_code: &p.product_code,
                    totals: RawTotals {
                        fact_count: 1,
                        quantity_ordered: p.quantity_ordered,
                        quantity_received: p.quantity_received,
                        purchase_amount: p.quantity_received * p.unit_cost,
                        ..RawTotals::default()
                    },
                })
                .collect(),
            FactType::Stock => {
                let mut latest: BTreeMap<(&str, &str), NaiveDate> = BTreeMap::new();
                for s in self.stock.iter().filter(|s| period.contains(s.snapshot_date)) {
                    let entry = latest
                        .entry((s.pharmacy_id.as_str(), s.product_code.as_str()))
                        .or_insert(s.snapshot_date);
                    if s.snapshot_date > *entry {
                        *entry = s.snapshot_date;
                    }
                }
                self.stock
                    .iter()
                    .filter(|s| {
                        latest.get(&(s.pharmacy_id.as_str(), s.product_code.as_str()))
                            == Some(&s.snapshot_date)
                    })
                    .map(|s| FactContribution {
                        pharmacy_id: &s.pharmacy_id,
                        product_code: &s.product_code,
                        totals: RawTotals {
                            fact_count: 1,
                            stock_quantity: s.quantity,
                            stock_value: s.quantity * s.unit_cost,
                            ..RawTotals::default()
                        },
                    })
                    .collect()
            }
        }
    }

    fn collect(&self, query: &AggregateQuery<'_>, group_by: &[GroupField]) -> Vec<GroupedTotals> {
        let mut groups: BTreeMap<Vec<String>, GroupAccumulator<'_>> = BTreeMap::new();

        for fact in self.contributions(query.fact_type, query.period) {
            let matched = query
                .predicate
                .fragments()
                .iter()
                .all(|f| self.matches(f, fact.pharmacy_id, fact.product_code));
            if !matched {
                continue;
            }

            let keys = group_by
                .iter()
                .map(|field| self.group_key(*field, fact.product_code))
                .collect();
            let group = groups.entry(keys).or_default();
            add(&mut group.totals, &fact.totals);
            group.products.insert(fact.product_code);
            group.pharmacies.insert(fact.pharmacy_id);
        }

        groups
            .into_iter()
            .map(|(keys, group)| {
                let mut totals = group.totals;
                totals.distinct_products = group.products.len() as i64;
                totals.distinct_pharmacies = group.pharmacies.len() as i64;
                GroupedTotals { keys, totals }
            })
            .collect()
    }

    fn collect_with_sales(
        &self,
        query: &AggregateQuery<'_>,
        group_by: &[GroupField],
    ) -> Vec<GroupedTotals> {
        let mut groups = self.collect(query, group_by);
        if query.fact_type == FactType::Stock {
            let sales_query = AggregateQuery {
                fact_type: FactType::Sales,
                ..*query
            };
            let sold: BTreeMap<Vec<String>, f64> = self
                .collect(&sales_query, group_by)
                .into_iter()
                .map(|g| (g.keys, g.totals.quantity_sold))
                .collect();
            for group in &mut groups {
                group.totals.quantity_sold = sold.get(&group.keys).copied().unwrap_or(0.0);
            }
        }
        groups
    }
}

fn contains(list: &[String], value: &str) -> bool {
    list.iter().any(|v| v == value)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn add(acc: &mut RawTotals, fact: &RawTotals) {
    acc.fact_count += fact.fact_count;
    acc.quantity_sold += fact.quantity_sold;
    acc.revenue_gross += fact.revenue_gross;
    acc.revenue_net += fact.revenue_net;
    acc.margin += fact.margin;
    acc.quantity_ordered += fact.quantity_ordered;
    acc.quantity_received += fact.quantity_received;
    acc.purchase_amount += fact.purchase_amount;
    acc.stock_quantity += fact.stock_quantity;
    acc.stock_value += fact.stock_value;
}

#[async_trait]
impl FactStore for MemoryFactStore {
    async fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<RawTotals, StoreError> {
        self.enter().await?;
        let mut totals = self
            .collect_with_sales(query, &[])
            .into_iter()
            .next()
            .map(|g| g.totals)
            .unwrap_or_default();

        if query.fact_type == FactType::Stock && totals.fact_count == 0 {
            // no snapshot but sales may still exist
            let sales_query = AggregateQuery {
                fact_type: FactType::Sales,
                ..*query
            };
            totals.quantity_sold = self
                .collect(&sales_query, &[])
                .first()
                .map_or(0.0, |g| g.totals.quantity_sold);
        }
        Ok(totals)
    }

    async fn aggregate_grouped(
        &self,
        query: &AggregateQuery<'_>,
        group_by: &[GroupField],
    ) -> Result<Vec<GroupedTotals>, StoreError> {
        self.enter().await?;
        Ok(self.collect_with_sales(query, group_by))
    }
}

#[async_trait]
impl IdentifierResolver for MemoryFactStore {
    async fn products_for_laboratories(
        &self,
        codes: &[String],
    ) -> Result<BTreeSet<String>, StoreError> {
        let ids: BTreeSet<i64> = self
            .laboratories
            .values()
            .filter(|l| codes.contains(&l.code))
            .map(|l| l.id)
            .collect();
        Ok(self
            .products
            .values()
            .filter(|p| p.laboratory_id.map_or(false, |id| ids.contains(&id)))
            .map(|p| p.code.clone())
            .collect())
    }

    async fn products_for_categories(
        &self,
        codes: &[String],
    ) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .products
            .values()
            .filter(|p| p.categories.iter().flatten().any(|c| codes.contains(c)))
            .map(|p| p.code.clone())
            .collect())
    }
}

/// Small pharmacy network used by the engine and service tests.
///
/// Two pharmacies (PH1, PH2), two laboratories, four products:
///
/// | product | lab    | category1   | category2  | tva | reimbursed | generic |
/// |---------|--------|-------------|------------|-----|------------|---------|
/// | DOLI    | SANOFI | Antalgiques | Paracétamol| 2.1 | yes        | no      |
/// | EFFE    | UPSA   | Antalgiques | Paracétamol| 2.1 | yes        | yes     |
/// | IBU     | UPSA   | Antalgiques | AINS       | 5.5 | no         | yes     |
/// | VITC    | -      | Vitamines   | -          | 20  | no         | no      |
///
/// January 2024 sales (gross revenue): DOLI 100 @PH1 + 100 @PH2, EFFE 300 @PH1, IBU 200 @PH2,
/// VITC 300 @PH1. December 2023 holds 800 of revenue on DOLI @PH1.
pub(crate) fn sample_store() -> MemoryFactStore {
    let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
    let product = |code: &str, lab: Option<i64>, c1: Option<&str>, c2: Option<&str>, tva: f64, reimbursed: bool, generic: bool| {
        ProductRecord {
            code: code.to_string(),
            name: code.to_string(),
            laboratory_id: lab,
            categories: [c1.map(String::from), c2.map(String::from), None],
            tva_rate: tva,
            reimbursed,
            generic,
        }
    };
    let sale = |ph: &str, code: &str, day: &str, quantity: f64, price: f64, cost: f64| SaleFact {
        pharmacy_id: ph.to_string(),
        product_code: code.to_string(),
        sale_date: date(day),
        quantity,
        unit_price_ttc: price,
        tva_rate: 0.0,
        unit_cost: cost,
    };

    let mut store = MemoryFactStore::new();
    store
        .add_laboratory(1, "SANOFI", "Sanofi")
        .add_laboratory(2, "UPSA", "Upsa")
        .add_product(product("DOLI", Some(1), Some("Antalgiques"), Some("Paracétamol"), 2.1, true, false))
        .add_product(product("EFFE", Some(2), Some("Antalgiques"), Some("Paracétamol"), 2.1, true, true))
        .add_product(product("IBU", Some(2), Some("Antalgiques"), Some("AINS"), 5.5, false, true))
        .add_product(product("VITC", None, Some("Vitamines"), None, 20.0, false, false))
        .add_cost_basis(
            "PH1",
            "DOLI",
            CostBasisRecord {
                purchase_price_net: 1.5,
                purchase_price_gross: 2.0,
                sell_price: 2.5,
                discount_pct: 10.0,
                margin_pct: 40.0,
            },
        )
        .add_cost_basis(
            "PH1",
            "EFFE",
            CostBasisRecord {
                purchase_price_net: 3.0,
                purchase_price_gross: 3.5,
                sell_price: 5.0,
                discount_pct: 5.0,
                margin_pct: 20.0,
            },
        )
        .add_sale(sale("PH1", "DOLI", "2024-01-05", 40.0, 2.5, 1.5))
        .add_sale(sale("PH2", "DOLI", "2024-01-10", 40.0, 2.5, 1.5))
        .add_sale(sale("PH1", "EFFE", "2024-01-12", 60.0, 5.0, 3.0))
        .add_sale(sale("PH2", "IBU", "2024-01-20", 50.0, 4.0, 2.0))
        .add_sale(sale("PH1", "VITC", "2024-01-25", 30.0, 10.0, 6.0))
        .add_sale(sale("PH1", "DOLI", "2023-12-15", 320.0, 2.5, 1.5))
        .add_purchase(PurchaseFact {
            pharmacy_id: "PH1".into(),
            product_code: "DOLI".into(),
            order_date: date("2024-01-02"),
            delivery_date: Some(date("2024-01-04")),
            quantity_ordered: 100.0,
            quantity_received: 80.0,
            unit_cost: 1.5,
        })
        .add_purchase(PurchaseFact {
            pharmacy_id: "PH1".into(),
            product_code: "EFFE".into(),
            order_date: date("2024-01-28"),
            delivery_date: None,
            quantity_ordered: 50.0,
            quantity_received: 0.0,
            unit_cost: 3.0,
        })
        .add_stock(StockFact {
            pharmacy_id: "PH1".into(),
            product_code: "DOLI".into(),
            snapshot_date: date("2024-01-15"),
            quantity: 90.0,
            unit_cost: 1.5,
        })
        .add_stock(StockFact {
            pharmacy_id: "PH1".into(),
            product_code: "DOLI".into(),
            snapshot_date: date("2024-01-31"),
            quantity: 62.0,
            unit_cost: 1.5,
        });
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::analytics::compiler::{CompiledPredicate, QueryCompiler};
    use crate::shared::analytics::filter::FilterSpecification;

    fn january() -> Period {
        Period::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    fn compile(spec: FilterSpecification) -> CompiledPredicate {
        QueryCompiler::compile(&spec).unwrap()
    }

    #[tokio::test]
    async fn test_sales_totals() {
        let store = sample_store();
        let period = january();
        let predicate = CompiledPredicate::default();
        let totals = store
            .aggregate(&AggregateQuery {
                predicate: &predicate,
                period: &period,
                fact_type: FactType::Sales,
            })
            .await
            .unwrap();

        assert_eq!(totals.fact_count, 5);
        assert_eq!(totals.quantity_sold, 220.0);
        assert_eq!(totals.revenue_gross, 1000.0);
        assert_eq!(totals.distinct_products, 4);
        assert_eq!(totals.distinct_pharmacies, 2);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_cost_basis_range_drops_facts_without_cost() {
        let store = sample_store();
        let period = january();
        let predicate = compile(
            FilterSpecification::builder(period)
                .range("margin", NumericRange::new(Some(30.0), None))
                .build(),
        );
        let totals = store
            .aggregate(&AggregateQuery {
                predicate: &predicate,
                period: &period,
                fact_type: FactType::Sales,
            })
            .await
            .unwrap();

        // only DOLI @PH1 has a cost basis with margin >= 30
        assert_eq!(totals.revenue_gross, 100.0);
    }

    #[tokio::test]
    async fn test_stock_uses_latest_snapshot_and_sales() {
        let store = sample_store();
        let period = january();
        let predicate = compile(
            FilterSpecification::builder(period)
                .include_products(["DOLI"])
                .pharmacy_scope(["PH1"])
                .build(),
        );
        let totals = store
            .aggregate(&AggregateQuery {
                predicate: &predicate,
                period: &period,
                fact_type: FactType::Stock,
            })
            .await
            .unwrap();

        assert_eq!(totals.stock_quantity, 62.0);
        assert_eq!(totals.stock_value, 93.0);
        assert_eq!(totals.quantity_sold, 40.0);
    }

    #[tokio::test]
    async fn test_undelivered_purchases_are_ignored() {
        let store = sample_store();
        let period = january();
        let predicate = CompiledPredicate::default();
        let totals = store
            .aggregate(&AggregateQuery {
                predicate: &predicate,
                period: &period,
                fact_type: FactType::Purchases,
            })
            .await
            .unwrap();

        assert_eq!(totals.quantity_ordered, 100.0);
        assert_eq!(totals.quantity_received, 80.0);
        assert_eq!(totals.purchase_amount, 120.0);
    }

    #[tokio::test]
    async fn test_grouping_by_laboratory() {
        let store = sample_store();
        let period = january();
        let predicate = CompiledPredicate::default();
        let groups = store
            .aggregate_grouped(
                &AggregateQuery {
                    predicate: &predicate,
                    period: &period,
                    fact_type: FactType::Sales,
                },
                &[GroupField::Laboratory],
            )
            .await
            .unwrap();

        let revenue: Vec<(String, f64)> = groups
            .into_iter()
            .map(|g| (g.keys[0].clone(), g.totals.revenue_gross))
            .collect();
        assert_eq!(
            revenue,
            vec![
                (UNASSIGNED_SEGMENT.to_string(), 300.0),
                ("Sanofi".to_string(), 200.0),
                ("Upsa".to_string(), 500.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolver() {
        let store = sample_store();
        let upsa = store
            .products_for_laboratories(&["UPSA".to_string()])
            .await
            .unwrap();
        assert_eq!(upsa.into_iter().collect::<Vec<_>>(), vec!["EFFE", "IBU"]);

        let ains = store
            .products_for_categories(&["AINS".to_string()])
            .await
            .unwrap();
        assert_eq!(ains.into_iter().collect::<Vec<_>>(), vec!["IBU"]);
    }

    #[tokio::test]
    async fn test_failure_hook() {
        let mut store = sample_store();
        store.fail_with(StoreError::Unavailable("down".into()));
        let period = january();
        let predicate = CompiledPredicate::default();
        let result = store
            .aggregate(&AggregateQuery {
                predicate: &predicate,
                period: &period,
                fact_type: FactType::Sales,
            })
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
