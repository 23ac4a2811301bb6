use async_trait::async_trait;
use contracts::dashboards::d500_pharmacy_analytics::FactType;
use sea_orm::{DatabaseBackend, DatabaseConnection, FromQueryResult, Statement, Value};
use std::collections::{BTreeMap, BTreeSet};

use super::{AggregateQuery, FactStore, GroupedTotals, IdentifierResolver};
use crate::shared::analytics::compiler::{
    GroupField, JoinKind, PredicateFragment, UNASSIGNED_SEGMENT,
};
use crate::shared::analytics::error::StoreError;
use crate::shared::analytics::filter::RangeField;
use crate::shared::analytics::metrics::RawTotals;

/// Result of query building
#[derive(Debug, Clone)]
pub struct SqlQuery {
    /// SQL query string
    pub sql: String,
    /// Bound parameters, in placeholder order
    pub params: Vec<Value>,
}

/// Translates an aggregation query and its predicate AST into parameterized SQLite.
///
/// Aliases: `f` fact table, `p` products, `l` laboratories, `c` pharmacy/product cost basis.
pub struct AggregateSqlBuilder<'a> {
    query: AggregateQuery<'a>,
    group_by: &'a [GroupField],
}

impl<'a> AggregateSqlBuilder<'a> {
    pub fn new(query: AggregateQuery<'a>, group_by: &'a [GroupField]) -> Self {
        Self { query, group_by }
    }

    /// Build the SQL query
    pub fn build(&self) -> SqlQuery {
        let mut params = Vec::new();

        let select_clause = self.build_select_clause();
        let from_clause = self.build_from_clause(&mut params);
        let join_clause = self.build_join_clause();
        let where_clause = self.build_where_clause(&mut params);
        let group_by_clause = self.build_group_by_clause();

        let mut sql = format!("SELECT {} FROM {}", select_clause, from_clause);

        if !join_clause.is_empty() {
            sql.push_str(&format!(" {}", join_clause));
        }

        if !where_clause.is_empty() {
            sql.push_str(&format!(" WHERE {}", where_clause));
        }

        if !group_by_clause.is_empty() {
            sql.push_str(&format!(
                " GROUP BY {} ORDER BY {}",
                group_by_clause, group_by_clause
            ));
        }

        SqlQuery { sql, params }
    }

    /// Grouping keys followed by every total column
    fn build_select_clause(&self) -> String {
        let mut columns = Vec::new();

        for (i, alias) in ["key1", "key2"].iter().enumerate() {
            match self.group_by.get(i) {
                Some(field) => columns.push(format!("{} AS {}", group_expr(*field), alias)),
                None => columns.push(format!("NULL AS {}", alias)),
            }
        }

        columns.push("COUNT(*) AS fact_count".to_string());
        for (alias, expr) in total_exprs(self.query.fact_type) {
            let column = match expr {
                Some(e) => format!("CAST(COALESCE(SUM({}), 0) AS REAL) AS {}", e, alias),
                None => format!("0.0 AS {}", alias),
            };
            columns.push(column);
        }
        columns.push("COUNT(DISTINCT f.product_code) AS distinct_products".to_string());
        columns.push("COUNT(DISTINCT f.pharmacy_id) AS distinct_pharmacies".to_string());

        columns.join(", ")
    }

    fn build_from_clause(&self, params: &mut Vec<Value>) -> String {
        match self.query.fact_type {
            FactType::Sales => "sales f".to_string(),
            FactType::Purchases => "purchases f".to_string(),
            FactType::Stock => {
                // latest snapshot per pharmacy/product inside the period
                params.push(self.query.period.start_str().into());
                params.push(self.query.period.end_str().into());
                "stock_snapshots f \
                 JOIN (SELECT s.pharmacy_id, s.product_code, MAX(s.snapshot_date) AS last_date \
                 FROM stock_snapshots s WHERE s.snapshot_date BETWEEN ? AND ? \
                 GROUP BY s.pharmacy_id, s.product_code) ls \
                 ON ls.pharmacy_id = f.pharmacy_id AND ls.product_code = f.product_code \
                 AND ls.last_date = f.snapshot_date"
                    .to_string()
            }
        }
    }

    fn required_joins(&self) -> BTreeSet<JoinKind> {
        let mut joins = self.query.predicate.required_joins().clone();
        for field in self.group_by {
            joins.extend(field.required_joins().iter().copied());
        }
        if joins.contains(&JoinKind::Laboratory) {
            joins.insert(JoinKind::ProductAttributes);
        }
        joins
    }

    /// Build JOIN clause; the product join always precedes the laboratory join
    fn build_join_clause(&self) -> String {
        self.required_joins()
            .into_iter()
            .map(|join| match join {
                JoinKind::ProductAttributes => "LEFT JOIN products p ON p.code = f.product_code",
                JoinKind::Laboratory => "LEFT JOIN laboratories l ON l.id = p.laboratory_id",
                JoinKind::CostBasis => {
                    "LEFT JOIN pharmacy_product_prices c \
                     ON c.pharmacy_id = f.pharmacy_id AND c.product_code = f.product_code"
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build_where_clause(&self, params: &mut Vec<Value>) -> String {
        let mut conditions = Vec::new();

        if let Some(date_column) = date_column(self.query.fact_type) {
            conditions.push(format!("{} BETWEEN ? AND ?", date_column));
            params.push(self.query.period.start_str().into());
            params.push(self.query.period.end_str().into());
        }

        for fragment in self.query.predicate.fragments() {
            conditions.push(fragment_to_sql(fragment, params));
        }

        conditions.join(" AND ")
    }

    fn build_group_by_clause(&self) -> String {
        ["key1", "key2"]
            .iter()
            .take(self.group_by.len())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn date_column(fact_type: FactType) -> Option<&'static str> {
    match fact_type {
        FactType::Sales => Some("f.sale_date"),
        FactType::Purchases => Some("f.delivery_date"),
        // bounded by the latest-snapshot join
        FactType::Stock => None,
    }
}

const NET_UNIT_PRICE: &str = "(f.unit_price_ttc / (1 + f.tva_rate / 100.0))";

/// (alias, summed expression); `None` when the column does not apply to the fact type.
fn total_exprs(fact_type: FactType) -> Vec<(&'static str, Option<String>)> {
    let sales = fact_type == FactType::Sales;
    let purchases = fact_type == FactType::Purchases;
    let stock = fact_type == FactType::Stock;

    let when = |cond: bool, expr: String| if cond { Some(expr) } else { None };

    vec![
        ("quantity_sold", when(sales, "f.quantity".into())),
        ("revenue_gross", when(sales, "f.quantity * f.unit_price_ttc".into())),
        (
            "revenue_net",
            when(sales, format!("f.quantity * {}", NET_UNIT_PRICE)),
        ),
        (
            "margin",
            when(
                sales,
                format!("f.quantity * ({} - f.unit_cost)", NET_UNIT_PRICE),
            ),
        ),
        ("quantity_ordered", when(purchases, "f.quantity_ordered".into())),
        ("quantity_received", when(purchases, "f.quantity_received".into())),
        (
            "purchase_amount",
            when(purchases, "f.quantity_received * f.unit_cost".into()),
        ),
        ("stock_quantity", when(stock, "f.quantity".into())),
        ("stock_value", when(stock, "f.quantity * f.unit_cost".into())),
    ]
}

fn group_expr(field: GroupField) -> String {
    let column = match field {
        GroupField::Category1 => "p.category_l1",
        GroupField::Category2 => "p.category_l2",
        GroupField::Category3 => "p.category_l3",
        GroupField::Laboratory => "l.name",
        GroupField::Product => "COALESCE(p.name, f.product_code)",
    };
    format!("COALESCE({}, '{}')", column, UNASSIGNED_SEGMENT)
}

fn range_column(field: RangeField) -> &'static str {
    match field {
        RangeField::PurchasePriceNet => "c.purchase_price_net",
        RangeField::PurchasePriceGross => "c.purchase_price_gross",
        RangeField::SellPrice => "c.sell_price",
        RangeField::Discount => "c.discount_pct",
        RangeField::Margin => "c.margin_pct",
    }
}

fn in_list(column: &str, values: &[String], negated: bool, params: &mut Vec<Value>) -> String {
    if values.is_empty() {
        // IN () matches nothing, NOT IN () matches everything
        return if negated { "1 = 1".into() } else { "1 = 0".into() };
    }
    let placeholders = vec!["?"; values.len()].join(", ");
    params.extend(values.iter().map(|v| Value::from(v.clone())));
    if negated {
        format!("{} NOT IN ({})", column, placeholders)
    } else {
        format!("{} IN ({})", column, placeholders)
    }
}

/// Build SQL fragment from a predicate fragment
pub fn fragment_to_sql(fragment: &PredicateFragment, params: &mut Vec<Value>) -> String {
    match fragment {
        PredicateFragment::PharmacyScope(ids) | PredicateFragment::PharmacyIn(ids) => {
            in_list("f.pharmacy_id", ids, false, params)
        }
        PredicateFragment::ProductIn(codes) => in_list("f.product_code", codes, false, params),
        PredicateFragment::PharmacyNotIn(ids) => in_list("f.pharmacy_id", ids, true, params),
        PredicateFragment::ProductNotIn(codes) => {
            in_list("f.product_code", codes, true, params)
        }
        PredicateFragment::Range { field, min, max } => {
            let column = range_column(*field);
            match (min, max) {
                (Some(lo), Some(hi)) => {
                    params.push((*lo).into());
                    params.push((*hi).into());
                    format!("{} BETWEEN ? AND ?", column)
                }
                (Some(lo), None) => {
                    params.push((*lo).into());
                    format!("{} >= ?", column)
                }
                (None, Some(hi)) => {
                    params.push((*hi).into());
                    format!("{} <= ?", column)
                }
                // the compiler never emits an unbounded range
                (None, None) => "1 = 1".into(),
            }
        }
        PredicateFragment::TvaRateIn(rates) => {
            let placeholders = vec!["?"; rates.len()].join(", ");
            params.extend(
                rates
                    .iter()
                    .map(|r| Value::from((r * 100.0).round() / 100.0)),
            );
            format!("ROUND(p.tva_rate, 2) IN ({})", placeholders)
        }
        PredicateFragment::Reimbursed(flag) => {
            params.push(i64::from(*flag).into());
            "p.is_reimbursed = ?".into()
        }
        PredicateFragment::Generic(flag) => {
            params.push(i64::from(*flag).into());
            "p.is_generic = ?".into()
        }
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[derive(Debug, FromQueryResult)]
struct TotalsRow {
    key1: Option<String>,
    key2: Option<String>,
    fact_count: i64,
    quantity_sold: f64,
    revenue_gross: f64,
    revenue_net: f64,
    margin: f64,
    quantity_ordered: f64,
    quantity_received: f64,
    purchase_amount: f64,
    stock_quantity: f64,
    stock_value: f64,
    distinct_products: i64,
    distinct_pharmacies: i64,
}

impl TotalsRow {
    fn keys(&self, count: usize) -> Vec<String> {
        [&self.key1, &self.key2]
            .into_iter()
            .take(count)
            .map(|k| k.clone().unwrap_or_else(|| UNASSIGNED_SEGMENT.to_string()))
            .collect()
    }

    fn totals(&self) -> RawTotals {
        RawTotals {
            fact_count: self.fact_count,
            quantity_sold: self.quantity_sold,
            revenue_gross: self.revenue_gross,
            revenue_net: self.revenue_net,
            margin: self.margin,
            quantity_ordered: self.quantity_ordered,
            quantity_received: self.quantity_received,
            purchase_amount: self.purchase_amount,
            stock_quantity: self.stock_quantity,
            stock_value: self.stock_value,
            distinct_products: self.distinct_products,
            distinct_pharmacies: self.distinct_pharmacies,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct CodeRow {
    code: String,
}

/// Fact store backed by the SQLite database.
#[derive(Clone)]
pub struct SqlFactStore {
    db: DatabaseConnection,
}

impl SqlFactStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn fetch(&self, query: SqlQuery) -> Result<Vec<TotalsRow>, StoreError> {
        tracing::debug!("fact store sql: {} ({} params)", query.sql, query.params.len());
        let stmt =
            Statement::from_sql_and_values(DatabaseBackend::Sqlite, &query.sql, query.params);
        Ok(TotalsRow::find_by_statement(stmt).all(&self.db).await?)
    }

    async fn grouped(
        &self,
        query: &AggregateQuery<'_>,
        group_by: &[GroupField],
    ) -> Result<Vec<GroupedTotals>, StoreError> {
        let rows = self
            .fetch(AggregateSqlBuilder::new(*query, group_by).build())
            .await?;
        Ok(rows
            .iter()
            .map(|row| GroupedTotals {
                keys: row.keys(group_by.len()),
                totals: row.totals(),
            })
            .collect())
    }

    async fn codes(&self, sql: String, params: Vec<Value>) -> Result<BTreeSet<String>, StoreError> {
        let stmt = Statement::from_sql_and_values(DatabaseBackend::Sqlite, &sql, params);
        let rows = CodeRow::find_by_statement(stmt).all(&self.db).await?;
        Ok(rows.into_iter().map(|r| r.code).collect())
    }
}

/// Stock coverage needs units sold over the same period and filters.
fn sales_query<'a>(query: &AggregateQuery<'a>) -> AggregateQuery<'a> {
    AggregateQuery {
        fact_type: FactType::Sales,
        ..*query
    }
}

#[async_trait]
impl FactStore for SqlFactStore {
    async fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<RawTotals, StoreError> {
        let rows = self
            .fetch(AggregateSqlBuilder::new(*query, &[]).build())
            .await?;
        let mut totals = rows.first().map(TotalsRow::totals).unwrap_or_default();

        if query.fact_type == FactType::Stock {
            let sold = self
                .fetch(AggregateSqlBuilder::new(sales_query(query), &[]).build())
                .await?;
            totals.quantity_sold = sold.first().map_or(0.0, |r| r.quantity_sold);
        }

        Ok(totals)
    }

    async fn aggregate_grouped(
        &self,
        query: &AggregateQuery<'_>,
        group_by: &[GroupField],
    ) -> Result<Vec<GroupedTotals>, StoreError> {
        let mut groups = self.grouped(query, group_by).await?;

        if query.fact_type == FactType::Stock {
            let sold: BTreeMap<Vec<String>, f64> = self
                .grouped(&sales_query(query), group_by)
                .await?
                .into_iter()
                .map(|g| (g.keys, g.totals.quantity_sold))
                .collect();
            for group in &mut groups {
                group.totals.quantity_sold = sold.get(&group.keys).copied().unwrap_or(0.0);
            }
        }

        Ok(groups)
    }
}

#[async_trait]
impl IdentifierResolver for SqlFactStore {
    async fn products_for_laboratories(
        &self,
        codes: &[String],
    ) -> Result<BTreeSet<String>, StoreError> {
        if codes.is_empty() {
            return Ok(BTreeSet::new());
        }
        let mut params = Vec::new();
        let condition = in_list("l.code", codes, false, &mut params);
        let sql = format!(
            "SELECT p.code AS code FROM products p \
             JOIN laboratories l ON l.id = p.laboratory_id WHERE {}",
            condition
        );
        self.codes(sql, params).await
    }

    async fn products_for_categories(
        &self,
        codes: &[String],
    ) -> Result<BTreeSet<String>, StoreError> {
        if codes.is_empty() {
            return Ok(BTreeSet::new());
        }
        let mut params = Vec::new();
        let conditions: Vec<String> = ["p.category_l1", "p.category_l2", "p.category_l3"]
            .iter()
            .map(|column| in_list(column, codes, false, &mut params))
            .collect();
        let sql = format!(
            "SELECT p.code AS code FROM products p WHERE {}",
            conditions.join(" OR ")
        );
        self.codes(sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::analytics::compiler::{CompiledPredicate, QueryCompiler};
    use crate::shared::analytics::filter::{FilterSpecification, NumericRange, Period};
    use chrono::NaiveDate;
    use contracts::dashboards::d500_pharmacy_analytics::GenericStatus;

    fn january() -> Period {
        Period::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_unfiltered_sales_query() {
        let period = january();
        let predicate = QueryCompiler::compile(&FilterSpecification::builder(period).build())
            .unwrap();
        let query = AggregateQuery {
            predicate: &predicate,
            period: &period,
            fact_type: FactType::Sales,
        };

        let result = AggregateSqlBuilder::new(query, &[]).build();

        assert!(result.sql.starts_with("SELECT NULL AS key1, NULL AS key2, COUNT(*)"));
        assert!(result.sql.contains("FROM sales f WHERE f.sale_date BETWEEN ? AND ?"));
        assert!(result.sql.contains("AS revenue_gross"));
        assert!(result.sql.contains("0.0 AS stock_quantity"));
        assert!(!result.sql.contains("JOIN"));
        assert!(!result.sql.contains("GROUP BY"));
        assert_eq!(
            result.params,
            vec![Value::from("2024-01-01".to_string()), Value::from("2024-01-31".to_string())]
        );
    }

    #[test]
    fn test_filters_translate_in_order() {
        let period = january();
        let spec = FilterSpecification::builder(period)
            .pharmacy_scope(["PH1"])
            .include_products(["A", "B"])
            .exclude_products(["X"])
            .range("margin", NumericRange::new(Some(10.0), Some(40.0)))
            .generic(GenericStatus::Generic)
            .build();
        let predicate = QueryCompiler::compile(&spec).unwrap();
        let query = AggregateQuery {
            predicate: &predicate,
            period: &period,
            fact_type: FactType::Purchases,
        };

        let result = AggregateSqlBuilder::new(query, &[]).build();

        assert!(result.sql.contains(
            "FROM purchases f LEFT JOIN products p ON p.code = f.product_code \
             LEFT JOIN pharmacy_product_prices c"
        ));
        assert!(result.sql.contains(
            "WHERE f.delivery_date BETWEEN ? AND ? AND f.pharmacy_id IN (?) \
             AND f.product_code IN (?, ?) AND f.product_code NOT IN (?) \
             AND c.margin_pct BETWEEN ? AND ? AND p.is_generic = ?"
        ));
        assert_eq!(
            result.params,
            vec![
                Value::from("2024-01-01".to_string()),
                Value::from("2024-01-31".to_string()),
                Value::from("PH1".to_string()),
                Value::from("A".to_string()),
                Value::from("B".to_string()),
                Value::from("X".to_string()),
                Value::from(10.0),
                Value::from(40.0),
                Value::from(1i64),
            ]
        );
    }

    #[test]
    fn test_grouped_stock_query() {
        let period = january();
        let predicate = QueryCompiler::compile(
            &FilterSpecification::builder(period).tva_rates(&[5.5]).build(),
        )
        .unwrap();
        let query = AggregateQuery {
            predicate: &predicate,
            period: &period,
            fact_type: FactType::Stock,
        };
        let group_by = [GroupField::Category1, GroupField::Laboratory];

        let result = AggregateSqlBuilder::new(query, &group_by).build();

        assert!(result.sql.contains("COALESCE(p.category_l1, '(non classé)') AS key1"));
        assert!(result.sql.contains("COALESCE(l.name, '(non classé)') AS key2"));
        assert!(result.sql.contains("MAX(s.snapshot_date) AS last_date"));
        assert!(result.sql.contains(
            "LEFT JOIN products p ON p.code = f.product_code \
             LEFT JOIN laboratories l ON l.id = p.laboratory_id"
        ));
        assert!(result.sql.ends_with("GROUP BY key1, key2 ORDER BY key1, key2"));
        // snapshot window first, then the TVA filter; no date condition in WHERE
        assert_eq!(
            result.params,
            vec![
                Value::from("2024-01-01".to_string()),
                Value::from("2024-01-31".to_string()),
                Value::from(5.5),
            ]
        );
    }

    #[test]
    fn test_empty_lists() {
        let mut params = Vec::new();
        assert_eq!(
            fragment_to_sql(&PredicateFragment::ProductIn(vec![]), &mut params),
            "1 = 0"
        );
        assert_eq!(
            fragment_to_sql(&PredicateFragment::ProductNotIn(vec![]), &mut params),
            "1 = 1"
        );
        assert!(params.is_empty());
    }

    async fn seeded_store() -> SqlFactStore {
        use sea_orm::{ConnectOptions, ConnectionTrait, Database};

        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        db.execute_unprepared(include_str!(
            "../../../../../../migrations/0001_pharmacy_facts.sql"
        ))
        .await
        .unwrap();
        db.execute_unprepared(
            "INSERT INTO pharmacies (id, name) VALUES ('PH1', 'Pharmacie du Centre');
             INSERT INTO laboratories (id, code, name) VALUES (1, 'UPSA', 'Upsa');
             INSERT INTO products (code, name, laboratory_id, category_l1, tva_rate)
                 VALUES ('EFFE', 'Effe', 1, 'Antalgiques', 2.1);
             INSERT INTO products (code, name, laboratory_id, category_l1, tva_rate)
                 VALUES ('VITC', 'Vitc', NULL, 'Vitamines', 20.0);
             INSERT INTO sales (pharmacy_id, product_code, sale_date, quantity, unit_price_ttc, unit_cost)
                 VALUES ('PH1', 'EFFE', '2024-01-12', 60, 5.0, 3.0),
                        ('PH1', 'VITC', '2024-01-25', 10, 10.0, 6.0),
                        ('PH1', 'EFFE', '2023-12-15', 100, 5.0, 3.0);
             INSERT INTO stock_snapshots (pharmacy_id, product_code, snapshot_date, quantity, unit_cost)
                 VALUES ('PH1', 'EFFE', '2024-01-15', 90, 3.0),
                        ('PH1', 'EFFE', '2024-01-31', 62, 3.0),
                        ('PH1', 'EFFE', '2024-02-05', 10, 3.0);",
        )
        .await
        .unwrap();
        SqlFactStore::new(db)
    }

    #[tokio::test]
    async fn test_sqlite_store_aggregates() {
        let store = seeded_store().await;
        let period = january();
        let predicate = CompiledPredicate::default();
        let query = |fact_type| AggregateQuery {
            predicate: &predicate,
            period: &period,
            fact_type,
        };

        let sales = store.aggregate(&query(FactType::Sales)).await.unwrap();
        assert_eq!(sales.fact_count, 2);
        assert_eq!(sales.revenue_gross, 400.0);
        assert_eq!(sales.quantity_sold, 70.0);
        assert_eq!(sales.distinct_products, 2);

        // latest snapshot inside the period, units sold from sales
        let stock = store.aggregate(&query(FactType::Stock)).await.unwrap();
        assert_eq!(stock.stock_quantity, 62.0);
        assert_eq!(stock.stock_value, 186.0);
        assert_eq!(stock.quantity_sold, 70.0);

        let purchases = store.aggregate(&query(FactType::Purchases)).await.unwrap();
        assert_eq!(purchases.fact_count, 0);
        assert_eq!(purchases.purchase_amount, 0.0);
    }

    #[tokio::test]
    async fn test_sqlite_store_groups_and_resolves() {
        let store = seeded_store().await;
        let period = january();
        let predicate = CompiledPredicate::default();
        let query = AggregateQuery {
            predicate: &predicate,
            period: &period,
            fact_type: FactType::Sales,
        };

        let groups = store
            .aggregate_grouped(&query, &[GroupField::Laboratory])
            .await
            .unwrap();
        let keys: Vec<&str> = groups.iter().map(|g| g.keys[0].as_str()).collect();
        assert_eq!(keys, vec![UNASSIGNED_SEGMENT, "Upsa"]);
        assert_eq!(groups[0].totals.revenue_gross, 100.0);
        assert_eq!(groups[1].totals.revenue_gross, 300.0);

        let upsa = store
            .products_for_laboratories(&["UPSA".to_string()])
            .await
            .unwrap();
        assert_eq!(upsa.into_iter().collect::<Vec<_>>(), vec!["EFFE".to_string()]);
        let vitamins = store
            .products_for_categories(&["Vitamines".to_string()])
            .await
            .unwrap();
        assert_eq!(vitamins.into_iter().collect::<Vec<_>>(), vec!["VITC".to_string()]);
    }
}
