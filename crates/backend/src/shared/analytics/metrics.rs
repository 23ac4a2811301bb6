use contracts::dashboards::d500_pharmacy_analytics::{FactType, MetricValues};
use contracts::shared::metrics::MetricKind;
use serde::Serialize;
use std::collections::BTreeMap;

use super::error::FilterError;
use super::filter::Period;

/// Every metric the engine can compute. Wire names are those of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Metric {
    QuantitySold,
    RevenueGross,
    RevenueNet,
    MarginAmount,
    MarginRate,
    AverageSellPrice,
    QuantityOrdered,
    QuantityBought,
    PurchaseAmount,
    AveragePurchasePrice,
    ReceptionRate,
    StockQuantity,
    StockValue,
    DaysOfStock,
    DistinctProducts,
    DistinctPharmacies,
}

const SALES: &[FactType] = &[FactType::Sales];
const PURCHASES: &[FactType] = &[FactType::Purchases];
const STOCK: &[FactType] = &[FactType::Stock];
const ANY: &[FactType] = &[FactType::Sales, FactType::Purchases, FactType::Stock];

impl Metric {
    pub const ALL: [Metric; 16] = [
        Metric::QuantitySold,
        Metric::RevenueGross,
        Metric::RevenueNet,
        Metric::MarginAmount,
        Metric::MarginRate,
        Metric::AverageSellPrice,
        Metric::QuantityOrdered,
        Metric::QuantityBought,
        Metric::PurchaseAmount,
        Metric::AveragePurchasePrice,
        Metric::ReceptionRate,
        Metric::StockQuantity,
        Metric::StockValue,
        Metric::DaysOfStock,
        Metric::DistinctProducts,
        Metric::DistinctPharmacies,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::QuantitySold => "quantite_vendue",
            Metric::RevenueGross => "ca_ttc",
            Metric::RevenueNet => "ca_ht",
            Metric::MarginAmount => "montant_marge",
            Metric::MarginRate => "taux_marge",
            Metric::AverageSellPrice => "prix_moyen_vente",
            Metric::QuantityOrdered => "quantite_commandee",
            Metric::QuantityBought => "quantite_achetee",
            Metric::PurchaseAmount => "montant_achat",
            Metric::AveragePurchasePrice => "prix_moyen_achat",
            Metric::ReceptionRate => "taux_reception",
            Metric::StockQuantity => "quantite_stock",
            Metric::StockValue => "valeur_stock",
            Metric::DaysOfStock => "jours_de_stock",
            Metric::DistinctProducts => "nb_produits",
            Metric::DistinctPharmacies => "nb_pharmacies",
        }
    }

    pub fn from_name(name: &str) -> Result<Metric, FilterError> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| FilterError::UnknownMetric(name.to_string()))
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::MarginRate
            | Metric::AverageSellPrice
            | Metric::AveragePurchasePrice
            | Metric::ReceptionRate
            | Metric::DaysOfStock => MetricKind::Ratio,
            Metric::DistinctProducts | Metric::DistinctPharmacies => MetricKind::Count,
            _ => MetricKind::Sum,
        }
    }

    /// Sums and counts add up across segments; ratios do not.
    pub fn is_additive(&self) -> bool {
        self.kind() != MetricKind::Ratio
    }

    pub fn fact_types(&self) -> &'static [FactType] {
        match self {
            Metric::QuantitySold
            | Metric::RevenueGross
            | Metric::RevenueNet
            | Metric::MarginAmount
            | Metric::MarginRate
            | Metric::AverageSellPrice => SALES,
            Metric::QuantityOrdered
            | Metric::QuantityBought
            | Metric::PurchaseAmount
            | Metric::AveragePurchasePrice
            | Metric::ReceptionRate => PURCHASES,
            Metric::StockQuantity | Metric::StockValue | Metric::DaysOfStock => STOCK,
            Metric::DistinctProducts | Metric::DistinctPharmacies => ANY,
        }
    }

    pub fn supports(&self, fact_type: FactType) -> bool {
        self.fact_types().contains(&fact_type)
    }

    /// Value of this metric for aggregated raw totals.
    ///
    /// This is the single place where the zero/null policy lives: sums and counts are always
    /// defined (0 without facts), ratios are `None` when their denominator is zero.
    pub fn derive(&self, raw: &RawTotals, period: &Period) -> Option<f64> {
        let value = match self {
            Metric::QuantitySold => Some(raw.quantity_sold),
            Metric::RevenueGross => Some(raw.revenue_gross),
            Metric::RevenueNet => Some(raw.revenue_net),
            Metric::MarginAmount => Some(raw.margin),
            Metric::MarginRate => ratio(raw.margin, raw.revenue_net).map(|r| r * 100.0),
            Metric::AverageSellPrice => ratio(raw.revenue_gross, raw.quantity_sold),
            Metric::QuantityOrdered => Some(raw.quantity_ordered),
            Metric::QuantityBought => Some(raw.quantity_received),
            Metric::PurchaseAmount => Some(raw.purchase_amount),
            Metric::AveragePurchasePrice => ratio(raw.purchase_amount, raw.quantity_received),
            Metric::ReceptionRate => {
                ratio(raw.quantity_received, raw.quantity_ordered).map(|r| r * 100.0)
            }
            Metric::StockQuantity => Some(raw.stock_quantity),
            Metric::StockValue => Some(raw.stock_value),
            Metric::DaysOfStock => {
                // a non-positive sales rate gives no meaningful coverage
                if raw.quantity_sold <= 0.0 {
                    None
                } else {
                    let daily_rate = raw.quantity_sold / period.days() as f64;
                    ratio(raw.stock_quantity, daily_rate)
                }
            }
            Metric::DistinctProducts => Some(raw.distinct_products as f64),
            Metric::DistinctPharmacies => Some(raw.distinct_pharmacies as f64),
        };
        value.filter(|v| v.is_finite())
    }
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Metrics returned when a request does not name any.
pub fn default_metrics(fact_type: FactType) -> Vec<Metric> {
    match fact_type {
        FactType::Sales => vec![
            Metric::QuantitySold,
            Metric::RevenueGross,
            Metric::RevenueNet,
            Metric::MarginAmount,
            Metric::MarginRate,
            Metric::DistinctProducts,
            Metric::DistinctPharmacies,
        ],
        FactType::Purchases => vec![
            Metric::QuantityOrdered,
            Metric::QuantityBought,
            Metric::PurchaseAmount,
            Metric::AveragePurchasePrice,
            Metric::DistinctProducts,
        ],
        FactType::Stock => vec![
            Metric::StockQuantity,
            Metric::StockValue,
            Metric::DaysOfStock,
            Metric::DistinctProducts,
        ],
    }
}

/// Parse requested wire names, keeping request order and dropping duplicates.
/// Falls back to `default` when nothing is requested.
pub fn parse_metrics(
    names: &[String],
    fact_type: FactType,
    default: Vec<Metric>,
) -> Result<Vec<Metric>, FilterError> {
    if names.is_empty() {
        return Ok(default);
    }

    let mut metrics = Vec::with_capacity(names.len());
    for name in names {
        let metric = Metric::from_name(name.trim())?;
        if !metric.supports(fact_type) {
            return Err(FilterError::UnsupportedMetric {
                metric: metric.name().to_string(),
                fact_type: fact_type.as_str().to_string(),
            });
        }
        if !metrics.contains(&metric) {
            metrics.push(metric);
        }
    }
    Ok(metrics)
}

// ---------------------------------------------------------------------------
// Raw totals and metric sets
// ---------------------------------------------------------------------------

/// Sums produced by a fact store for one group of facts. Fields that do not apply to the
/// queried fact type stay at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawTotals {
    pub fact_count: i64,
    /// Units sold. For stock queries, units sold over the same period and filters.
    pub quantity_sold: f64,
    pub revenue_gross: f64,
    pub revenue_net: f64,
    pub margin: f64,
    pub quantity_ordered: f64,
    pub quantity_received: f64,
    pub purchase_amount: f64,
    pub stock_quantity: f64,
    pub stock_value: f64,
    pub distinct_products: i64,
    pub distinct_pharmacies: i64,
}

/// Requested metric → value. `None` only for ratios without a defined value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricSet {
    values: BTreeMap<Metric, Option<f64>>,
}

impl MetricSet {
    pub fn derive(raw: &RawTotals, period: &Period, metrics: &[Metric]) -> Self {
        Self {
            values: metrics
                .iter()
                .map(|m| (*m, m.derive(raw, period)))
                .collect(),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied().flatten()
    }

    /// Additive value, 0 when absent.
    pub fn sum_value(&self, metric: Metric) -> f64 {
        self.get(metric).unwrap_or(0.0)
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.values.contains_key(&metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, Option<f64>)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    pub fn to_values(&self) -> MetricValues {
        self.values
            .iter()
            .map(|(m, v)| (m.name().to_string(), *v))
            .collect()
    }
}

impl FromIterator<(Metric, Option<f64>)> for MetricSet {
    fn from_iter<T: IntoIterator<Item = (Metric, Option<f64>)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
