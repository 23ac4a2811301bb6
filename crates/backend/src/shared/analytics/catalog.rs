use contracts::shared::metrics::*;
use once_cell::sync::Lazy;

use super::compiler::{GroupField, HierarchyLevel};
use super::metrics::Metric;

static CATALOG: Lazy<MetricCatalogResponse> = Lazy::new(build_catalog);

/// Full catalogue of metrics and hierarchy levels, built once.
pub fn catalog() -> &'static MetricCatalogResponse {
    &CATALOG
}

fn money() -> ValueFormat {
    ValueFormat::Money {
        currency: "€".into(),
    }
}

fn meta(metric: Metric) -> MetricMeta {
    let (label, format, description) = match metric {
        Metric::QuantitySold => ("Quantité vendue", ValueFormat::Integer, "Unités vendues sur la période"),
        Metric::RevenueGross => ("CA TTC", money(), "Quantité × prix unitaire TTC"),
        Metric::RevenueNet => ("CA HT", money(), "CA TTC hors TVA"),
        Metric::MarginAmount => ("Marge", money(), "Quantité × (prix HT − coût unitaire)"),
        Metric::MarginRate => (
            "Taux de marge",
            ValueFormat::Percent { decimals: 1 },
            "Marge / CA HT",
        ),
        Metric::AverageSellPrice => (
            "Prix moyen de vente",
            ValueFormat::Number { decimals: 2 },
            "CA TTC / quantité vendue",
        ),
        Metric::QuantityOrdered => ("Quantité commandée", ValueFormat::Integer, "Unités commandées"),
        Metric::QuantityBought => ("Quantité reçue", ValueFormat::Integer, "Unités livrées"),
        Metric::PurchaseAmount => ("Montant d'achat", money(), "Quantité reçue × coût unitaire"),
        Metric::AveragePurchasePrice => (
            "Prix moyen d'achat",
            ValueFormat::Number { decimals: 2 },
            "Montant d'achat / quantité reçue",
        ),
        Metric::ReceptionRate => (
            "Taux de réception",
            ValueFormat::Percent { decimals: 1 },
            "Quantité reçue / quantité commandée",
        ),
        Metric::StockQuantity => (
            "Stock",
            ValueFormat::Integer,
            "Quantité du dernier inventaire de la période",
        ),
        Metric::StockValue => ("Valeur du stock", money(), "Stock × coût unitaire"),
        Metric::DaysOfStock => (
            "Jours de stock",
            ValueFormat::Days,
            "Stock / ventes moyennes journalières",
        ),
        Metric::DistinctProducts => ("Produits", ValueFormat::Integer, "Produits distincts"),
        Metric::DistinctPharmacies => ("Pharmacies", ValueFormat::Integer, "Pharmacies distinctes"),
    };

    MetricMeta {
        id: metric.name().into(),
        label: label.into(),
        fact_types: metric.fact_types().to_vec(),
        kind: metric.kind(),
        format,
        description: Some(description.into()),
    }
}

fn build_catalog() -> MetricCatalogResponse {
    let metrics = Metric::ALL.into_iter().map(meta).collect();

    let hierarchy_levels = HierarchyLevel::ALL
        .into_iter()
        .map(|level| HierarchyLevelMeta {
            id: level.as_str().into(),
            label: level.label().into(),
            sub_entity: match level.sub_entity() {
                GroupField::Product => "product".into(),
                _ => "laboratory".into(),
            },
        })
        .collect();

    MetricCatalogResponse {
        metrics,
        hierarchy_levels,
    }
}
