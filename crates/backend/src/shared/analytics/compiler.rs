use contracts::dashboards::d500_pharmacy_analytics::{GenericStatus, ReimbursementStatus};
use serde::Serialize;
use std::collections::BTreeSet;
use std::str::FromStr;

use super::error::FilterError;
use super::filter::{FilterSpecification, RangeField};

/// Auxiliary data a predicate or grouping needs joined onto the fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum JoinKind {
    /// Product master data (categories, TVA, reimbursement, generic flag)
    ProductAttributes,
    /// Laboratory of the product; implies `ProductAttributes`
    Laboratory,
    /// Per pharmacy/product prices, discount and margin
    CostBasis,
}

/// One composable condition on a fact. All fragments of a predicate are AND-ed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PredicateFragment {
    /// Pharmacies the caller is authorized to see
    PharmacyScope(Vec<String>),
    PharmacyIn(Vec<String>),
    /// Combined product universe (products, laboratories and categories resolved)
    ProductIn(Vec<String>),
    PharmacyNotIn(Vec<String>),
    ProductNotIn(Vec<String>),
    Range {
        field: RangeField,
        min: Option<f64>,
        max: Option<f64>,
    },
    TvaRateIn(Vec<f64>),
    Reimbursed(bool),
    Generic(bool),
}

impl PredicateFragment {
    pub fn required_joins(&self) -> &'static [JoinKind] {
        match self {
            PredicateFragment::PharmacyScope(_)
            | PredicateFragment::PharmacyIn(_)
            | PredicateFragment::ProductIn(_)
            | PredicateFragment::PharmacyNotIn(_)
            | PredicateFragment::ProductNotIn(_) => &[],
            PredicateFragment::Range { .. } => {
                &[JoinKind::ProductAttributes, JoinKind::CostBasis]
            }
            PredicateFragment::TvaRateIn(_)
            | PredicateFragment::Reimbursed(_)
            | PredicateFragment::Generic(_) => &[JoinKind::ProductAttributes],
        }
    }

    /// True for fragments that narrow a market-share selection relative to its total:
    /// the product universe plus every product attribute or cost-basis filter.
    pub fn narrows_selection(&self) -> bool {
        matches!(
            self,
            PredicateFragment::ProductIn(_)
                | PredicateFragment::Range { .. }
                | PredicateFragment::TvaRateIn(_)
                | PredicateFragment::Reimbursed(_)
                | PredicateFragment::Generic(_)
        )
    }
}

/// Ordered fragments plus the joins they imply.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CompiledPredicate {
    fragments: Vec<PredicateFragment>,
    required_joins: BTreeSet<JoinKind>,
}

impl CompiledPredicate {
    fn from_fragments(fragments: Vec<PredicateFragment>) -> Self {
        let required_joins = fragments
            .iter()
            .flat_map(|f| f.required_joins().iter().copied())
            .collect();
        Self {
            fragments,
            required_joins,
        }
    }

    pub fn fragments(&self) -> &[PredicateFragment] {
        &self.fragments
    }

    pub fn required_joins(&self) -> &BTreeSet<JoinKind> {
        &self.required_joins
    }

    pub fn requires(&self, join: JoinKind) -> bool {
        self.required_joins.contains(&join)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Market-share total: the same predicate without its selection-narrowing fragments.
    /// Pharmacy scoping, pharmacy filters and product exclusions are kept.
    pub fn without_selection(&self) -> CompiledPredicate {
        Self::from_fragments(
            self.fragments
                .iter()
                .filter(|f| !f.narrows_selection())
                .cloned()
                .collect(),
        )
    }
}

/// Turns a `FilterSpecification` into a `CompiledPredicate`.
///
/// Fragment order is fixed (scope, pharmacy include, product include, pharmacy exclude,
/// product exclude, ranges in field order, TVA, reimbursement, generic) and identifier lists
/// are sorted, so equal specifications always compile to equal predicates.
pub struct QueryCompiler;

impl QueryCompiler {
    pub fn compile(spec: &FilterSpecification) -> Result<CompiledPredicate, FilterError> {
        let mut fragments = Vec::new();

        if !spec.pharmacy_scope().is_empty() {
            fragments.push(PredicateFragment::PharmacyScope(
                spec.pharmacy_scope().iter().cloned().collect(),
            ));
        }

        if !spec.include_pharmacies().is_empty() {
            fragments.push(PredicateFragment::PharmacyIn(
                spec.include_pharmacies().iter().cloned().collect(),
            ));
        }

        // Some(empty) is a selection that resolved to nothing and must match nothing
        if let Some(products) = spec.include_products() {
            fragments.push(PredicateFragment::ProductIn(
                products.iter().cloned().collect(),
            ));
        }

        if !spec.exclude_pharmacies().is_empty() {
            fragments.push(PredicateFragment::PharmacyNotIn(
                spec.exclude_pharmacies().iter().cloned().collect(),
            ));
        }

        if !spec.exclude_products().is_empty() {
            fragments.push(PredicateFragment::ProductNotIn(
                spec.exclude_products().iter().cloned().collect(),
            ));
        }

        fragments.extend(Self::compile_ranges(spec)?);

        if !spec.tva_rates().is_empty() {
            if let Some(bad) = spec
                .tva_rates()
                .iter()
                .find(|r| !r.is_finite() || **r < 0.0)
            {
                return Err(FilterError::InvalidTvaRate(*bad));
            }
            fragments.push(PredicateFragment::TvaRateIn(spec.tva_rates().to_vec()));
        }

        match spec.reimbursement() {
            ReimbursementStatus::All => {}
            ReimbursementStatus::Reimbursed => fragments.push(PredicateFragment::Reimbursed(true)),
            ReimbursementStatus::NotReimbursed => {
                fragments.push(PredicateFragment::Reimbursed(false))
            }
        }

        match spec.generic() {
            GenericStatus::All => {}
            GenericStatus::Generic => fragments.push(PredicateFragment::Generic(true)),
            GenericStatus::Brand => fragments.push(PredicateFragment::Generic(false)),
        }

        let compiled = CompiledPredicate::from_fragments(fragments);
        tracing::debug!(
            "compiled {} fragments, joins {:?}",
            compiled.fragments.len(),
            compiled.required_joins
        );
        Ok(compiled)
    }

    /// Validates the specification without keeping the result.
    pub fn validate(spec: &FilterSpecification) -> Result<(), FilterError> {
        Self::compile(spec).map(|_| ())
    }

    fn compile_ranges(spec: &FilterSpecification) -> Result<Vec<PredicateFragment>, FilterError> {
        let mut ranges = Vec::new();

        for (name, range) in spec.range_filters() {
            let field = RangeField::from_name(name)?;

            let finite = |b: Option<f64>| b.map_or(true, f64::is_finite);
            if !finite(range.min) || !finite(range.max) {
                return Err(FilterError::NonFiniteBound(name.clone()));
            }
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(FilterError::InvertedRange {
                        name: name.clone(),
                        min,
                        max,
                    });
                }
            }
            if range.is_unbounded() {
                continue;
            }

            ranges.push((field, range.min, range.max));
        }

        ranges.sort_by_key(|(field, _, _)| *field);

        Ok(ranges
            .into_iter()
            .map(|(field, min, max)| PredicateFragment::Range { field, min, max })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Grouping fields
// ---------------------------------------------------------------------------

/// Attribute facts can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GroupField {
    Category1,
    Category2,
    Category3,
    Laboratory,
    Product,
}

impl GroupField {
    pub fn required_joins(&self) -> &'static [JoinKind] {
        match self {
            GroupField::Laboratory => &[JoinKind::ProductAttributes, JoinKind::Laboratory],
            _ => &[JoinKind::ProductAttributes],
        }
    }
}

/// Label used for facts whose grouping attribute is missing.
pub const UNASSIGNED_SEGMENT: &str = "(non classé)";

/// Category grouping accepted as `hierarchyLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HierarchyLevel {
    Category1,
    Category2,
    Category3,
    Laboratory,
}

impl HierarchyLevel {
    pub const ALL: [HierarchyLevel; 4] = [
        HierarchyLevel::Category1,
        HierarchyLevel::Category2,
        HierarchyLevel::Category3,
        HierarchyLevel::Laboratory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HierarchyLevel::Category1 => "category1",
            HierarchyLevel::Category2 => "category2",
            HierarchyLevel::Category3 => "category3",
            HierarchyLevel::Laboratory => "laboratory",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HierarchyLevel::Category1 => "Catégorie niveau 1",
            HierarchyLevel::Category2 => "Catégorie niveau 2",
            HierarchyLevel::Category3 => "Catégorie niveau 3",
            HierarchyLevel::Laboratory => "Laboratoire",
        }
    }

    pub fn group_field(&self) -> GroupField {
        match self {
            HierarchyLevel::Category1 => GroupField::Category1,
            HierarchyLevel::Category2 => GroupField::Category2,
            HierarchyLevel::Category3 => GroupField::Category3,
            HierarchyLevel::Laboratory => GroupField::Laboratory,
        }
    }

    /// Field ranked inside each segment for the top-N list.
    pub fn sub_entity(&self) -> GroupField {
        match self {
            HierarchyLevel::Laboratory => GroupField::Product,
            _ => GroupField::Laboratory,
        }
    }
}

impl FromStr for HierarchyLevel {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| FilterError::UnknownHierarchyLevel(s.to_string()))
    }
}
