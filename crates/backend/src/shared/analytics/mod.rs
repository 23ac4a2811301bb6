pub mod cache;
pub mod catalog;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod store;

pub use compiler::{CompiledPredicate, HierarchyLevel, QueryCompiler};
pub use error::{AnalyticsError, CacheError, FilterError, StoreError};
pub use filter::{FilterSpecification, NumericRange, Period};
pub use metrics::{Metric, MetricSet};
