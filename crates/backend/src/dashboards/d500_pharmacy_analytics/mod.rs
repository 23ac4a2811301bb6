pub mod mapping;
pub mod service;

pub use service::AnalyticsService;
