pub mod analytics;
pub mod campaigns;
pub mod catalog;
pub mod orders;

pub use analytics::AnalyticsService;
pub use campaigns::CampaignService;
pub use catalog::CatalogService;
pub use orders::OrderService;
