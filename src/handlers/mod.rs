pub mod analytics;
pub mod campaigns;
pub mod orders;
pub mod products;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<crate::services::OrderService>,
    pub campaigns: Arc<crate::services::CampaignService>,
    pub catalog: Arc<crate::services::CatalogService>,
    pub analytics: Arc<crate::services::AnalyticsService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            orders: Arc::new(crate::services::OrderService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            campaigns: Arc::new(crate::services::CampaignService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            catalog: Arc::new(crate::services::CatalogService::new(
                db_pool.clone(),
                event_sender,
            )),
            analytics: Arc::new(crate::services::AnalyticsService::new(db_pool)),
        }
    }
}
