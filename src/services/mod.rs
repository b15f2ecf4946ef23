// Core services
pub mod categories;
pub mod orders;
pub mod products;
pub mod users;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

/// Aggregated service handles, constructed once at startup and shared with
/// the serving layer.
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<products::ProductService>,
    pub categories: Arc<categories::CategoryService>,
    pub users: Arc<users::UserService>,
    pub orders: Arc<orders::OrderService>,
}

impl AppServices {
    /// Wires every service onto the shared pool and event channel.
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        let event_sender = Arc::new(event_sender);
        Self {
            products: Arc::new(products::ProductService::new(
                db.clone(),
                event_sender.clone(),
            )),
            categories: Arc::new(categories::CategoryService::new(
                db.clone(),
                event_sender.clone(),
            )),
            users: Arc::new(users::UserService::new(db.clone(), event_sender.clone())),
            orders: Arc::new(orders::OrderService::new(db, event_sender)),
        }
    }
}
