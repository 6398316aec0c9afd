pub mod common;
pub mod health;
pub mod installments;
pub mod integration;
pub mod movements;
pub mod purchase_orders;
pub mod valuation;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub purchase_orders: Arc<crate::services::purchase_orders::PurchaseOrderService>,
    pub installments: Arc<crate::services::installments::InstallmentService>,
    pub movements: Arc<crate::services::movements::MovementService>,
    pub valuation: Arc<crate::services::valuation::ValuationService>,
    pub integration: Arc<crate::services::integration::IntegrationService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, cfg: &AppConfig) -> Self {
        let movements = crate::services::movements::MovementService::new(
            db.clone(),
            Some(event_sender.clone()),
        );
        Self {
            purchase_orders: Arc::new(crate::services::purchase_orders::PurchaseOrderService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            installments: Arc::new(crate::services::installments::InstallmentService::new(
                db.clone(),
                Some(event_sender.clone()),
                cfg.allocation_retry_attempts,
                cfg.transaction_number_prefix.clone(),
            )),
            valuation: Arc::new(crate::services::valuation::ValuationService::new(db.clone())),
            integration: Arc::new(crate::services::integration::IntegrationService::new(
                db,
                movements.clone(),
                Some(event_sender),
            )),
            movements: Arc::new(movements),
        }
    }
}
