use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, IntoActiveModel,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::purchase_order::{self, Entity as PurchaseOrderEntity, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Minimal purchase order entry: enough surface for installments to have a
/// parent to allocate against. Master-data CRUD beyond this is out of scope.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, notes))]
    pub async fn create(
        &self,
        supplier_id: Uuid,
        total_amount: Decimal,
        currency: String,
        notes: Option<String>,
    ) -> Result<purchase_order::Model, ServiceError> {
        if total_amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "order total must be positive, got {}",
                total_amount
            )));
        }

        let now = Utc::now();
        let model = purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(generate_order_number()),
            supplier_id: Set(supplier_id),
            total_amount: Set(total_amount),
            currency: Set(currency),
            status: Set(OrderStatus::Draft.as_str().to_string()),
            notes: Set(notes),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;

        info!(order_id = %created.id, order_number = %created.order_number, "Purchase order created");
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::PurchaseOrderCreated(created.id)).await;
        }
        Ok(created)
    }

    pub async fn get(&self, order_id: Uuid) -> Result<purchase_order::Model, ServiceError> {
        PurchaseOrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })
    }

    /// Confirms a draft order and emits `PurchaseOrderConfirmed`. The event
    /// processor handles the optional initial installment through the
    /// regular allocator, keeping retry and failure behavior visible
    /// instead of buried in a datastore trigger.
    #[instrument(skip(self))]
    pub async fn confirm(
        &self,
        order_id: Uuid,
        initial_installment: Option<Decimal>,
    ) -> Result<purchase_order::Model, ServiceError> {
        let order = self.get(order_id).await?;
        if order.status != OrderStatus::Draft.as_str() {
            return Err(ServiceError::InvalidOperation(format!(
                "order {} cannot be confirmed from status {}",
                order_id, order.status
            )));
        }
        if let Some(amount) = initial_installment {
            if amount <= Decimal::ZERO || amount > order.total_amount {
                return Err(ServiceError::ValidationError(format!(
                    "initial installment {} must be positive and within the order total {}",
                    amount, order.total_amount
                )));
            }
        }

        let mut active = order.into_active_model();
        active.status = Set(OrderStatus::Confirmed.as_str().to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(order_id = %order_id, "Purchase order confirmed");
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::PurchaseOrderConfirmed {
                    order_id,
                    initial_installment,
                })
                .await;
        }
        Ok(updated)
    }
}

fn generate_order_number() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("PO-{}-{:04}", Utc::now().format("%Y%m%d%H%M%S%3f"), suffix)
}
