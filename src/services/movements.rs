use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        inventory_movement::{self, Entity as MovementEntity, MovementType},
        transaction::{self, Entity as TransactionEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// One requested stock receipt line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkageStatus {
    Success,
    Partial,
    Failed,
}

impl LinkageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkageStatus::Success => "success",
            LinkageStatus::Partial => "partial",
            LinkageStatus::Failed => "failed",
        }
    }
}

/// Result of linking movements to an installment. The installment itself is
/// already committed when this is produced, so a partial outcome is a
/// degraded success the caller must surface, never an exception.
#[derive(Debug, Clone, Serialize)]
pub struct LinkageOutcome {
    pub transaction_id: Uuid,
    pub status: LinkageStatus,
    pub movements: Vec<inventory_movement::Model>,
    pub errors: Vec<String>,
}

/// Creates inventory movement records tied 1:1 to an installment.
#[derive(Clone)]
pub struct MovementService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl MovementService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Links receipt movements for every product line to the installment
    /// identified by `transaction_id`.
    ///
    /// Every line is attempted; a failing line never blocks or rolls back
    /// its siblings. The outcome reports whichever movements succeeded
    /// together with the per-line errors and an overall status.
    #[instrument(skip(self, lines))]
    pub async fn link(
        &self,
        transaction_id: Uuid,
        lines: &[ProductLine],
    ) -> Result<LinkageOutcome, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::BadRequest(
                "at least one product line is required".to_string(),
            ));
        }

        let installment = TransactionEntity::find_by_id(transaction_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        let mut movements = Vec::new();
        let mut errors = Vec::new();
        for line in lines {
            match self.insert_line(&installment, line).await {
                Ok(movement) => movements.push(movement),
                Err(e) => {
                    error!(
                        transaction_id = %transaction_id,
                        product_id = %line.product_id,
                        "Failed to persist inventory movement: {}", e
                    );
                    errors.push(format!("product {}: {}", line.product_id, e));
                }
            }
        }

        let status = if errors.is_empty() {
            LinkageStatus::Success
        } else if movements.is_empty() {
            LinkageStatus::Failed
        } else {
            LinkageStatus::Partial
        };

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::InventoryMovementsLinked {
                    transaction_id,
                    status: status.as_str().to_string(),
                    linked: movements.len(),
                    failed: errors.len(),
                })
                .await;
            if status != LinkageStatus::Success {
                warn!(
                    transaction_id = %transaction_id,
                    linked = movements.len(),
                    failed = errors.len(),
                    "Inventory linkage degraded"
                );
                sender
                    .send_or_log(Event::PartialLinkageWarning {
                        transaction_id,
                        requested_lines: lines.len(),
                        linked_lines: movements.len(),
                    })
                    .await;
            }
        }

        Ok(LinkageOutcome {
            transaction_id,
            status,
            movements,
            errors,
        })
    }

    /// Inserts a single receipt movement. Shared with the integration
    /// repairer, which re-links missing movements through the same path.
    pub(crate) async fn insert_line(
        &self,
        installment: &transaction::Model,
        line: &ProductLine,
    ) -> Result<inventory_movement::Model, ServiceError> {
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "quantity must be positive, got {}",
                line.quantity
            )));
        }
        if line.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "unit price must not be negative, got {}",
                line.unit_price
            )));
        }

        let total_amount = Decimal::from(line.quantity) * line.unit_price;
        let model = inventory_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(line.product_id),
            movement_type: Set(MovementType::In.as_str().to_string()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            total_amount: Set(total_amount),
            installment_no: Set(installment.installment_no),
            transaction_id: Set(installment.id),
            created_at: Set(Utc::now()),
        };
        let inserted = model.insert(&*self.db).await?;
        Ok(inserted)
    }

    /// Movements recorded for an installment, oldest first.
    pub async fn list_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<Vec<inventory_movement::Model>, ServiceError> {
        let movements = MovementEntity::find()
            .filter(inventory_movement::Column::TransactionId.eq(transaction_id))
            .order_by_asc(inventory_movement::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(movements)
    }
}
