use chrono::{NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        purchase_order::Entity as PurchaseOrderEntity,
        transaction::{
            self, Entity as TransactionEntity, InstallmentStatus, TRANSACTION_TYPE_PURCHASE,
        },
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Allocates sequentially numbered purchase installments against an order.
///
/// The read-compute-write sequence runs under an exclusive row lock on the
/// parent order, so two concurrent allocations for the same order can never
/// both pass the ceiling check or compute the same installment number.
/// Unrelated orders allocate fully in parallel.
#[derive(Clone)]
pub struct InstallmentService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
    retry_attempts: u32,
    number_prefix: String,
}

impl InstallmentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Option<EventSender>,
        retry_attempts: u32,
        number_prefix: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            retry_attempts: retry_attempts.max(1),
            number_prefix,
        }
    }

    /// Allocates the next installment for `parent_order_id`.
    ///
    /// Retries internally (bounded) when a concurrent allocation wins the
    /// unique-index race on `(parent_order_id, transaction_type,
    /// installment_no)`; every retry re-reads the current state. Overflow
    /// and not-found are terminal and surface immediately.
    #[instrument(skip(self, memo))]
    pub async fn allocate(
        &self,
        parent_order_id: Uuid,
        amount: Decimal,
        status: InstallmentStatus,
        due_date: Option<NaiveDate>,
        memo: Option<String>,
    ) -> Result<transaction::Model, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "installment amount must be positive, got {}",
                amount
            )));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .try_allocate(parent_order_id, amount, status, due_date, memo.clone())
                .await
            {
                Ok(installment) => {
                    info!(
                        parent_order_id = %parent_order_id,
                        installment_no = installment.installment_no,
                        transaction_number = %installment.transaction_number,
                        "Installment allocated"
                    );
                    if let Some(sender) = &self.event_sender {
                        sender
                            .send_or_log(Event::InstallmentAllocated {
                                transaction_id: installment.id,
                                parent_order_id,
                                installment_no: installment.installment_no,
                                amount,
                            })
                            .await;
                    }
                    return Ok(installment);
                }
                Err(ServiceError::Conflict(msg)) if attempt < self.retry_attempts => {
                    warn!(
                        parent_order_id = %parent_order_id,
                        attempt,
                        "Allocation conflict, retrying: {}",
                        msg
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_allocate(
        &self,
        parent_order_id: Uuid,
        amount: Decimal,
        status: InstallmentStatus,
        due_date: Option<NaiveDate>,
        memo: Option<String>,
    ) -> Result<transaction::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let order = PurchaseOrderEntity::find_by_id(parent_order_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", parent_order_id))
            })?;

        let existing = TransactionEntity::find()
            .filter(transaction::Column::ParentOrderId.eq(parent_order_id))
            .filter(transaction::Column::TransactionType.eq(TRANSACTION_TYPE_PURCHASE))
            .all(&txn)
            .await?;

        let existing_sum: Decimal = existing
            .iter()
            .filter(|t| t.status != InstallmentStatus::Cancelled.as_str())
            .map(|t| t.total_amount)
            .sum();

        if existing_sum + amount > order.total_amount {
            return Err(ServiceError::Overflow(format!(
                "amount {} exceeds remaining balance {} (order total {}, allocated {})",
                amount,
                order.total_amount - existing_sum,
                order.total_amount,
                existing_sum
            )));
        }

        // Cancelled installments keep their number; the sequence never reuses one.
        let next_no = existing
            .iter()
            .map(|t| t.installment_no)
            .max()
            .unwrap_or(0)
            + 1;

        let now = Utc::now();
        let model = transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            parent_order_id: Set(parent_order_id),
            transaction_type: Set(TRANSACTION_TYPE_PURCHASE.to_string()),
            transaction_number: Set(self.generate_transaction_number()),
            installment_no: Set(next_no),
            total_amount: Set(amount),
            status: Set(status.as_str().to_string()),
            transaction_date: Set(now),
            due_date: Set(due_date),
            memo: Set(memo),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model.insert(&txn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict(format!(
                    "concurrent allocation for order {} (installment_no {})",
                    parent_order_id, next_no
                ))
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        txn.commit().await?;
        Ok(inserted)
    }

    /// Purchase installments for an order, ordered by installment number.
    pub async fn list_for_order(
        &self,
        parent_order_id: Uuid,
    ) -> Result<Vec<transaction::Model>, ServiceError> {
        let installments = TransactionEntity::find()
            .filter(transaction::Column::ParentOrderId.eq(parent_order_id))
            .filter(transaction::Column::TransactionType.eq(TRANSACTION_TYPE_PURCHASE))
            .order_by_asc(transaction::Column::InstallmentNo)
            .all(&*self.db)
            .await?;
        Ok(installments)
    }

    pub async fn get(&self, transaction_id: Uuid) -> Result<transaction::Model, ServiceError> {
        TransactionEntity::find_by_id(transaction_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })
    }

    fn generate_transaction_number(&self) -> String {
        let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
        format!(
            "{}-{}-{:04}",
            self.number_prefix,
            Utc::now().format("%Y%m%d%H%M%S%3f"),
            suffix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_numbers_carry_prefix_and_are_distinct() {
        let svc = InstallmentService::new(
            Arc::new(DatabaseConnection::Disconnected),
            None,
            3,
            "PT".to_string(),
        );
        let a = svc.generate_transaction_number();
        let b = svc.generate_transaction_number();
        assert!(a.starts_with("PT-"));
        // Same-millisecond collisions are still distinguished by the suffix
        // with overwhelming probability; regenerate once if unlucky.
        if a == b {
            assert_ne!(a, svc.generate_transaction_number());
        }
    }
}
