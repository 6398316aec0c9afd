use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        inventory_movement::{self, Entity as MovementEntity},
        purchase_order::Entity as PurchaseOrderEntity,
        transaction::{self, Entity as TransactionEntity, TRANSACTION_TYPE_PURCHASE},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::movements::{MovementService, ProductLine},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MissingInventory,
    OrphanedInventory,
    AmountMismatch,
    NumberingIssue,
}

/// A single divergence between the installment ledger and the inventory
/// movement ledger. Transient diagnostic data, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub issue_type: IssueType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_no: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub parent_order_id: Uuid,
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    pub transaction_id: Uuid,
    pub success: bool,
    pub created: Vec<inventory_movement::Model>,
    pub errors: Vec<String>,
}

/// Cross-references installments against inventory movements and heals the
/// repairable divergence class.
#[derive(Clone)]
pub struct IntegrationService {
    db: Arc<DatabaseConnection>,
    movements: MovementService,
    event_sender: Option<EventSender>,
}

impl IntegrationService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        movements: MovementService,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db,
            movements,
            event_sender,
        }
    }

    /// Read-only consistency check for one order. Takes no locks and
    /// tolerates slightly stale data; issues are always returned in full so
    /// operators can triage everything in one pass.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        parent_order_id: Uuid,
    ) -> Result<ValidationReport, ServiceError> {
        PurchaseOrderEntity::find_by_id(parent_order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", parent_order_id))
            })?;

        let installments = TransactionEntity::find()
            .filter(transaction::Column::ParentOrderId.eq(parent_order_id))
            .filter(transaction::Column::TransactionType.eq(TRANSACTION_TYPE_PURCHASE))
            .order_by_asc(transaction::Column::InstallmentNo)
            .all(&*self.db)
            .await?;

        let numbers: Vec<i32> = installments.iter().map(|t| t.installment_no).collect();
        let movements = if numbers.is_empty() {
            Vec::new()
        } else {
            MovementEntity::find()
                .filter(inventory_movement::Column::InstallmentNo.is_in(numbers.clone()))
                .all(&*self.db)
                .await?
        };

        let mut issues = Vec::new();

        // Installments with no linked movement at all.
        for installment in &installments {
            let has_movement = movements.iter().any(|m| m.transaction_id == installment.id);
            if !has_movement {
                issues.push(ValidationIssue {
                    issue_type: IssueType::MissingInventory,
                    description: format!(
                        "installment {} ({}) has no inventory movement",
                        installment.installment_no, installment.transaction_number
                    ),
                    transaction_id: Some(installment.id),
                    movement_id: None,
                    installment_no: Some(installment.installment_no),
                    expected: None,
                    actual: None,
                });
            }
        }

        // Movements pointing at a transaction row that no longer exists.
        // A movement may legitimately reference another order's installment
        // with the same number, so strays are only orphans when their target
        // id is gone from the transactions table entirely.
        let installment_ids: HashSet<Uuid> = installments.iter().map(|t| t.id).collect();
        let stray_ids: Vec<Uuid> = movements
            .iter()
            .filter(|m| !installment_ids.contains(&m.transaction_id))
            .map(|m| m.transaction_id)
            .collect();
        let known_ids: HashSet<Uuid> = if stray_ids.is_empty() {
            HashSet::new()
        } else {
            TransactionEntity::find()
                .filter(transaction::Column::Id.is_in(stray_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect()
        };
        for movement in &movements {
            if !installment_ids.contains(&movement.transaction_id)
                && !known_ids.contains(&movement.transaction_id)
            {
                issues.push(ValidationIssue {
                    issue_type: IssueType::OrphanedInventory,
                    description: format!(
                        "movement {} references unknown transaction {}",
                        movement.id, movement.transaction_id
                    ),
                    transaction_id: Some(movement.transaction_id),
                    movement_id: Some(movement.id),
                    installment_no: Some(movement.installment_no),
                    expected: None,
                    actual: None,
                });
            }
        }

        // Movement rows whose stored total disagrees with their own line
        // math, checked only for this order's installments.
        for movement in &movements {
            if !installment_ids.contains(&movement.transaction_id) {
                continue;
            }
            let expected_total = Decimal::from(movement.quantity) * movement.unit_price;
            if movement.total_amount != expected_total {
                issues.push(ValidationIssue {
                    issue_type: IssueType::AmountMismatch,
                    description: format!(
                        "movement {} total {} does not equal quantity {} x unit price {}",
                        movement.id, movement.total_amount, movement.quantity, movement.unit_price
                    ),
                    transaction_id: Some(movement.transaction_id),
                    movement_id: Some(movement.id),
                    installment_no: Some(movement.installment_no),
                    expected: None,
                    actual: None,
                });
            }
        }

        issues.extend(numbering_issues(&numbers));

        let is_valid = issues.is_empty();
        if !is_valid {
            if let Some(sender) = &self.event_sender {
                sender
                    .send_or_log(Event::IntegrationIssuesFound {
                        parent_order_id,
                        issue_count: issues.len(),
                    })
                    .await;
            }
        }

        Ok(ValidationReport {
            parent_order_id,
            is_valid,
            issues,
        })
    }

    /// Heals `missing_inventory` by re-linking the supplied product lines to
    /// the existing installment through the regular movement path.
    ///
    /// Idempotent: lines whose product already has a movement for this
    /// transaction are skipped, so repeated calls converge on the same
    /// movement set. Orphaned movements and numbering issues are reported by
    /// `validate` but deliberately never auto-repaired; deciding whether to
    /// delete or re-parent a movement needs human judgment.
    #[instrument(skip(self, lines))]
    pub async fn repair(
        &self,
        transaction_id: Uuid,
        lines: &[ProductLine],
    ) -> Result<RepairOutcome, ServiceError> {
        let installment = TransactionEntity::find_by_id(transaction_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        let existing_products: HashSet<Uuid> = MovementEntity::find()
            .filter(inventory_movement::Column::TransactionId.eq(transaction_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|m| m.product_id)
            .collect();

        let mut created = Vec::new();
        let mut errors = Vec::new();
        for line in lines {
            if existing_products.contains(&line.product_id) {
                continue;
            }
            match self.movements.insert_line(&installment, line).await {
                Ok(movement) => created.push(movement),
                Err(e) => {
                    error!(
                        transaction_id = %transaction_id,
                        product_id = %line.product_id,
                        "Repair failed to persist movement: {}", e
                    );
                    errors.push(format!("product {}: {}", line.product_id, e));
                }
            }
        }

        if !created.is_empty() {
            info!(
                transaction_id = %transaction_id,
                created = created.len(),
                "Integration repair re-linked movements"
            );
            if let Some(sender) = &self.event_sender {
                sender
                    .send_or_log(Event::IntegrationRepaired {
                        transaction_id,
                        created: created.len(),
                    })
                    .await;
            }
        }

        Ok(RepairOutcome {
            transaction_id,
            success: errors.is_empty(),
            created,
            errors,
        })
    }

    /// One pass of the periodic sweep: validates every order that has
    /// purchase installments and logs the ones with findings. Returns the
    /// number of orders with issues.
    pub async fn sweep_once(&self) -> Result<usize, ServiceError> {
        let order_ids: Vec<Uuid> = TransactionEntity::find()
            .select_only()
            .column(transaction::Column::ParentOrderId)
            .filter(transaction::Column::TransactionType.eq(TRANSACTION_TYPE_PURCHASE))
            .distinct()
            .into_tuple()
            .all(&*self.db)
            .await?;

        let mut flagged = 0;
        for order_id in order_ids {
            let report = self.validate(order_id).await?;
            if !report.is_valid {
                flagged += 1;
                warn!(
                    parent_order_id = %order_id,
                    issues = report.issues.len(),
                    "Integration sweep found divergence"
                );
            }
        }
        Ok(flagged)
    }
}

/// Spawns the background sweep loop. Purely diagnostic; it performs no
/// corrective writes.
pub fn start_sweep_worker(service: Arc<IntegrationService>, interval_secs: u64) {
    info!(interval_secs, "Starting integration sweep worker");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = service.sweep_once().await {
                error!("Integration sweep failed: {}", e);
            }
        }
    });
}

/// Detects gaps and duplicates against the expected contiguous sequence
/// 1..=N, one issue per divergence.
fn numbering_issues(numbers: &[i32]) -> Vec<ValidationIssue> {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();

    let mut issues = Vec::new();
    let mut expected = 1;
    for &no in &sorted {
        if no == expected {
            expected += 1;
        } else if no < expected {
            issues.push(ValidationIssue {
                issue_type: IssueType::NumberingIssue,
                description: format!("duplicate installment_no {}", no),
                transaction_id: None,
                movement_id: None,
                installment_no: Some(no),
                expected: None,
                actual: Some(no),
            });
        } else {
            for missing in expected..no {
                issues.push(ValidationIssue {
                    issue_type: IssueType::NumberingIssue,
                    description: format!(
                        "expected installment_no {} but found {}",
                        missing, no
                    ),
                    transaction_id: None,
                    movement_id: None,
                    installment_no: None,
                    expected: Some(missing),
                    actual: Some(no),
                });
            }
            expected = no + 1;
        }
    }
    issues
}
