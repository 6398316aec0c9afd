use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entities::transaction::InstallmentStatus;
use crate::services::installments::InstallmentService;

/// Domain events emitted by the ledger services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PurchaseOrderCreated(Uuid),
    /// Emitted by the explicit confirm operation. Replaces the legacy
    /// datastore trigger that silently inserted an installment row on
    /// confirmation: the processor below performs the allocation through
    /// the regular allocator so retries and failures stay visible.
    PurchaseOrderConfirmed {
        order_id: Uuid,
        initial_installment: Option<Decimal>,
    },
    InstallmentAllocated {
        transaction_id: Uuid,
        parent_order_id: Uuid,
        installment_no: i32,
        amount: Decimal,
    },
    InventoryMovementsLinked {
        transaction_id: Uuid,
        status: String,
        linked: usize,
        failed: usize,
    },
    PartialLinkageWarning {
        transaction_id: Uuid,
        requested_lines: usize,
        linked_lines: usize,
    },
    IntegrationIssuesFound {
        parent_order_id: Uuid,
        issue_count: usize,
    },
    IntegrationRepaired {
        transaction_id: Uuid,
        created: usize,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is gone.
    /// Event delivery is advisory; the committed write is the source of truth.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

/// Background event processor. Logs every event; when an allocator handle is
/// provided, reacts to `PurchaseOrderConfirmed` by allocating the optional
/// initial installment.
pub async fn process_events(
    mut receiver: mpsc::Receiver<Event>,
    installments: Option<Arc<InstallmentService>>,
) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::PurchaseOrderConfirmed {
                order_id,
                initial_installment,
            } => {
                info!(order_id = %order_id, "Purchase order confirmed");
                if let (Some(service), Some(amount)) = (&installments, initial_installment) {
                    match service
                        .allocate(
                            *order_id,
                            *amount,
                            InstallmentStatus::Confirmed,
                            None,
                            Some("initial installment on confirmation".to_string()),
                        )
                        .await
                    {
                        Ok(installment) => info!(
                            order_id = %order_id,
                            installment_no = installment.installment_no,
                            "Allocated initial installment on confirmation"
                        ),
                        Err(e) => error!(
                            order_id = %order_id,
                            "Failed to allocate initial installment: {}", e
                        ),
                    }
                }
            }
            Event::PartialLinkageWarning {
                transaction_id,
                requested_lines,
                linked_lines,
            } => warn!(
                transaction_id = %transaction_id,
                requested = requested_lines,
                linked = linked_lines,
                "Partial inventory linkage; run the integration repair tool"
            ),
            Event::IntegrationIssuesFound {
                parent_order_id,
                issue_count,
            } => warn!(
                parent_order_id = %parent_order_id,
                issues = issue_count,
                "Integration validation found outstanding issues"
            ),
            other => info!(event = ?other, "Event processed"),
        }
    }
    info!("Event processor stopped");
}
