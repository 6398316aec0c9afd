use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledger transaction row. Purchase installments live here discriminated by
/// `transaction_type = "purchase"`; `installment_no` is contiguous from 1
/// per parent order, enforced by a unique index.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,
    pub parent_order_id: Uuid,
    pub transaction_type: String,
    pub transaction_number: String,
    pub installment_no: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount: Decimal,
    pub status: String,
    pub transaction_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::ParentOrderId",
        to = "super::purchase_order::Column::Id"
    )]
    PurchaseOrder,
    #[sea_orm(has_many = "super::inventory_movement::Entity")]
    InventoryMovements,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl Related<super::inventory_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryMovements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// Helper enums

pub const TRANSACTION_TYPE_PURCHASE: &str = "purchase";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Draft,
    Confirmed,
    Completed,
    Cancelled,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Draft => "draft",
            InstallmentStatus::Confirmed => "confirmed",
            InstallmentStatus::Completed => "completed",
            InstallmentStatus::Cancelled => "cancelled",
        }
    }

    /// Cancelled installments release their share of the order ceiling.
    pub fn counts_toward_ceiling(&self) -> bool {
        !matches!(self, InstallmentStatus::Cancelled)
    }
}

impl std::fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstallmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(InstallmentStatus::Draft),
            "confirmed" => Ok(InstallmentStatus::Confirmed),
            "completed" => Ok(InstallmentStatus::Completed),
            "cancelled" => Ok(InstallmentStatus::Cancelled),
            other => Err(format!("unknown installment status: {other}")),
        }
    }
}
