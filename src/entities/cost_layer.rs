use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A batch of inventory received at a specific date and unit cost.
/// `remaining_quantity` decreases monotonically as stock is issued in FIFO
/// order; the valuation engine only ever reads these rows.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cost_layers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,
    pub product_id: Uuid,
    pub acquired_at: NaiveDate,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_cost_ex_tax: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_cost_inc_tax: Decimal,
    pub remaining_quantity: i32,
    pub original_quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
