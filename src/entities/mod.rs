pub mod cost_layer;
pub mod inventory_movement;
pub mod purchase_order;
pub mod transaction;
