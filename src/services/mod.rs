// Core ledger services
pub mod installments;
pub mod integration;
pub mod movements;
pub mod purchase_orders;
pub mod valuation;
