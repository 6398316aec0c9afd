//! Ledgerline API Library
//!
//! Purchase order installment ledger with inventory movement reconciliation
//! and FIFO cost-layer valuation.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::routing::{get, post};
use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// All v1 API routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/purchase-orders",
            post(handlers::purchase_orders::create_purchase_order),
        )
        .route(
            "/purchase-orders/{id}",
            get(handlers::purchase_orders::get_purchase_order),
        )
        .route(
            "/purchase-orders/{id}/confirm",
            post(handlers::purchase_orders::confirm_purchase_order),
        )
        .route(
            "/purchase-orders/{id}/installments",
            post(handlers::installments::allocate_installment)
                .get(handlers::installments::list_installments),
        )
        .route(
            "/purchase-orders/{id}/integration",
            get(handlers::integration::validate_integration),
        )
        .route(
            "/installments/{transaction_id}/movements",
            post(handlers::movements::link_movements).get(handlers::movements::list_movements),
        )
        .route(
            "/installments/{transaction_id}/repair",
            post(handlers::integration::repair_integration),
        )
        .route(
            "/products/{product_id}/valuation",
            get(handlers::valuation::valuate_inventory),
        )
}

/// Health routes mounted at the root.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/ready", get(handlers::health::ready))
}
