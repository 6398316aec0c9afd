use super::common::{created_response, success_response, validate_input};
use crate::{errors::ApiError, handlers::AppState};
use axum::extract::{Json, Path, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: Uuid,
    /// Tax-included order total; the ceiling for installment allocation.
    pub total_amount: Decimal,
    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConfirmPurchaseOrderRequest {
    /// When present, the confirmation handler allocates this amount as
    /// installment 1 through the regular allocator.
    pub initial_installment: Option<Decimal>,
}

/// Create a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .purchase_orders
        .create(
            payload.supplier_id,
            payload.total_amount,
            payload.currency.unwrap_or_else(|| "USD".to_string()),
            payload.notes,
        )
        .await?;
    Ok(created_response(order))
}

/// Get a purchase order by id
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order found"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state.services.purchase_orders.get(id).await?;
    Ok(success_response(order))
}

/// Confirm a draft purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/confirm",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = ConfirmPurchaseOrderRequest,
    responses(
        (status = 200, description = "Purchase order confirmed"),
        (status = 400, description = "Order is not confirmable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn confirm_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .confirm(id, payload.initial_installment)
        .await?;
    Ok(success_response(order))
}
