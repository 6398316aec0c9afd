use super::common::{created_response, success_response, validate_input};
use crate::{
    entities::transaction::InstallmentStatus,
    errors::ApiError,
    handlers::AppState,
};
use axum::extract::{Json, Path, State};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AllocateInstallmentRequest {
    /// Must fit within the order's remaining balance.
    pub amount: Decimal,
    /// draft / confirmed / completed / cancelled; defaults to confirmed.
    pub status: Option<String>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub memo: Option<String>,
}

/// Allocate the next installment against a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/installments",
    params(("id" = Uuid, Path, description = "Parent purchase order id")),
    request_body = AllocateInstallmentRequest,
    responses(
        (status = 201, description = "Installment allocated"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent allocation conflict persisted past retries", body = crate::errors::ErrorResponse),
        (status = 422, description = "Amount exceeds the order's remaining balance", body = crate::errors::ErrorResponse)
    ),
    tag = "installments"
)]
pub async fn allocate_installment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AllocateInstallmentRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let status = match payload.status.as_deref() {
        None => InstallmentStatus::Confirmed,
        Some(raw) => raw
            .parse::<InstallmentStatus>()
            .map_err(ApiError::ValidationError)?,
    };

    let installment = state
        .services
        .installments
        .allocate(id, payload.amount, status, payload.due_date, payload.memo)
        .await?;
    Ok(created_response(installment))
}

/// List installments for a purchase order, ordered by installment number
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/installments",
    params(("id" = Uuid, Path, description = "Parent purchase order id")),
    responses((status = 200, description = "Installments for the order")),
    tag = "installments"
)]
pub async fn list_installments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let installments = state.services.installments.list_for_order(id).await?;
    Ok(success_response(installments))
}
