use super::common::{success_response, validate_input};
use crate::{
    errors::ApiError,
    handlers::AppState,
    handlers::movements::ProductLineRequest,
    services::movements::ProductLine,
};
use axum::extract::{Json, Path, State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RepairIntegrationRequest {
    /// Intended movement lines for the installment; lines already linked
    /// are skipped, making repeated repairs idempotent.
    #[validate(length(min = 1))]
    pub lines: Vec<ProductLineRequest>,
}

/// Validate ledger integration for a purchase order
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/integration",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Validation report with all outstanding issues"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "integration"
)]
pub async fn validate_integration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let report = state.services.integration.validate(id).await?;
    Ok(success_response(report))
}

/// Repair missing inventory movements for an installment
#[utoipa::path(
    post,
    path = "/api/v1/installments/{transaction_id}/repair",
    params(("transaction_id" = Uuid, Path, description = "Installment transaction id")),
    request_body = RepairIntegrationRequest,
    responses(
        (status = 200, description = "Repair outcome"),
        (status = 404, description = "Installment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "integration"
)]
pub async fn repair_integration(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<RepairIntegrationRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let lines: Vec<ProductLine> = payload.lines.into_iter().map(Into::into).collect();
    let outcome = state
        .services
        .integration
        .repair(transaction_id, &lines)
        .await?;
    Ok(success_response(outcome))
}
