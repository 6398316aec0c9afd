use super::common::{success_response, validate_input};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::movements::ProductLine,
};
use axum::extract::{Json, Path, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductLineRequest {
    pub product_id: Uuid,
    // Quantity and price are checked per line by the service so one bad
    // line degrades the outcome instead of rejecting the whole request.
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl From<ProductLineRequest> for ProductLine {
    fn from(value: ProductLineRequest) -> Self {
        ProductLine {
            product_id: value.product_id,
            quantity: value.quantity,
            unit_price: value.unit_price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct LinkMovementsRequest {
    #[validate(length(min = 1))]
    pub lines: Vec<ProductLineRequest>,
}

/// Link inventory receipt movements to an installment
///
/// Responds 200 even on partial failure; the `status` field in the body
/// (`success` / `partial` / `failed`) carries the degraded-success signal.
#[utoipa::path(
    post,
    path = "/api/v1/installments/{transaction_id}/movements",
    params(("transaction_id" = Uuid, Path, description = "Installment transaction id")),
    request_body = LinkMovementsRequest,
    responses(
        (status = 200, description = "Linkage outcome with per-line results"),
        (status = 404, description = "Installment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn link_movements(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<LinkMovementsRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let lines: Vec<ProductLine> = payload.lines.into_iter().map(Into::into).collect();
    let outcome = state
        .services
        .movements
        .link(transaction_id, &lines)
        .await?;
    Ok(success_response(outcome))
}

/// List inventory movements linked to an installment
#[utoipa::path(
    get,
    path = "/api/v1/installments/{transaction_id}/movements",
    params(("transaction_id" = Uuid, Path, description = "Installment transaction id")),
    responses((status = 200, description = "Movements for the installment")),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let movements = state
        .services
        .movements
        .list_for_transaction(transaction_id)
        .await?;
    Ok(success_response(movements))
}
