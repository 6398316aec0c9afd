use super::common::success_response;
use crate::{errors::ApiError, handlers::AppState};
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ValuationParams {
    /// On-hand quantity to value against the product's cost layers.
    pub on_hand: i32,
}

/// FIFO valuation snapshot for a product
#[utoipa::path(
    get,
    path = "/api/v1/products/{product_id}/valuation",
    params(
        ("product_id" = Uuid, Path, description = "Product id"),
        ValuationParams
    ),
    responses(
        (status = 200, description = "Tax-excluded and tax-included valuation"),
        (status = 400, description = "Negative on-hand quantity", body = crate::errors::ErrorResponse)
    ),
    tag = "valuation"
)]
pub async fn valuate_inventory(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(params): Query<ValuationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let valuation = state
        .services
        .valuation
        .valuate(product_id, params.on_hand)
        .await?;
    Ok(success_response(valuation))
}
