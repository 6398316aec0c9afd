use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ledgerline API",
        version = "0.3.0",
        description = r#"
Purchase order installment ledger with inventory reconciliation and FIFO valuation.

- **Installments**: sequentially numbered partial fulfillments allocated against a
  purchase order under a per-order lock, with an amount ceiling.
- **Movements**: inventory receipt records linked 1:1 to installments, with
  explicit partial-failure reporting.
- **Integration**: read-only divergence detection between the two ledgers and an
  idempotent repair tool for missing movements.
- **Valuation**: FIFO cost-layer valuation snapshots for reporting.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "purchase-orders", description = "Purchase order entry and confirmation"),
        (name = "installments", description = "Installment allocation"),
        (name = "movements", description = "Inventory movement linkage"),
        (name = "integration", description = "Ledger integration validation and repair"),
        (name = "valuation", description = "FIFO inventory valuation"),
        (name = "health", description = "Health checks")
    ),
    paths(
        handlers::purchase_orders::create_purchase_order,
        handlers::purchase_orders::get_purchase_order,
        handlers::purchase_orders::confirm_purchase_order,
        handlers::installments::allocate_installment,
        handlers::installments::list_installments,
        handlers::movements::link_movements,
        handlers::movements::list_movements,
        handlers::integration::validate_integration,
        handlers::integration::repair_integration,
        handlers::valuation::valuate_inventory,
        handlers::health::health,
        handlers::health::ready,
    ),
    components(schemas(
        handlers::purchase_orders::CreatePurchaseOrderRequest,
        handlers::purchase_orders::ConfirmPurchaseOrderRequest,
        handlers::installments::AllocateInstallmentRequest,
        handlers::movements::ProductLineRequest,
        handlers::movements::LinkMovementsRequest,
        handlers::integration::RepairIntegrationRequest,
        crate::errors::ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/docs`, serving the OpenAPI document at
/// `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
