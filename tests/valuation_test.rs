mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, NaiveDate, Utc};
use common::{field_decimal, response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde_json::{json, Value};
use uuid::Uuid;

use ledgerline_api::entities::cost_layer;

async fn seed_layer(
    app: &TestApp,
    product_id: Uuid,
    acquired_at: (i32, u32, u32),
    unit_cost_ex_tax: Decimal,
    unit_cost_inc_tax: Decimal,
    remaining: i32,
    created_offset_secs: i64,
) {
    let layer = cost_layer::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        acquired_at: Set(
            NaiveDate::from_ymd_opt(acquired_at.0, acquired_at.1, acquired_at.2).unwrap(),
        ),
        unit_cost_ex_tax: Set(unit_cost_ex_tax),
        unit_cost_inc_tax: Set(unit_cost_inc_tax),
        remaining_quantity: Set(remaining),
        original_quantity: Set(remaining.max(1)),
        created_at: Set(Utc::now() + Duration::seconds(created_offset_secs)),
    };
    layer.insert(&*app.state.db).await.expect("insert cost layer");
}

async fn valuate(app: &TestApp, product_id: Uuid, on_hand: i32) -> (StatusCode, Value) {
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}/valuation?on_hand={}", product_id, on_hand),
            None,
        )
        .await;
    let status = response.status();
    (status, response_json(response).await)
}

#[tokio::test]
async fn single_layer_covers_whole_on_hand() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    seed_layer(&app, product_id, (2023, 10, 1), dec!(100), dec!(110), 15, 0).await;

    let (status, body) = valuate(&app, product_id, 15).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field_decimal(&body, "tax_excluded_value"), dec!(1500));
    assert_eq!(field_decimal(&body, "tax_included_value"), dec!(1650));
    assert_eq!(body["uncovered_quantity"], json!(0));
}

#[tokio::test]
async fn exhausted_older_layers_are_skipped() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    seed_layer(&app, product_id, (2023, 10, 1), dec!(100), dec!(110), 0, 0).await;
    seed_layer(&app, product_id, (2023, 10, 2), dec!(150), dec!(165), 0, 1).await;
    seed_layer(&app, product_id, (2023, 10, 3), dec!(200), dec!(220), 8, 2).await;

    let (status, body) = valuate(&app, product_id, 8).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field_decimal(&body, "tax_excluded_value"), dec!(1600));
    assert_eq!(field_decimal(&body, "tax_included_value"), dec!(1760));
    assert_eq!(body["uncovered_quantity"], json!(0));
}

#[tokio::test]
async fn on_hand_spans_layers_oldest_first() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    seed_layer(&app, product_id, (2023, 10, 1), dec!(100), dec!(110), 5, 0).await;
    seed_layer(&app, product_id, (2023, 10, 5), dec!(200), dec!(220), 10, 1).await;

    // 5 @ 100 from the older layer, then 7 @ 200.
    let (status, body) = valuate(&app, product_id, 12).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field_decimal(&body, "tax_excluded_value"), dec!(1900));
    assert_eq!(field_decimal(&body, "tax_included_value"), dec!(2090));
}

#[tokio::test]
async fn same_day_layers_consume_in_receipt_order() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    seed_layer(&app, product_id, (2023, 10, 1), dec!(10), dec!(11), 4, 0).await;
    seed_layer(&app, product_id, (2023, 10, 1), dec!(20), dec!(22), 4, 5).await;

    // 4 @ 10 from the first receipt of the day, then 2 @ 20.
    let (status, body) = valuate(&app, product_id, 6).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field_decimal(&body, "tax_excluded_value"), dec!(80));
}

#[tokio::test]
async fn excess_over_layers_degrades_instead_of_failing() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    seed_layer(&app, product_id, (2023, 10, 1), dec!(100), dec!(110), 5, 0).await;

    // 5 covered + 3 uncovered valued at the newest layer's cost.
    let (status, body) = valuate(&app, product_id, 8).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field_decimal(&body, "tax_excluded_value"), dec!(800));
    assert_eq!(field_decimal(&body, "tax_included_value"), dec!(880));
    assert_eq!(body["uncovered_quantity"], json!(3));
}

#[tokio::test]
async fn product_without_layers_reports_full_shortfall() {
    let app = TestApp::new().await;
    let (status, body) = valuate(&app, Uuid::new_v4(), 7).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field_decimal(&body, "tax_excluded_value"), dec!(0));
    assert_eq!(body["uncovered_quantity"], json!(7));
}

#[tokio::test]
async fn zero_on_hand_values_to_zero() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    seed_layer(&app, product_id, (2023, 10, 1), dec!(100), dec!(110), 15, 0).await;

    let (status, body) = valuate(&app, product_id, 0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field_decimal(&body, "tax_excluded_value"), dec!(0));
    assert_eq!(body["uncovered_quantity"], json!(0));
}

#[tokio::test]
async fn negative_on_hand_is_rejected() {
    let app = TestApp::new().await;
    let (status, body) = valuate(&app, Uuid::new_v4(), -1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("negative"));
}

#[tokio::test]
async fn valuation_never_mutates_the_layers() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    seed_layer(&app, product_id, (2023, 10, 1), dec!(100), dec!(110), 5, 0).await;

    valuate(&app, product_id, 3).await;

    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    let rows = cost_layer::Entity::find()
        .filter(cost_layer::Column::ProductId.eq(product_id))
        .all(&*app.state.db)
        .await
        .expect("query layers");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].remaining_quantity, 5);
}
